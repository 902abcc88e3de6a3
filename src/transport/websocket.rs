//! WebSocket connection setup.
//!
//! Authentication travels in the upgrade request headers:
//! - `X-Api-App-Id`, `X-Api-Access-Key`, `X-Api-Resource-Id` from the config
//! - `X-Api-Request-Id`, a fresh UUID per connection
//!
//! The server answers with an `X-Tt-Logid` header identifying the call in
//! its logs.

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::config::TtsConfig;
use crate::error::{Result, TtsError};

/// Response header carrying the server-side log id.
pub const LOG_ID_HEADER: &str = "X-Tt-Logid";

/// Connected WebSocket stream.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An open connection plus the identifiers of the upgrade exchange.
pub struct Connection {
    /// The WebSocket stream.
    pub stream: WsStream,
    /// `X-Api-Request-Id` sent with the upgrade request.
    pub request_id: String,
    /// `X-Tt-Logid` returned by the server, if any.
    pub log_id: Option<String>,
}

/// Open an authenticated connection to `config.endpoint`.
pub async fn connect(config: &TtsConfig) -> Result<Connection> {
    install_crypto_provider();

    let request_id = Uuid::new_v4().to_string();
    let mut request = config.endpoint.as_str().into_client_request()?;

    let headers = request.headers_mut();
    headers.insert("X-Api-App-Id", header_value("app id", &config.app_id)?);
    headers.insert("X-Api-Access-Key", header_value("access token", &config.access_token)?);
    headers.insert("X-Api-Resource-Id", header_value("resource id", &config.resource_id)?);
    headers.insert("X-Api-Request-Id", header_value("request id", &request_id)?);

    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(config.max_message_size);
    ws_config.max_frame_size = Some(config.max_message_size);

    tracing::debug!(endpoint = %config.endpoint, resource_id = %config.resource_id, "Connecting");
    let (stream, response) = connect_async_with_config(request, Some(ws_config), false).await?;

    let log_id = response
        .headers()
        .get(LOG_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    tracing::info!(
        request_id = %request_id,
        log_id = log_id.as_deref().unwrap_or("unknown"),
        "Connected to {}",
        config.endpoint
    );

    Ok(Connection {
        stream,
        request_id,
        log_id,
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| TtsError::Config(format!("{} is not a valid header value", name)))
}

/// rustls needs a process-wide provider before the first TLS handshake.
fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}
