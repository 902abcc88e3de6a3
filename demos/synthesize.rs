//! Synthesize - command-line example.
//!
//! This example demonstrates:
//! - Loading credentials from the environment / `.env`
//! - Synthesizing a single text to a file
//! - Batch synthesis from a text file, one line per request
//!
//! # Running
//!
//! ```sh
//! export VOLCENGINE_APP_ID=... VOLCENGINE_ACCESS_TOKEN=...
//! cargo run --example synthesize -- "你好，世界" hello.wav
//! cargo run --example synthesize -- --batch lines.txt
//! ```

use doubao_tts::{SynthesisRequest, Synthesizer, TtsConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "doubao_tts=info".into()),
        )
        .init();

    let config = TtsConfig::from_env()?;
    tracing::info!(resource_id = %config.resource_id, voice = %config.voice_type, "Loaded config");
    let synthesizer = Synthesizer::new(config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [flag, path] if flag == "--batch" => {
            let contents = tokio::fs::read_to_string(path).await?;
            let requests: Vec<SynthesisRequest> = contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(SynthesisRequest::new)
                .collect();

            let results = synthesizer.synthesize_batch(&requests).await;
            let mut ok = 0;
            for (i, (request, result)) in requests.iter().zip(&results).enumerate() {
                if let Ok(synthesis) = result {
                    let file = format!("batch_{:03}.{}", i + 1, request.format().extension());
                    synthesis.save(&file).await?;
                    ok += 1;
                }
            }
            tracing::info!("Batch finished: {}/{} succeeded", ok, requests.len());
        }
        [text, rest @ ..] => {
            let mut request = SynthesisRequest::new(text.as_str());
            if let Some(speaker) = rest.get(1) {
                request = request.speaker(speaker.as_str());
            }
            let output = match rest.first() {
                Some(path) => path.clone(),
                None => format!("output.{}", request.format().extension()),
            };
            let synthesis = synthesizer.synthesize_to_file(&request, &output).await?;
            tracing::info!(
                bytes = synthesis.len(),
                session_id = ?synthesis.session_id,
                "Wrote {}",
                output
            );
        }
        [] => {
            eprintln!("usage: synthesize <text> [output.wav] [speaker] | --batch <file>");
            std::process::exit(2);
        }
    }

    Ok(())
}
