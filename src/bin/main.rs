use merchant_intake_assistant::{
    config::AppConfig,
    error::IntakeError,
    llm::GeminiClient,
    DialogueEngine, SlotSchema,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Text-only console conversation: type answers, read replies.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing (quiet by default so replies stay readable)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = AppConfig::from_env()?;
    if !config.has_gemini_key() {
        return Err(Box::new(IntakeError::ConfigError(
            "GEMINI_API_KEY must be set to run the console assistant".to_string(),
        )) as Box<dyn std::error::Error>);
    }

    let model = Arc::new(GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())?);
    let engine = DialogueEngine::new(model, SlotSchema::merchant_application());
    let mut session = engine.new_session();

    info!(session_id = %session.session_id(), "Console session started");
    println!("Commands: /summary  /form  /reset  /quit\n");
    println!("Assistant: {}", engine.start_session(&mut session));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        match text {
            "" => continue,
            "/quit" => break,
            "/summary" => {
                println!("{}\n", engine.summary(&session));
                continue;
            }
            "/form" => {
                println!("{}\n", serde_json::to_string_pretty(&engine.slot_store(&session).to_json())?);
                continue;
            }
            "/reset" => {
                engine.reset_session(&mut session);
                println!("Assistant: {}", engine.start_session(&mut session));
                continue;
            }
            _ => {}
        }

        let reply = engine.process_utterance(&mut session, text).await;
        if !reply.is_empty() {
            println!("Assistant: {}", reply);
        }

        if session.is_ended() {
            println!("\n=== COLLECTED DETAILS ===");
            println!("{}", engine.summary(&session));
            break;
        }
    }

    Ok(())
}
