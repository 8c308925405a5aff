use merchant_intake_assistant::{
    api::{start_server, ApiState},
    config::AppConfig,
    document::{FormLayout, ManifestFiller},
    llm::GeminiClient,
    voice::{ElevenLabsClient, SpeechSynthesizer},
    DialogueEngine, SlotSchema,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    if !config.has_gemini_key() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 Extraction and replies will fall back to apologies until it is configured");
    }

    info!("🚀 Merchant Intake Assistant - API Server");
    info!("📍 Port: {}", config.port);

    // Create components
    let gemini = Arc::new(GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())?);
    let engine = Arc::new(DialogueEngine::new(gemini.clone(), SlotSchema::merchant_application()));

    let synthesizer: Option<Arc<dyn SpeechSynthesizer>> = match &config.elevenlabs_api_key {
        Some(key) => Some(Arc::new(ElevenLabsClient::new(
            key.clone(),
            config.elevenlabs_voice_id.clone(),
            config.elevenlabs_model_id.clone(),
        )?)),
        None => {
            warn!("ELEVENLABS_API_KEY not set - replies will be text only");
            None
        }
    };

    let layout = match FormLayout::load(&config.form_layout_path).await {
        Ok(layout) => layout,
        Err(e) => {
            warn!("Form layout unavailable, filled manifest will have no placements: {}", e);
            FormLayout::default()
        }
    };
    let filler = Arc::new(ManifestFiller::new(layout, config.filled_form_path()));

    let state = ApiState::new(
        engine,
        gemini,
        synthesizer,
        filler,
        config.signature_path(),
        config.filled_form_path(),
    );

    info!("✅ Dialogue engine initialized");
    info!("📡 Starting API server...");

    // Start API server
    start_server(state, config.port).await?;

    Ok(())
}
