//! Environment configuration
//!
//! Read once at startup, after `dotenv` has loaded any `.env` file.

use crate::error::IntakeError;
use crate::llm::gemini::DEFAULT_MODEL;
use crate::voice::elevenlabs::{DEFAULT_MODEL_ID, DEFAULT_VOICE_ID};
use crate::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Text-to-speech is disabled when absent
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: String,
    pub elevenlabs_model_id: String,
    pub port: u16,
    pub form_layout_path: PathBuf,
    pub output_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| IntakeError::ConfigError(format!("invalid PORT {:?}: {}", raw, e)))?,
            None => 8080,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            elevenlabs_api_key: get("ELEVENLABS_API_KEY"),
            elevenlabs_voice_id: get("ELEVENLABS_VOICE_ID")
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            elevenlabs_model_id: get("ELEVENLABS_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            port,
            form_layout_path: get("FORM_LAYOUT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("form_layout.json")),
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
        })
    }

    pub fn has_gemini_key(&self) -> bool {
        !self.gemini_api_key.is_empty()
    }

    pub fn signature_path(&self) -> PathBuf {
        self.output_dir.join("signature.png")
    }

    pub fn filled_form_path(&self) -> PathBuf {
        self.output_dir.join("filled_form.json")
    }
}
