//! Process configuration for the Gemini-backed pipeline

use serde::{Deserialize, Serialize};
use log::{debug, error};

/// Environment variable holding the Gemini API credential
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Optional model override
pub const MODEL_VAR: &str = "GEMINI_MODEL";
/// Optional API base override
pub const API_BASE_VAR: &str = "GEMINI_API_BASE";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";

/// Runtime settings, built once at startup and passed explicitly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings
{   /// Gemini API key
    pub api_key: String
  , /// Model identifier, with or without a `models/` prefix
    pub model: String
  , /// API base URL
    pub api_base: String
}

impl Settings
{   /// Build settings from an arbitrary key lookup.
    ///
    /// A missing or blank credential is a configuration error; nothing
    /// touches the network before this succeeds.
    pub fn from_lookup<F>(lookup: F)
      -> Result<Self, crate::error::Error>
    where
      F: Fn(&str) -> Option<String>
    {   let api_key = lookup(API_KEY_VAR)
          .filter(|k| !k.trim().is_empty())
          .ok_or_else(|| {
            error!("{} environment variable not set", API_KEY_VAR);
            crate::error::Error::MissingApiKey(
              API_KEY_VAR.to_string()
            )
          })?;

        let model = lookup(MODEL_VAR)
          .filter(|m| !m.trim().is_empty())
          .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let api_base = lookup(API_BASE_VAR)
          .filter(|b| !b.trim().is_empty())
          .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        debug!("Loaded settings for model: {}", model);
        Ok(Settings
        {   api_key
          , model
          , api_base
        })
    }

    /// Build settings from the process environment
    pub fn from_env() -> Result<Self, crate::error::Error>
    {   Settings::from_lookup(|key| std::env::var(key).ok())
    }

    /// Override the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self
    {   self.model = model.into();
        self
    }
}
