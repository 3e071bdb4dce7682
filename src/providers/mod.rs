//! Model backends the adapter can drive

pub mod gemini;

use async_trait::async_trait;
use serde_json::Value;

pub use gemini::{GeminiConnector, GeminiModel};

/// A live handle to one model
#[async_trait]
pub trait GenerativeModel: Send + Sync
{   /// The normalized model identifier this handle targets
    fn model_name(&self) -> &str;

    /// Run one `generateContent` call and hand back the raw response
    async fn generate_content(
      &self
    , request: &crate::request::GenerateContentRequest
    ) -> Result<Value, crate::error::Error>;
}

/// Builds model handles; called at most once per adapter
pub trait ModelConnector: Send + Sync
{   type Model: GenerativeModel;

    fn connect(&self, model_name: &str)
      -> Result<Self::Model, crate::error::Error>;
}

/// Strip any vendor path prefix (`models/`) from a model identifier
pub fn normalize_model_name(model: &str) -> String
{   let trimmed = model.trim();
    trimmed.strip_prefix("models/")
      .unwrap_or(trimmed)
      .to_string()
}
