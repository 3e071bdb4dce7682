//! Generation parameters and the Gemini request wire types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{trace, warn};

/// Untyped call options, as handed over by the orchestration layer.
/// Only the keys [`GenerationParams`] recognizes are forwarded.
pub type CallOptions = serde_json::Map<String, Value>;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
pub const DEFAULT_TOP_P: f64 = 0.95;
pub const DEFAULT_TOP_K: u32 = 40;

const MAX_TEMPERATURE: f64 = 2.0;

/// Recognized generation options; `None` means "use the default"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParams
{   pub temperature: Option<f64>
  , pub max_output_tokens: Option<u32>
  , pub top_p: Option<f64>
  , pub top_k: Option<u32>
  , pub stop: Option<Vec<String>>
}

impl GenerationParams
{   /// Pick the recognized keys out of an option map.
    ///
    /// Unknown keys (`stream`, `callbacks`, ...) are ignored, as are
    /// recognized keys whose value has the wrong type.
    pub fn from_options(options: &CallOptions) -> Self
    {   let mut params = GenerationParams::default();
        let mut max_output_tokens = None;
        let mut max_tokens = None;
        let mut stop = None;
        let mut stop_sequences = None;

        for (key, value) in options
        {   match key.as_str()
            {   "temperature" => {
                  params.temperature = value.as_f64();
                }
              , "max_output_tokens" => {
                  max_output_tokens = as_token_count(value);
                }
              , "max_tokens" => {
                  max_tokens = as_token_count(value);
                }
              , "top_p" => {
                  params.top_p = value.as_f64();
                }
              , "top_k" => {
                  params.top_k = as_token_count(value);
                }
              , "stop" => {
                  stop = as_stop_list(value);
                }
              , "stop_sequences" => {
                  stop_sequences = as_stop_list(value);
                }
              , other => {
                  trace!("Dropping unrecognized option: {}", other);
                }
            }
        }

        // Primary names win over their aliases when both parse
        params.max_output_tokens = max_output_tokens.or(max_tokens);
        params.stop = stop.or(stop_sequences);
        params
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self
    {   self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self
    {   self.max_output_tokens = Some(max);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self
    {   self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self
    {   self.top_k = Some(top_k);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self
    {   self.stop = Some(stop);
        self
    }

    /// Fill defaults and pull every value into the range the API accepts
    pub fn to_config(&self) -> GenerationConfig
    {   let temperature = clamp_f64(
          "temperature"
        , self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
        , 0.0
        , MAX_TEMPERATURE
        );
        let top_p = clamp_f64(
          "top_p"
        , self.top_p.unwrap_or(DEFAULT_TOP_P)
        , 0.0
        , 1.0
        );
        let max_output_tokens = self.max_output_tokens
          .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS)
          .max(1);
        let top_k = self.top_k
          .unwrap_or(DEFAULT_TOP_K)
          .max(1);
        let stop_sequences = self.stop.clone()
          .filter(|s| !s.is_empty());

        GenerationConfig
        {   temperature
          , max_output_tokens
          , top_p
          , top_k
          , stop_sequences
        }
    }
}

/// Integers, or floats with no fractional part
fn as_token_count(value: &Value) -> Option<u32>
{   if let Some(n) = value.as_i64()
    {   return Some(n.clamp(0, u32::MAX as i64) as u32);
    }
    value.as_f64()
      .filter(|f| f.is_finite() && f.fract() == 0.0)
      .map(|f| f.clamp(0.0, u32::MAX as f64) as u32)
}

fn as_stop_list(value: &Value) -> Option<Vec<String>>
{   match value
    {   Value::String(s) => Some(vec![s.clone()])
      , Value::Array(items) => Some(
          items.iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
        )
      , _ => None
    }
}

fn clamp_f64(name: &str, value: f64, min: f64, max: f64) -> f64
{   if value.is_nan()
    {   warn!("{} is NaN, using {}", name, min);
        return min;
    }
    if value < min || value > max
    {   warn!(
          "{} {} outside [{}, {}], clamping",
          name, value, min, max
        );
    }
    value.clamp(min, max)
}

// ===== Wire Types =====

/// One text part of a content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part
{   pub text: String
}

/// A role-tagged list of parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , pub parts: Vec<Part>
}

impl Content
{   pub fn new(role: Option<&str>, texts: Vec<String>) -> Self
    {   Content
        {   role: role.map(str::to_string)
          , parts: texts.into_iter()
              .map(|text| Part { text })
              .collect()
        }
    }
}

/// The `generationConfig` record forwarded to the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   pub temperature: f64
  , pub max_output_tokens: u32
  , pub top_p: f64
  , pub top_k: u32
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>
}

impl Default for GenerationConfig
{   fn default() -> Self
    {   GenerationParams::default().to_config()
    }
}

/// Body of a `generateContent` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>
  , pub generation_config: GenerationConfig
  , pub safety_settings: Vec<crate::safety::SafetySetting>
}
