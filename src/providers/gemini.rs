use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use log::{debug, trace, error};

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorResponse
{   error: GeminiErrorDetail
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorDetail
{   #[serde(default)]
    message: String
  , #[serde(default)]
    status: Option<String>
}

/// Creates [`GeminiModel`] handles sharing one HTTP client
#[derive(Debug, Clone)]
pub struct GeminiConnector
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl GeminiConnector
{   pub fn new(
      api_key: impl Into<String>
    , api_base: impl Into<String>
    ) -> Self
    {   debug!("Creating GeminiConnector");
        GeminiConnector
        {   api_key: api_key.into()
          , api_base: api_base.into()
              .trim_end_matches('/')
              .to_string()
          , http_client: reqwest::Client::new()
        }
    }

    pub fn from_settings(settings: &crate::config::Settings) -> Self
    {   GeminiConnector::new(
          settings.api_key.clone()
        , settings.api_base.clone()
        )
    }
}

impl crate::providers::ModelConnector for GeminiConnector
{   type Model = GeminiModel;

    fn connect(&self, model_name: &str)
      -> Result<GeminiModel, crate::error::Error>
    {   if model_name.is_empty()
        {   error!("Empty model name");
            return Err(crate::error::Error::InvalidConfiguration(
              "model name must not be empty".to_string()
            ));
        }
        debug!("Connecting to Gemini model: {}", model_name);
        Ok(GeminiModel
        {   name: model_name.to_string()
          , api_key: self.api_key.clone()
          , api_base: self.api_base.clone()
          , http_client: self.http_client.clone()
        })
    }
}

/// Handle to one Gemini model over the REST API
#[derive(Debug, Clone)]
pub struct GeminiModel
{   name: String
  , api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl GeminiModel
{   fn endpoint(&self) -> String
    {   format!(
          "{}/models/{}:generateContent",
          self.api_base, self.name
        )
    }
}

#[async_trait]
impl crate::providers::GenerativeModel for GeminiModel
{   fn model_name(&self) -> &str
    {   &self.name
    }

    async fn generate_content(
      &self
    , request: &crate::request::GenerateContentRequest
    ) -> Result<Value, crate::error::Error>
    {   debug!("generateContent on: {}", self.name);
        trace!("Gemini request: {:?}", request);

        let response = self.http_client
          .post(self.endpoint())
          .header("x-goog-api-key", &self.api_key)
          .header("Content-Type", "application/json")
          .json(request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            crate::error::Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("Gemini response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            let message = serde_json::from_str::<GeminiErrorResponse>(
                &error_text
              )
              .map(|e| match e.error.status
              {   Some(code) => format!("{}: {}", code, e.error.message)
                , None => e.error.message
              })
              .unwrap_or(error_text);
            error!("Gemini API error ({}): {}", status, message);

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            {   return Err(crate::error::Error::RateLimitExceeded(
                  message
                ));
            }
            return Err(crate::error::Error::ApiError
            {   status: status.as_u16()
              , message
            });
        }

        response.json::<Value>().await.map_err(|e| {
          error!("Parse error: {}", e);
          crate::error::Error::ParseError(e.to_string())
        })
    }
}
