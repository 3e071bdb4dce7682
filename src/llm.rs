//! The Gemini adapter: generic turns + options in, plain text out

use async_trait::async_trait;
use tokio::sync::OnceCell;
use log::{debug, error, trace};

use crate::error::Error;
use crate::providers::{
  normalize_model_name, GeminiConnector, GenerativeModel, ModelConnector
};
use crate::request::{
  CallOptions, Content, GenerateContentRequest, GenerationParams
};
use crate::safety::SafetyPolicy;
use crate::{LanguageModel, Prompt, Role, Turn};

/// Adapter exposing a Gemini model through [`LanguageModel`].
///
/// The model handle is created on the first call and reused afterwards.
pub struct GeminiLlm<C: ModelConnector = GeminiConnector>
{   connector: C
  , model_name: String
  , safety: SafetyPolicy
  , model: OnceCell<C::Model>
}

impl GeminiLlm<GeminiConnector>
{   /// Adapter for the configured model with the permissive safety policy
    pub fn from_settings(settings: &crate::config::Settings) -> Self
    {   GeminiLlm::new(
          GeminiConnector::from_settings(settings)
        , settings.model.clone()
        )
    }
}

impl<C: ModelConnector> GeminiLlm<C>
{   pub fn new(connector: C, model: impl Into<String>) -> Self
    {   let model_name = normalize_model_name(&model.into());
        debug!("Creating GeminiLlm for model: {}", model_name);
        GeminiLlm
        {   connector
          , model_name
          , safety: SafetyPolicy::default()
          , model: OnceCell::new()
        }
    }

    pub fn with_safety_policy(mut self, safety: SafetyPolicy) -> Self
    {   self.safety = safety;
        self
    }

    pub fn model_name(&self) -> &str
    {   &self.model_name
    }

    pub fn safety_policy(&self) -> &SafetyPolicy
    {   &self.safety
    }

    /// Complete a conversation.
    ///
    /// Only recognized generation options are forwarded; the rest are
    /// dropped. Failures are logged and returned unchanged.
    pub async fn complete(
      &self
    , turns: &[Turn]
    , options: &CallOptions
    ) -> Result<String, Error>
    {   let params = GenerationParams::from_options(options);
        let (system, contents) = turns_to_contents(turns);
        self.generate(system, contents, &params)
          .await
          .map_err(|e| {
            error!("Error in GeminiLlm: {}", e);
            e
          })
    }

    /// Assemble the wire request for the given contents
    pub fn build_request(
      &self
    , system_instruction: Option<Content>
    , contents: Vec<Content>
    , params: &GenerationParams
    ) -> GenerateContentRequest
    {   GenerateContentRequest
        {   contents
          , system_instruction
          , generation_config: params.to_config()
          , safety_settings: self.safety.settings.clone()
        }
    }

    async fn model(&self) -> Result<&C::Model, Error>
    {   self.model
          .get_or_try_init(|| async {
            debug!("Initializing model handle: {}", self.model_name);
            self.connector.connect(&self.model_name)
          })
          .await
    }

    async fn generate(
      &self
    , system_instruction: Option<Content>
    , contents: Vec<Content>
    , params: &GenerationParams
    ) -> Result<String, Error>
    {   let model = self.model().await?;
        debug!("Generating with model: {}", model.model_name());
        let request = self.build_request(
          system_instruction
        , contents
        , params
        );
        let response = model.generate_content(&request).await?;
        trace!("Gemini raw response: {}", response);
        Ok(crate::extract::extract_text(&response))
    }
}

#[async_trait]
impl<C: ModelConnector> LanguageModel for GeminiLlm<C>
{   async fn call(
      &self
    , prompt: Prompt
    , stop: Option<Vec<String>>
    , options: &CallOptions
    ) -> Result<String, Error>
    {   let mut params = GenerationParams::from_options(options);
        if let Some(stop) = stop
        {   params.stop = Some(stop);
        }

        let (system, contents) = prompt_to_contents(&prompt);
        match self.generate(system, contents, &params).await
        {   Ok(text) => Ok(text)
          , Err(e) => {
              error!("Error in GeminiLlm: {}", e);
              error!("Prompt type: {}", prompt.kind());
              error!("Prompt content: {}", prompt.raw());
              Err(e)
            }
        }
    }
}

/// Split turns into a system instruction and the conversation contents.
///
/// System turns are merged into one instruction; assistant turns become
/// the API's `model` role.
pub fn turns_to_contents(turns: &[Turn]) -> (Option<Content>, Vec<Content>)
{   let system: Vec<String> = turns.iter()
      .filter(|t| t.role == Role::System)
      .map(|t| t.content.clone())
      .collect();

    let system_instruction = if system.is_empty()
    {   None
    } else
    {   Some(Content::new(None, vec![system.join("\n\n")]))
    };

    let contents = turns.iter()
      .filter(|t| t.role != Role::System)
      .map(|t| {
        let role = match t.role
        {   Role::Assistant => "model"
          , _ => "user"
        };
        Content::new(Some(role), vec![t.content.clone()])
      })
      .collect();

    (system_instruction, contents)
}

/// A string or list of strings becomes one user message
pub fn prompt_to_contents(prompt: &Prompt) -> (Option<Content>, Vec<Content>)
{   match prompt
    {   Prompt::Text(text) => (
          None
        , vec![Content::new(Some("user"), vec![text.clone()])]
        )
      , Prompt::Parts(parts) => (
          None
        , vec![Content::new(Some("user"), parts.clone())]
        )
      , Prompt::Turns(turns) => turns_to_contents(turns)
    }
}
