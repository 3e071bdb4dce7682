pub mod error;
pub mod config;
pub mod safety;
pub mod request;
pub mod extract;
pub mod providers;
pub mod llm;
pub mod crew;
pub mod writing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/*

writing-crew drives a three-stage article pipeline (research -> write ->
edit) where every agent talks to Gemini through one adapter.

src/
├── lib.rs          # Shared turn/prompt types and the LanguageModel seam
├── error.rs        # Error type and error kinds
├── config.rs       # Settings read from the environment
├── safety.rs       # Safety policy attached to every request
├── request.rs      # Generation params and generateContent wire types
├── extract.rs      # Ordered response-text extractors
├── providers/      # Model backends
│   ├── mod.rs      # ModelConnector / GenerativeModel traits
│   └── gemini.rs   # Gemini REST backend
├── llm.rs          # GeminiLlm adapter
├── crew.rs         # Agents, tasks and the sequential crew runner
├── writing.rs      # Researcher / writer / editor pipeline
└── main.rs         # CLI

*/

pub use error::{Error, ErrorKind};
pub use config::Settings;
pub use safety::SafetyPolicy;
pub use request::{CallOptions, GenerationParams};
pub use llm::GeminiLlm;
pub use crew::{Agent, Crew, CrewOutput, Process, Task, TaskOutput};
pub use writing::WritingAssistantCrew;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role
{   System
  , User
  , Assistant
}

impl Role
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Role::System => "system"
          , Role::User => "user"
          , Role::Assistant => "assistant"
        }
    }
}

impl From<&str> for Role
{   /// Unknown roles are treated as user turns
    fn from(s: &str) -> Self
    {   match s.trim().to_ascii_lowercase().as_str()
        {   "system" => Role::System
          , "assistant" | "model" => Role::Assistant
          , _ => Role::User
        }
    }
}

impl From<String> for Role
{   fn from(s: String) -> Self
    {   Role::from(s.as_str())
    }
}

impl From<Role> for String
{   fn from(role: Role) -> Self
    {   role.as_str().to_string()
    }
}

fn default_role() -> Role
{   Role::User
}

/// One role-tagged message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn
{   #[serde(default = "default_role")]
    pub role: Role
  , #[serde(default)]
    pub content: String
}

impl Turn
{   pub fn new(role: Role, content: impl Into<String>) -> Self
    {   Turn
        {   role
          , content: content.into()
        }
    }

    pub fn system(content: impl Into<String>) -> Self
    {   Turn::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self
    {   Turn::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self
    {   Turn::new(Role::Assistant, content)
    }
}

/// What the orchestration layer hands to a language model
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt
{   /// A single string
    Text(String)
  , /// Several strings, sent as parts of one user message
    Parts(Vec<String>)
  , /// A full conversation
    Turns(Vec<Turn>)
}

impl Prompt
{   /// Short name of the prompt's shape, for diagnostics
    pub fn kind(&self) -> &'static str
    {   match self
        {   Prompt::Text(_) => "text"
          , Prompt::Parts(_) => "parts"
          , Prompt::Turns(_) => "turns"
        }
    }

    /// Raw content, for diagnostics
    pub fn raw(&self) -> String
    {   match self
        {   Prompt::Text(text) => text.clone()
          , Prompt::Parts(parts) => format!("{:?}", parts)
          , Prompt::Turns(turns) => turns.iter()
              .map(|t| format!("[{}] {}", t.role.as_str(), t.content))
              .collect::<Vec<_>>()
              .join("\n")
        }
    }
}

impl From<&str> for Prompt
{   fn from(s: &str) -> Self
    {   Prompt::Text(s.to_string())
    }
}

impl From<String> for Prompt
{   fn from(s: String) -> Self
    {   Prompt::Text(s)
    }
}

impl From<Vec<String>> for Prompt
{   fn from(parts: Vec<String>) -> Self
    {   Prompt::Parts(parts)
    }
}

impl From<Vec<Turn>> for Prompt
{   fn from(turns: Vec<Turn>) -> Self
    {   Prompt::Turns(turns)
    }
}

/// The completion contract the crew runner consumes.
///
/// Calls are awaited one at a time; implementors need not handle
/// concurrent use beyond being `Sync`.
#[async_trait]
pub trait LanguageModel: Send + Sync
{   async fn call(
      &self
    , prompt: Prompt
    , stop: Option<Vec<String>>
    , options: &CallOptions
    ) -> Result<String, Error>;
}
