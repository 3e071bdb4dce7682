//! Content-safety configuration sent with every generation request

use serde::{Deserialize, Serialize};

/// Harm categories understood by the Gemini API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmCategory
{   #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment
  , #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech
  , #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit
  , #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent
}

impl HarmCategory
{   pub const ALL: [HarmCategory; 4] = [
      HarmCategory::Harassment
    , HarmCategory::HateSpeech
    , HarmCategory::SexuallyExplicit
    , HarmCategory::DangerousContent
    ];
}

/// Blocking threshold applied to a harm category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold
{   BlockNone
  , BlockOnlyHigh
  , BlockMediumAndAbove
  , BlockLowAndAbove
}

/// One category/threshold pair on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting
{   pub category: HarmCategory
  , pub threshold: HarmBlockThreshold
}

/// The safety settings attached to every request made by an adapter.
///
/// Chosen at adapter construction so the policy is visible in one place
/// and can be overridden per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyPolicy
{   pub settings: Vec<SafetySetting>
}

impl SafetyPolicy
{   /// Same threshold for every known category
    pub fn uniform(threshold: HarmBlockThreshold) -> Self
    {   SafetyPolicy
        {   settings: HarmCategory::ALL
              .iter()
              .map(|category| SafetySetting
              {   category: *category
                , threshold
              })
              .collect()
        }
    }

    /// Disables content filtering for every category (`BLOCK_NONE`)
    pub fn permissive() -> Self
    {   SafetyPolicy::uniform(HarmBlockThreshold::BlockNone)
    }

    /// Replace the threshold for one category, adding it if absent
    pub fn with_threshold(
      mut self
    , category: HarmCategory
    , threshold: HarmBlockThreshold
    ) -> Self
    {   match self.settings.iter()
          .position(|s| s.category == category)
        {   Some(index) => self.settings[index].threshold = threshold
          , None => self.settings.push(SafetySetting
            {   category
              , threshold
            })
        }
        self
    }
}

impl Default for SafetyPolicy
{   fn default() -> Self
    {   SafetyPolicy::permissive()
    }
}
