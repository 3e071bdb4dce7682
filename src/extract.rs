//! Response normalization.
//!
//! The `generateContent` response schema has shifted between API versions,
//! so text is pulled out by an ordered list of extractors. The first one to
//! produce a non-empty string wins; if none does, the result is `""`.

use serde_json::Value;
use log::{trace, warn};

/// Pulls text out of one known response shape
pub type Extractor = fn(&Value) -> Option<String>;

/// Extractors in priority order
pub const EXTRACTORS: [(&str, Extractor); 3] = [
  ("text", direct_text)
, ("candidates", first_candidate_text)
, ("result", deferred_result)
];

/// A top-level `text` field
pub fn direct_text(response: &Value) -> Option<String>
{   non_empty(response.get("text")?.as_str()?)
}

/// `candidates[0].content.parts[0].text`
pub fn first_candidate_text(response: &Value) -> Option<String>
{   let text = response.get("candidates")?
      .get(0)?
      .get("content")?
      .get("parts")?
      .get(0)?
      .get("text")?
      .as_str()?;
    non_empty(text)
}

/// A `result` field: either the text itself or a wrapped response
pub fn deferred_result(response: &Value) -> Option<String>
{   match response.get("result")?
    {   Value::String(s) => non_empty(s)
      , inner @ Value::Object(_) => direct_text(inner)
          .or_else(|| first_candidate_text(inner))
      , _ => None
    }
}

/// Run the extractor chain over a response
pub fn extract_text(response: &Value) -> String
{   for (shape, extractor) in EXTRACTORS.iter()
    {   if let Some(text) = extractor(response)
        {   trace!("Extracted {} chars via {}", text.len(), shape);
            return text;
        }
    }

    if let Some(reason) = block_reason(response)
    {   warn!("Prompt blocked by the API: {}", reason);
    } else
    {   warn!("No text found in response; returning empty string");
    }
    String::new()
}

/// `promptFeedback.blockReason`, when the API refused the prompt
pub fn block_reason(response: &Value) -> Option<&str>
{   response.get("promptFeedback")?
      .get("blockReason")?
      .as_str()
}

fn non_empty(s: &str) -> Option<String>
{   if s.is_empty()
    {   None
    } else
    {   Some(s.to_string())
    }
}
