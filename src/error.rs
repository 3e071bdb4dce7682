use std::fmt;

/// Broad classes of failure surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind
{   /// Startup configuration is missing or invalid
    Configuration
  , /// The underlying completion call failed
    Generation
  , /// Writing the pipeline result failed
    Output
}

/// Error type for writing-crew operations
/// Implements Clone so a failure can be logged and still returned unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Required API credential is missing
    MissingApiKey(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// HTTP transport error
    HttpError(String)
  , /// API returned an error response
    ApiError
    {   status: u16
      , message: String
    }
  , /// Rate limit or quota exceeded
    RateLimitExceeded(String)
  , /// Failed to parse API response
    ParseError(String)
  , /// Failed to write the generated article
    OutputError(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// Classify this error
    pub fn kind(&self) -> ErrorKind
    {   match self
        {   Error::MissingApiKey(_)
          | Error::InvalidConfiguration(_) => ErrorKind::Configuration
          , Error::OutputError(_) => ErrorKind::Output
          , Error::HttpError(_)
          | Error::ApiError { .. }
          | Error::RateLimitExceeded(_)
          | Error::ParseError(_)
          | Error::Other(_) => ErrorKind::Generation
        }
    }

    pub fn is_configuration(&self) -> bool
    {   self.kind() == ErrorKind::Configuration
    }

    pub fn is_generation(&self) -> bool
    {   self.kind() == ErrorKind::Generation
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(name) => {
              write!(f,
                "{} environment variable not set",
                name
              )
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError { status, message } => {
              write!(f, "API error ({}): {}", status, message)
            }
          , Error::RateLimitExceeded(msg) => {
              write!(f, "API rate limit exceeded: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::OutputError(msg) => {
              write!(f, "Output error: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
