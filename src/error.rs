use std::fmt;

use crate::ProviderId;

/// Closed taxonomy of provider failures.
/// Every decision point matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind
{   /// No API key configured; no network call was made
    NoCredentials
  , /// Provider reported its usage allowance is exhausted
    QuotaExceeded
  , /// Network, timeout or 5xx; worth an immediate retry
    Transient
  , /// Response body could not be decoded
    Malformed
  , /// Any other rejection
    Permanent
  , /// Transient failures outlasted the retry budget
    MaxRetriesExceeded
}

impl ErrorKind
{   /// Only transient failures are retried within a provider.
    pub fn is_retriable(self) -> bool
    {   match self
        {   ErrorKind::Transient => true
          , ErrorKind::NoCredentials
          | ErrorKind::QuotaExceeded
          | ErrorKind::Malformed
          | ErrorKind::Permanent
          | ErrorKind::MaxRetriesExceeded => false
        }
    }
}

impl fmt::Display for ErrorKind
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   let name = match self
        {   ErrorKind::NoCredentials => "no_credentials"
          , ErrorKind::QuotaExceeded => "quota_exceeded"
          , ErrorKind::Transient => "transient"
          , ErrorKind::Malformed => "malformed"
          , ErrorKind::Permanent => "permanent"
          , ErrorKind::MaxRetriesExceeded => "max_retries"
        };
        f.write_str(name)
    }
}

/// One failed provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure
{   pub kind: ErrorKind
  , pub message: String
}

impl ProviderFailure
{   pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self
    {   ProviderFailure
        {   kind
          , message: message.into()
        }
    }

    pub fn retriable(&self) -> bool
    {   self.kind.is_retriable()
    }
}

impl fmt::Display for ProviderFailure
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of a single provider call: the generated text or
/// a classified failure, never both.
pub type ProviderResult = Result<String, ProviderFailure>;

/// Terminal outcome of a fallback run where no provider succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError
{   /// At least one provider in the plan was rate-limited
    AllQuotaExceeded
    {   providers: Vec<ProviderId>
      , failures: Vec<(ProviderId, ProviderFailure)>
    }
  , /// Every provider failed for non-quota reasons
    AllProvidersFailed
    {   message: String
      , failures: Vec<(ProviderId, ProviderFailure)>
    }
}

impl GenerateError
{   /// Per-provider failures in plan order.
    pub fn failures(&self) -> &[(ProviderId, ProviderFailure)]
    {   match self
        {   GenerateError::AllQuotaExceeded { failures, .. } => failures
          , GenerateError::AllProvidersFailed { failures, .. } => failures
        }
    }

    /// Short machine-readable code for the hosting surface.
    pub fn code(&self) -> &'static str
    {   match self
        {   GenerateError::AllQuotaExceeded { .. } => "quota_exceeded"
          , GenerateError::AllProvidersFailed { .. } => {
              if self.no_credentials() { "no_api_key" }
              else { "all_apis_failed" }
            }
        }
    }

    /// HTTP status the hosting endpoint should answer with.
    pub fn http_status(&self) -> u16
    {   match self
        {   GenerateError::AllQuotaExceeded { .. } => 429
          , GenerateError::AllProvidersFailed { .. } => 500
        }
    }

    /// Message safe to show an editor user.
    pub fn user_message(&self) -> &'static str
    {   match self
        {   GenerateError::AllQuotaExceeded { .. } => {
              "all providers rate-limited, retry later"
            }
          , GenerateError::AllProvidersFailed { .. } => {
              if self.no_credentials() { "no credentials configured" }
              else { "generation failed" }
            }
        }
    }

    fn no_credentials(&self) -> bool
    {   let failures = self.failures();
        !failures.is_empty()
          && failures.iter().all(|(_, f)| {
              f.kind == ErrorKind::NoCredentials
            })
    }
}

impl fmt::Display for GenerateError
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   GenerateError::AllQuotaExceeded { providers, .. } => {
              let names: Vec<&str> = providers
                .iter()
                .map(|p| p.as_str())
                .collect();
              write!(f,
                "Quota exceeded for all providers: {}",
                names.join(", ")
              )
            }
          , GenerateError::AllProvidersFailed { message, .. } => {
              write!(f, "All providers failed: {}", message)
            }
        }
    }
}

impl std::error::Error for GenerateError {}

/// Crate error type.
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Request failed validation before any provider was called
    InvalidRequest(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// No provider produced content
    Generation(GenerateError)
  , /// History sink rejected a record
    History(String)
  , /// Backend task is gone
    BackendDisconnected
  , /// Generic error
    Other(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::InvalidRequest(msg) => {
              write!(f, "Invalid request: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Generation(err) => {
              write!(f, "Generation failed: {}", err)
            }
          , Error::History(msg) => {
              write!(f, "History error: {}", msg)
            }
          , Error::BackendDisconnected => {
              write!(f, "Backend disconnected")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error
{   fn source(&self) -> Option<&(dyn std::error::Error + 'static)>
    {   match self
        {   Error::Generation(err) => Some(err)
          , _ => None
        }
    }
}

impl From<GenerateError> for Error
{   fn from(err: GenerateError) -> Self
    {   Error::Generation(err)
    }
}

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
