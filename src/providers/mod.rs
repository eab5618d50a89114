//! Text generation provider implementations

pub mod gemini;
pub mod openrouter;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, trace, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::classify::{classify, Body, ErrorPayload, Signal};
use crate::config::AiseoConfig;
use crate::error::{ErrorKind, ProviderFailure, ProviderResult};
use crate::{ProviderId, Vendor};

// Re-export for convenience
pub use gemini::GeminiClient;
pub use openrouter::OpenRouterClient;

/// One external generation backend.
///
/// `invoke` makes at most one network call and keeps no state
/// between calls. Every failure comes back classified.
#[async_trait]
pub trait ProviderClient: Send + Sync
{   /// Vendor name for logs
    fn name(&self) -> &str;

    async fn invoke(
      &self
    , provider: ProviderId
    , prompt: &str
    ) -> ProviderResult;
}

/// Identifier -> client dispatch table
pub type ClientTable = HashMap<ProviderId, Arc<dyn ProviderClient>>;

/// Build one client per vendor and route every id to its vendor.
pub fn build_client_table(config: &AiseoConfig)
  -> Result<ClientTable, crate::error::Error>
{   let gemini: Arc<dyn ProviderClient> = Arc::new(
      GeminiClient::new(config.gemini.clone(), config.generation.clone())?
    );
    let openrouter: Arc<dyn ProviderClient> = Arc::new(
      OpenRouterClient::new(
        config.openrouter.clone(),
        config.generation.clone()
      )?
    );

    let table = ProviderId::ALL
      .into_iter()
      .map(|id| {
        let client = match id.vendor()
        {   Vendor::Gemini => gemini.clone()
          , Vendor::OpenRouter => openrouter.clone()
        };
        (id, client)
      })
      .collect();
    Ok(table)
}

pub(crate) fn http_client(timeout: std::time::Duration)
  -> Result<reqwest::Client, crate::error::Error>
{   reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| {
        crate::error::Error::InvalidConfiguration(
          format!("HTTP client: {}", e)
        )
      })
}

pub(crate) fn missing_credentials(vendor: &str) -> ProviderFailure
{   error!("{} API key is not configured", vendor);
    ProviderFailure::new(
      classify(&Signal::MissingCredentials),
      format!("{} API key is not configured", vendor)
    )
}

pub(crate) fn transport_failure(
  vendor: &str
, err: &reqwest::Error
) -> ProviderFailure
{   error!("{} request failed: {}", vendor, err);
    let detail = if err.is_timeout() { "timed out" } else { "failed" };
    ProviderFailure::new(
      classify(&Signal::Transport),
      format!("{} request {}: {}", vendor, detail, err)
    )
}

#[derive(Debug, Default, Deserialize)]
struct ErrorObject
{   #[serde(default)]
    code: Option<Value>
  , #[serde(default)]
    message: Option<String>
  , #[serde(default)]
    status: Option<String>
}

/// The body's `error` member, whatever its shape.
///
/// A bare string is the message. An object that does not fit
/// [`ErrorObject`] keeps its raw JSON as the message so the quota
/// vocabulary still applies to it.
fn error_object(value: &Value) -> Option<ErrorObject>
{   let raw = match value.get("error")
    {   None | Some(Value::Null) => return None
      , Some(raw) => raw
    };
    let message = match raw
    {   Value::String(s) => s.clone()
      , Value::Object(_) => {
          if let Ok(object) = serde_json::from_value(raw.clone())
          {   return Some(object);
          }
          raw.to_string()
        }
      , other => other.to_string()
    };
    Some(ErrorObject
    {   message: Some(message)
      , ..ErrorObject::default()
    })
}

/// Turn a raw HTTP reply into a provider result.
///
/// `extract` pulls the generated text out of a decoded success
/// body; blank text counts as a permanent failure.
pub(crate) fn interpret_reply(
  vendor: &str
, status: u16
, body: &str
, extract: fn(&Value) -> Option<&str>
) -> ProviderResult
{   debug!("{} response status: {}", vendor, status);
    trace!("{} response body: {}", vendor, body);

    let value: Value = match serde_json::from_str(body)
    {   Ok(value) => value
      , Err(e) => {
          let kind = classify(&Signal::Response
          {   status
            , body: Body::Undecodable
          });
          error!("Invalid JSON response from {}: {}", vendor, e);
          let message = match kind
          {   ErrorKind::Malformed => {
                format!("Invalid JSON response from {}: {}", vendor, e)
              }
            , _ => format!("{} returned HTTP {}", vendor, status)
          };
          return Err(ProviderFailure::new(kind, message));
        }
    };

    let envelope = error_object(&value);

    if let Some(err) = envelope
    {   let code = err.code.as_ref().map(|c| match c
        {   Value::String(s) => s.clone()
          , other => other.to_string()
        });
        let message = err.message
          .clone()
          .unwrap_or_else(|| format!("Unknown {} API error", vendor));
        let payload = ErrorPayload
        {   code: code.as_deref()
          , status: err.status.as_deref()
          , message: &message
        };
        let kind = classify(&Signal::Response
        {   status
          , body: Body::Error(payload)
        });
        warn!("{} API error ({}): {}", vendor, kind, message);
        return Err(ProviderFailure::new(kind, message));
    }

    if !(200..300).contains(&status)
    {   let kind = classify(&Signal::Response
        {   status
          , body: Body::Decoded
        });
        warn!("{} returned HTTP {} ({})", vendor, status, kind);
        return Err(ProviderFailure::new(
          kind,
          format!("{} returned HTTP {}", vendor, status)
        ));
    }

    match extract(&value)
    {   Some(text) if !text.trim().is_empty() => Ok(text.to_string())
      , _ => {
          error!("No content returned from {}", vendor);
          Err(ProviderFailure::new(
            ErrorKind::Permanent,
            format!("No content returned from {}", vendor)
          ))
        }
    }
}
