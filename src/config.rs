//! Configuration for providers, retries, caching and generation

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use log::{debug, info};

use crate::error::Error;
use crate::request::Language;
use crate::{ProviderId, Vendor, DEFAULT_FALLBACK_ORDER};

pub const GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENROUTER_API_BASE: &str
  = "https://openrouter.ai/api/v1";

pub const GEMINI_KEY_ENV: &str = "AISEO_GEMINI_API_KEY";
pub const OPENROUTER_KEY_ENV: &str = "AISEO_OPENROUTER_API_KEY";

/// Built-in model table; ids without an entry use the vendor default
pub fn builtin_model(provider: ProviderId) -> Option<&'static str>
{   match provider
    {   ProviderId::Gemini15 => Some("gemini-1.5-flash")
      , ProviderId::Gemini20 => Some("gemini-2.0-flash")
      , ProviderId::DeepSeek => Some("deepseek/deepseek-chat:free")
      , ProviderId::Gemini3Flash
      | ProviderId::GeminiStudio => None
    }
}

pub fn vendor_default_model(vendor: Vendor) -> &'static str
{   match vendor
    {   Vendor::Gemini => "gemini-1.5-flash"
      , Vendor::OpenRouter => "deepseek/deepseek-chat:free"
    }
}

pub fn vendor_api_base(vendor: Vendor) -> &'static str
{   match vendor
    {   Vendor::Gemini => GEMINI_API_BASE
      , Vendor::OpenRouter => OPENROUTER_API_BASE
    }
}

fn default_timeout_secs() -> u64
{   60
}

/// Per-vendor configuration, injected into the provider client.
/// Unset fields resolve to the vendor's built-in values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig
{   /// API key; `None` or blank means not configured
    #[serde(default)]
    pub api_key: Option<String>
  , /// API base URL override
    #[serde(default)]
    pub api_base: Option<String>
  , /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64
  , /// Model override for ids missing from the model table
    #[serde(default)]
    pub default_model: Option<String>
  , /// Provider id -> model name overrides
    #[serde(default)]
    pub models: HashMap<ProviderId, String>
}

impl ProviderConfig
{   pub fn new() -> Self
    {   ProviderConfig
        {   timeout_secs: default_timeout_secs()
          , ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self
    {   self.api_key = Some(key.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self
    {   self.api_base = Some(base.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self
    {   self.timeout_secs = secs;
        self
    }

    pub fn with_model(
      mut self
    , provider: ProviderId
    , model: impl Into<String>
    ) -> Self
    {   self.models.insert(provider, model.into());
        self
    }

    /// Configured key, ignoring blank values
    pub fn credential(&self) -> Option<&str>
    {   self.api_key
          .as_deref()
          .map(str::trim)
          .filter(|k| !k.is_empty())
    }

    pub fn base_url(&self, vendor: Vendor) -> &str
    {   self.api_base
          .as_deref()
          .unwrap_or_else(|| vendor_api_base(vendor))
          .trim_end_matches('/')
    }

    /// Model for a provider id: override, then built-in table,
    /// then the vendor default
    pub fn model_for(&self, provider: ProviderId) -> &str
    {   if let Some(model) = self.models.get(&provider)
        {   return model;
        }
        if let Some(model) = builtin_model(provider)
        {   return model;
        }
        self.default_model
          .as_deref()
          .unwrap_or_else(|| vendor_default_model(provider.vendor()))
    }

    pub fn timeout(&self) -> Duration
    {   Duration::from_secs(self.timeout_secs)
    }
}

/// Retry configuration for a single provider call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   /// Total attempts per provider, including the first
    pub max_attempts: usize
  , /// Fixed delay between attempts in milliseconds
    pub delay_ms: u64
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_attempts: 2
          , delay_ms: 5_000
        }
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig
{   /// Time to live in seconds
    pub ttl_secs: u64
}

impl Default for CacheConfig
{   fn default() -> Self
    {   CacheConfig
        {   ttl_secs: 3_600
        }
    }
}

/// Sampling parameters sent with every provider request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig
{   pub temperature: f32
  , pub max_output_tokens: u32
}

impl Default for GenerationConfig
{   fn default() -> Self
    {   GenerationConfig
        {   temperature: 0.7
          , max_output_tokens: 2048
        }
    }
}

/// AISEO configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiseoConfig
{   /// Gemini vendor settings
    pub gemini: ProviderConfig
  , /// OpenRouter vendor settings
    pub openrouter: ProviderConfig
  , /// Retry settings
    pub retry: RetryConfig
  , /// Cache settings
    pub cache: CacheConfig
  , /// Sampling settings
    pub generation: GenerationConfig
  , /// Priority list the fallback plan is built from
    pub fallback_order: Vec<ProviderId>
  , /// Language used when a request does not name one
    pub default_language: Language
}

impl Default for AiseoConfig
{   fn default() -> Self
    {   AiseoConfig
        {   gemini: ProviderConfig::new()
          , openrouter: ProviderConfig::new()
          , retry: RetryConfig::default()
          , cache: CacheConfig::default()
          , generation: GenerationConfig::default()
          , fallback_order: DEFAULT_FALLBACK_ORDER.to_vec()
          , default_language: Language::default()
        }
    }
}

impl AiseoConfig
{   /// Load from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>)
      -> Result<Self, Error>
    {   let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(path)
          .map_err(|e| {
            Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        let config: AiseoConfig = serde_json::from_str(&raw)
          .map_err(|e| {
            Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        config.validate()?;
        Ok(config)
    }

    /// Fill API keys from the environment where set
    pub fn with_env_keys(mut self) -> Self
    {   if let Ok(key) = std::env::var(GEMINI_KEY_ENV)
        {   info!("Using Gemini key from {}", GEMINI_KEY_ENV);
            self.gemini.api_key = Some(key);
        }
        if let Ok(key) = std::env::var(OPENROUTER_KEY_ENV)
        {   info!("Using OpenRouter key from {}", OPENROUTER_KEY_ENV);
            self.openrouter.api_key = Some(key);
        }
        self
    }

    pub fn provider(&self, vendor: Vendor) -> &ProviderConfig
    {   match vendor
        {   Vendor::Gemini => &self.gemini
          , Vendor::OpenRouter => &self.openrouter
        }
    }

    pub fn validate(&self) -> Result<(), Error>
    {   if self.retry.max_attempts == 0
        {   return Err(Error::InvalidConfiguration(
              "retry.max_attempts must be at least 1".to_string()
            ));
        }
        if self.cache.ttl_secs == 0
        {   return Err(Error::InvalidConfiguration(
              "cache.ttl_secs must be positive".to_string()
            ));
        }
        validate_fallback_order(&self.fallback_order)?;
        for vendor in [Vendor::Gemini, Vendor::OpenRouter]
        {   if self.provider(vendor).timeout_secs == 0
            {   return Err(Error::InvalidConfiguration(
                  format!("{:?} timeout_secs must be positive", vendor)
                ));
            }
        }
        Ok(())
    }
}

/// Fallback order must be non-empty and duplicate-free
pub fn validate_fallback_order(order: &[ProviderId])
  -> Result<(), Error>
{   if order.is_empty()
    {   return Err(Error::InvalidConfiguration(
          "fallback_order is empty".to_string()
        ));
    }
    for (i, id) in order.iter().enumerate()
    {   if order[..i].contains(id)
        {   return Err(Error::InvalidConfiguration(
              format!("fallback_order lists {} twice", id)
            ));
        }
    }
    Ok(())
}
