pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod classify;
pub mod failover;
pub mod cache;
pub mod content;
pub mod history;
pub mod client;
use serde::{Deserialize, Serialize};
use log::warn;

/*

aiseo generates SEO articles by asking one of several text
generation APIs, falling back to the next one in line when a
provider is rate-limited, unreachable or broken.

aiseo/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports, provider ids, backend API
│   ├── main.rs         # stdin/stdout runner
│   ├── error.rs        # Failure taxonomy and crate error
│   ├── config.rs       # Provider, retry, cache configuration
│   ├── request.rs      # Request, fingerprint, outcome types
│   ├── classify.rs     # Raw failure -> ErrorKind
│   ├── failover.rs     # Retry policy, fallback plan, orchestrator
│   ├── cache.rs        # TTL result cache
│   ├── content.rs      # SEO prompt and metadata extraction
│   ├── history.rs      # Generation history sink
│   ├── client.rs       # ContentGenerator and backend task
│   └── providers/
│       ├── mod.rs      # ProviderClient trait, reply decoding
│       ├── gemini.rs
│       └── openrouter.rs
└── tests/

*/

pub use error::{Error, ErrorKind, GenerateError, ProviderFailure, ProviderResult};
pub use config::AiseoConfig;
pub use request::{GeneratedContent, GenerationRequest, Language, SeoMetadata, Tone};
pub use failover::{FallbackOrchestrator, FallbackPlan, RetryPolicy};
pub use cache::{MemoryStore, ResultCache};
pub use history::{HistoryRecord, HistorySink, MemoryHistory};
pub use client::{ContentGenerator, GeneratorBackend};

/// AISEO API INTERFACE:

// ===== Generate =====

pub type GenerateReply = Result<GeneratedContent, crate::error::Error>;
pub type GenerateReplySender
  = tokio::sync::mpsc::UnboundedSender<GenerateReply>;

pub struct GenerateArgs
{   pub request: GenerationRequest
  , pub user_id: Option<u64>
  , pub reply: GenerateReplySender
}

// ===== ClearCache =====

pub type ClearCacheReply = Result<(), crate::error::Error>;
pub type ClearCacheReplySender
  = tokio::sync::mpsc::UnboundedSender<ClearCacheReply>;

pub struct ClearCacheArgs
{   pub reply: ClearCacheReplySender
}

// ===== SetFallbackOrder =====

pub type SetFallbackOrderReply = Result<(), crate::error::Error>;
pub type SetFallbackOrderReplySender
  = tokio::sync::mpsc::UnboundedSender<SetFallbackOrderReply>;

pub struct SetFallbackOrderArgs
{   pub order: Vec<ProviderId>
  , pub reply: SetFallbackOrderReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== AiseoHand (sender side) =====

pub struct AiseoHand
{   pub generate_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateArgs>
  , pub clear_cache_tx
      : tokio::sync::mpsc::UnboundedSender<ClearCacheArgs>
  , pub set_fallback_order_tx
      : tokio::sync::mpsc::UnboundedSender<SetFallbackOrderArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== AiseoFoot (receiver side) =====

pub struct AiseoFoot
{   pub generate_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateArgs>
  , pub clear_cache_rx
      : tokio::sync::mpsc::UnboundedReceiver<ClearCacheArgs>
  , pub set_fallback_order_rx
      : tokio::sync::mpsc::UnboundedReceiver<SetFallbackOrderArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// AISEO STRUCTURES:

/// Vendor API a provider id is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor
{   /// Google Generative Language API
    Gemini
  , /// OpenRouter chat completions
    OpenRouter
}

/// One backend + model combination the editor can ask for.
/// Several ids share a vendor and differ only in model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderId
{   /// Gemini 1.5 Flash
    Gemini15
  , /// Gemini 2.0 Flash
    Gemini20
  , /// Gemini 3 Flash (no model entry, uses vendor default)
    Gemini3Flash
  , /// Gemini via a studio-licensed key (uses vendor default)
    GeminiStudio
  , /// DeepSeek V3 served through OpenRouter
    DeepSeek
}

/// Natural try-order when nothing else is configured.
pub const DEFAULT_FALLBACK_ORDER: [ProviderId; 3] = [
  ProviderId::Gemini15
, ProviderId::Gemini20
, ProviderId::DeepSeek
];

impl ProviderId
{   pub const ALL: [ProviderId; 5] = [
      ProviderId::Gemini15
    , ProviderId::Gemini20
    , ProviderId::Gemini3Flash
    , ProviderId::GeminiStudio
    , ProviderId::DeepSeek
    ];

    /// Identifier as sent by the editor
    pub fn as_str(self) -> &'static str
    {   match self
        {   ProviderId::Gemini15 => "gemini-1.5"
          , ProviderId::Gemini20 => "gemini-2.0"
          , ProviderId::Gemini3Flash => "gemini-3-flash"
          , ProviderId::GeminiStudio => "gemini-studio"
          , ProviderId::DeepSeek => "deepseek"
        }
    }

    pub fn vendor(self) -> Vendor
    {   match self
        {   ProviderId::Gemini15
          | ProviderId::Gemini20
          | ProviderId::Gemini3Flash
          | ProviderId::GeminiStudio => Vendor::Gemini
          , ProviderId::DeepSeek => Vendor::OpenRouter
        }
    }

    /// Strict lookup; `None` for unknown identifiers.
    pub fn lookup(s: &str) -> Option<ProviderId>
    {   let s = s.trim();
        ProviderId::ALL
          .into_iter()
          .find(|p| p.as_str().eq_ignore_ascii_case(s))
    }

    /// Lenient parse: unknown identifiers become `gemini-1.5`.
    pub fn parse(s: &str) -> ProviderId
    {   match ProviderId::lookup(s)
        {   Some(id) => id
          , None => {
              warn!(
                "Unknown provider '{}', using {}",
                s,
                ProviderId::Gemini15.as_str()
              );
              ProviderId::Gemini15
            }
        }
    }
}

impl Default for ProviderId
{   fn default() -> Self
    {   ProviderId::Gemini15
    }
}

impl std::fmt::Display for ProviderId
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl From<String> for ProviderId
{   fn from(s: String) -> Self
    {   ProviderId::parse(&s)
    }
}

impl From<ProviderId> for String
{   fn from(id: ProviderId) -> Self
    {   id.as_str().to_string()
    }
}
