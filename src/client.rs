use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use log::{debug, error, info, warn};

use crate::cache::ResultCache;
use crate::config::AiseoConfig;
use crate::content::{build_prompt, extract_metadata};
use crate::error::Error;
use crate::failover::FallbackOrchestrator;
use crate::history::{HistoryRecord, HistorySink};
use crate::request::{GeneratedContent, GenerationRequest, Language};
use crate::{AiseoFoot, ProviderId};

/// Cache in front of the fallback orchestrator, plus prompt
/// building, metadata extraction and history.
pub struct ContentGenerator
{   orchestrator: FallbackOrchestrator
  , cache: ResultCache<GeneratedContent>
  , history: Option<Arc<dyn HistorySink>>
  , default_language: Language
}

impl ContentGenerator
{   pub fn new(
      orchestrator: FallbackOrchestrator
    , cache: ResultCache<GeneratedContent>
    , default_language: Language
    ) -> Self
    {   debug!("Initializing ContentGenerator");
        ContentGenerator
        {   orchestrator
          , cache
          , history: None
          , default_language
        }
    }

    /// Real provider clients and an in-memory cache
    pub fn from_config(config: &AiseoConfig) -> Result<Self, Error>
    {   let orchestrator = FallbackOrchestrator::from_config(config)?;
        let cache = ResultCache::new(
          Duration::from_secs(config.cache.ttl_secs)
        );
        Ok(ContentGenerator::new(
          orchestrator,
          cache,
          config.default_language
        ))
    }

    pub fn with_history(mut self, sink: Arc<dyn HistorySink>) -> Self
    {   self.history = Some(sink);
        self
    }

    pub fn orchestrator(&self) -> &FallbackOrchestrator
    {   &self.orchestrator
    }

    pub fn cache(&self) -> &ResultCache<GeneratedContent>
    {   &self.cache
    }

    pub fn default_language(&self) -> Language
    {   self.default_language
    }

    /// Generate without attributing history to a user
    pub async fn generate(&self, request: &GenerationRequest)
      -> Result<GeneratedContent, Error>
    {   self.generate_for(None, request).await
    }

    /// Cache lookup, then the fallback plan on a miss.
    pub async fn generate_for(
      &self
    , user_id: Option<u64>
    , request: &GenerationRequest
    ) -> Result<GeneratedContent, Error>
    {   request.validate()?;
        let key = request.fingerprint(self.default_language);
        debug!("Generating for key: {}", key);

        self.cache
          .get_or_compute(&key, || async {
            let prompt = build_prompt(request, self.default_language);
            let generated = self.orchestrator
              .generate(&prompt, request.preferred_provider)
              .await
              .map_err(|e| {
                error!("Generation failed: {}", e);
                Error::from(e)
              })?;

            let (metadata, content) = extract_metadata(&generated.text);
            let result = GeneratedContent
            {   content
              , metadata
              , provider: generated.provider
            };
            self.record_history(user_id, request, &result).await;
            Ok(result)
          })
          .await
    }

    pub fn clear_cache(&self)
    {   self.cache.clear();
    }

    pub fn set_fallback_order(&self, order: Vec<ProviderId>)
      -> Result<(), Error>
    {   self.orchestrator.set_priority(order)
    }

    async fn record_history(
      &self
    , user_id: Option<u64>
    , request: &GenerationRequest
    , result: &GeneratedContent
    )
    {   let sink = match &self.history
        {   Some(sink) => sink
          , None => return
        };
        let record = HistoryRecord::new(user_id, request, result);
        if let Err(e) = sink.record(record).await
        {   warn!("Failed to save content to history: {}", e);
        }
    }
}

/// Channel front-end for a shared [`ContentGenerator`] - owns the task
pub struct GeneratorBackend
{   hand: crate::AiseoHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl GeneratorBackend
{   /// Spawn the backend loop.
    /// Returns immediately; must be called inside a runtime.
    pub fn new(generator: Arc<ContentGenerator>) -> Self
    {   debug!("Creating GeneratorBackend with task ownership");

        let (generate_tx, generate_rx)
          = mpsc::unbounded_channel();
        let (clear_cache_tx, clear_cache_rx)
          = mpsc::unbounded_channel();
        let (set_fallback_order_tx, set_fallback_order_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::AiseoHand
        {   generate_tx
          , clear_cache_tx
          , set_fallback_order_tx
          , kill_process_tx
        };

        let foot = crate::AiseoFoot
        {   generate_rx
          , clear_cache_rx
          , set_fallback_order_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, generator).await
        });

        GeneratorBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a generation - returns almost immediately
    pub async fn generate(
      &self
    , request: GenerationRequest
    , user_id: Option<u64>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateReply>,
        Error
      >
    {   debug!("generate queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateArgs
        {   request
          , user_id
          , reply: reply_tx
        };

        self.hand.generate_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            Error::BackendDisconnected
          })?;

        Ok(reply_rx)
    }

    /// Clear the result cache - returns almost immediately
    pub async fn clear_cache(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::ClearCacheReply>,
        Error
      >
    {   debug!("clear_cache queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.hand.clear_cache_tx
          .send(crate::ClearCacheArgs { reply: reply_tx })
          .map_err(|_| {
            error!("Backend channel closed");
            Error::BackendDisconnected
          })?;

        Ok(reply_rx)
    }

    /// Replace the fallback priority list - returns almost immediately
    pub async fn set_fallback_order(
      &self
    , order: Vec<ProviderId>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::SetFallbackOrderReply>,
        Error
      >
    {   debug!("set_fallback_order queuing");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::SetFallbackOrderArgs
        {   order
          , reply: reply_tx
        };

        self.hand.set_fallback_order_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            Error::BackendDisconnected
          })?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self) -> Result<(), Error>
    {   debug!("Shutting down GeneratorBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        self.hand.kill_process_tx
          .send(crate::KillProcessArgs { reply: reply_tx })
          .map_err(|_| {
            error!("Backend channel already closed");
            Error::BackendDisconnected
          })?;

        // Wait for shutdown confirmation
        match reply_rx.recv().await
        {   Some(result) => {
              debug!("Backend shutdown confirmed");
              result
            }
          , None => {
              error!("Backend stopped without confirming shutdown");
              Err(Error::BackendDisconnected)
            }
        }
    }
}

/// Main backend event loop
///
/// tokio::select! only routes commands. Generation runs on its own
/// task so a slow fallback plan never holds up other requests.
async fn run_backend_loop(
  foot: AiseoFoot
, generator: Arc<ContentGenerator>
)
{   debug!("Starting GeneratorBackend event loop");
    let AiseoFoot
    {   mut generate_rx
      , mut clear_cache_rx
      , mut set_fallback_order_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = generate_rx.recv() => {
          debug!(
            "Received Generate for provider: {}",
            cmd.request.preferred_provider
          );
          let generator = generator.clone();
          tokio::spawn(async move {
            let result = generator
              .generate_for(cmd.user_id, &cmd.request)
              .await;
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = clear_cache_rx.recv() => {
          debug!("Received ClearCache");
          generator.clear_cache();
          let _ = cmd.reply.send(Ok(()));
        }
      , Some(cmd) = set_fallback_order_rx.recv() => {
          debug!("Received SetFallbackOrder");
          let _ = cmd.reply.send(
            generator.set_fallback_order(cmd.order)
          );
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("GeneratorBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
