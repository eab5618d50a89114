//! Retry policy, fallback plan and the orchestrator that ties
//! provider clients together

use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::{validate_fallback_order, AiseoConfig};
use crate::error::{
  Error, ErrorKind, GenerateError, ProviderFailure, ProviderResult
};
use crate::providers::{build_client_table, ClientTable};
use crate::ProviderId;

/// Bounded retry with a fixed delay, applied to one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy
{   pub max_attempts: usize
  , pub delay: Duration
}

impl RetryPolicy
{   /// Create a new retry policy; at least one attempt is made
    pub fn new(max_attempts: usize, delay: Duration) -> Self
    {   RetryPolicy
        {   max_attempts: max_attempts.max(1)
          , delay
        }
    }

    pub fn from_config(config: &crate::config::RetryConfig) -> Self
    {   RetryPolicy::new(
          config.max_attempts,
          Duration::from_millis(config.delay_ms)
        )
    }

    /// Run `attempt` until it succeeds, fails with a non-retriable
    /// kind, or the attempt budget runs out.
    pub async fn with_retry<F, Fut>(&self, mut attempt: F)
      -> ProviderResult
    where
      F: FnMut() -> Fut
    , Fut: Future<Output = ProviderResult>
    {   let mut made = 0;
        loop
        {   made += 1;
            let failure = match attempt().await
            {   Ok(text) => return Ok(text)
              , Err(failure) => failure
            };

            match failure.kind
            {   ErrorKind::Transient => {}
              , ErrorKind::NoCredentials
              | ErrorKind::QuotaExceeded
              | ErrorKind::Malformed
              | ErrorKind::Permanent
              | ErrorKind::MaxRetriesExceeded => return Err(failure)
            }

            if made >= self.max_attempts
            {   warn!("Max retries reached after {} attempts", made);
                return Err(ProviderFailure::new(
                  ErrorKind::MaxRetriesExceeded,
                  format!(
                    "gave up after {} attempts: {}",
                    made, failure.message
                  )
                ));
            }

            debug!(
              "Transient failure, retrying in {:?}: {}",
              self.delay, failure.message
            );
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Upper bound on how long a fully failing plan of
    /// `plan_len` providers can block a caller, when every attempt
    /// runs into `timeout`. Saturates at `Duration::MAX`.
    pub fn worst_case_latency(
      &self
    , timeout: Duration
    , plan_len: usize
    ) -> Duration
    {   let attempts = u32::try_from(self.max_attempts).unwrap_or(u32::MAX);
        let providers = u32::try_from(plan_len).unwrap_or(u32::MAX);
        let pauses = self.delay.saturating_mul(attempts.saturating_sub(1));
        timeout
          .saturating_mul(attempts)
          .saturating_add(pauses)
          .saturating_mul(providers)
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(2, Duration::from_secs(5))
    }
}

/// Ordered, duplicate-free provider try-sequence for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPlan
{   providers: Vec<ProviderId>
}

impl FallbackPlan
{   /// Preferred provider first, then `priority` in order with the
    /// preferred entry (and any repeats) removed.
    pub fn new(preferred: ProviderId, priority: &[ProviderId]) -> Self
    {   let mut providers = Vec::with_capacity(priority.len() + 1);
        providers.push(preferred);
        for id in priority
        {   if !providers.contains(id)
            {   providers.push(*id);
            }
        }
        debug!(
          "Fallback plan for {}: {:?}",
          preferred,
          providers.iter().map(|p| p.as_str()).collect::<Vec<_>>()
        );
        FallbackPlan { providers }
    }

    pub fn providers(&self) -> &[ProviderId]
    {   &self.providers
    }

    pub fn len(&self) -> usize
    {   self.providers.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.providers.is_empty()
    }
}

/// Text produced by the first provider that succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText
{   pub text: String
  , pub provider: ProviderId
}

/// Walks a fallback plan, one provider at a time.
pub struct FallbackOrchestrator
{   clients: ClientTable
  , retry: RetryPolicy
  , priority: RwLock<Vec<ProviderId>>
}

impl FallbackOrchestrator
{   pub fn new(
      clients: ClientTable
    , retry: RetryPolicy
    , priority: Vec<ProviderId>
    ) -> Result<Self, Error>
    {   validate_fallback_order(&priority)?;
        Ok(FallbackOrchestrator
        {   clients
          , retry
          , priority: RwLock::new(priority)
        })
    }

    /// Real HTTP clients for every configured vendor
    pub fn from_config(config: &AiseoConfig) -> Result<Self, Error>
    {   config.validate()?;
        FallbackOrchestrator::new(
          build_client_table(config)?,
          RetryPolicy::from_config(&config.retry),
          config.fallback_order.clone()
        )
    }

    pub fn retry_policy(&self) -> &RetryPolicy
    {   &self.retry
    }

    pub fn priority(&self) -> Vec<ProviderId>
    {   self.priority
          .read()
          .unwrap_or_else(PoisonError::into_inner)
          .clone()
    }

    /// Replace the priority list used for new plans
    pub fn set_priority(&self, order: Vec<ProviderId>)
      -> Result<(), Error>
    {   validate_fallback_order(&order)?;
        info!("Fallback order set to {:?}", order);
        *self.priority
          .write()
          .unwrap_or_else(PoisonError::into_inner) = order;
        Ok(())
    }

    pub fn plan(&self, preferred: ProviderId) -> FallbackPlan
    {   FallbackPlan::new(preferred, &self.priority())
    }

    /// Try each provider in plan order until one returns text.
    pub async fn generate(
      &self
    , prompt: &str
    , preferred: ProviderId
    ) -> Result<GeneratedText, GenerateError>
    {   let plan = self.plan(preferred);
        let mut failures: Vec<(ProviderId, ProviderFailure)>
          = Vec::with_capacity(plan.len());

        for &provider in plan.providers()
        {   info!("Trying provider: {}", provider);

            let client = match self.clients.get(&provider)
            {   Some(client) => client
              , None => {
                  warn!("No client registered for {}", provider);
                  failures.push((
                    provider,
                    ProviderFailure::new(
                      ErrorKind::NoCredentials,
                      format!("no client registered for {}", provider)
                    )
                  ));
                  continue;
                }
            };

            debug!("Calling {} through {}", provider, client.name());
            let result = self.retry
              .with_retry(|| client.invoke(provider, prompt))
              .await;

            match result
            {   Ok(text) => {
                  info!("Success with provider: {}", provider);
                  return Ok(GeneratedText { text, provider });
                }
              , Err(failure) => {
                  match failure.kind
                  {   ErrorKind::QuotaExceeded => {
                        warn!(
                          "Quota exceeded for {} ({}), trying next provider",
                          provider, client.name()
                        );
                      }
                    , ErrorKind::NoCredentials
                    | ErrorKind::Transient
                    | ErrorKind::Malformed
                    | ErrorKind::Permanent
                    | ErrorKind::MaxRetriesExceeded => {
                        warn!(
                          "Failed with provider {} ({}): {}",
                          provider, client.name(), failure
                        );
                      }
                  }
                  failures.push((provider, failure));
                }
            }
        }

        warn!("All providers failed");
        Err(aggregate(failures))
    }
}

/// Fold per-provider failures into one terminal error.
fn aggregate(failures: Vec<(ProviderId, ProviderFailure)>)
  -> GenerateError
{   let exhausted: Vec<ProviderId> = failures
      .iter()
      .filter(|(_, f)| f.kind == ErrorKind::QuotaExceeded)
      .map(|(p, _)| *p)
      .collect();

    if !exhausted.is_empty()
    {   return GenerateError::AllQuotaExceeded
        {   providers: exhausted
          , failures
        };
    }

    let message = failures
      .last()
      .map(|(_, f)| f.message.clone())
      .unwrap_or_else(|| "All APIs failed to generate content".to_string());
    GenerateError::AllProvidersFailed
    {   message
      , failures
    }
}
