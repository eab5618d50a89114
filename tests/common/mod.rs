#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use aiseo::providers::{ClientTable, ProviderClient};
use aiseo::{ErrorKind, ProviderFailure, ProviderId, ProviderResult};

pub fn ok(text: &str) -> ProviderResult
{   Ok(text.to_string())
}

pub fn fail(kind: ErrorKind, message: &str) -> ProviderResult
{   Err(ProviderFailure::new(kind, message))
}

/// Replays scripted results in order; the last one repeats.
pub struct ScriptedClient
{   script: Mutex<VecDeque<ProviderResult>>
  , calls: AtomicUsize
  , delay: Duration
}

impl ScriptedClient
{   pub fn new(script: Vec<ProviderResult>) -> Arc<Self>
    {   ScriptedClient::slow(script, Duration::ZERO)
    }

    /// Each call sleeps `delay` before answering
    pub fn slow(script: Vec<ProviderResult>, delay: Duration) -> Arc<Self>
    {   assert!(!script.is_empty(), "script needs at least one result");
        Arc::new(ScriptedClient
        {   script: Mutex::new(script.into())
          , calls: AtomicUsize::new(0)
          , delay
        })
    }

    pub fn always(result: ProviderResult) -> Arc<Self>
    {   ScriptedClient::new(vec![result])
    }

    pub fn calls(&self) -> usize
    {   self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for ScriptedClient
{   fn name(&self) -> &str
    {   "scripted"
    }

    async fn invoke(
      &self
    , _provider: ProviderId
    , _prompt: &str
    ) -> ProviderResult
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero()
        {   tokio::time::sleep(self.delay).await;
        }
        let mut script = self.script.lock().unwrap();
        if script.len() > 1
        {   script.pop_front().unwrap()
        } else
        {   script.front().cloned().unwrap()
        }
    }
}

pub fn table(entries: &[(ProviderId, Arc<ScriptedClient>)]) -> ClientTable
{   entries
      .iter()
      .map(|(id, client)| {
        let client: Arc<dyn ProviderClient> = client.clone();
        (*id, client)
      })
      .collect()
}

pub const ARTICLE: &str = "SEO Title: Green Tea Guide\n\
Meta Description: Everything about green tea.\n\
Synonym Keyword: matcha\n\
Secondary Keyword: tea health\n\
<h2>Why green tea</h2>\n<p>It is good for you.</p>";
