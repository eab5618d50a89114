//! Generation history
//!
//! Successful generations are handed to a [`HistorySink`]. The
//! generator only logs sink errors; history never decides whether
//! a generation succeeded.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::request::{GeneratedContent, GenerationRequest, SeoMetadata};
use crate::ProviderId;

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// One archived generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord
{   pub user_id: Option<u64>
  , pub prompt: String
  , pub keyword: String
  , pub provider: ProviderId
  , pub content: String
  , pub metadata: SeoMetadata
  , pub word_count: usize
  , pub created_at: DateTime<Utc>
}

impl HistoryRecord
{   pub fn new(
      user_id: Option<u64>
    , request: &GenerationRequest
    , generated: &GeneratedContent
    ) -> Self
    {   HistoryRecord
        {   user_id
          , prompt: request.prompt.clone()
          , keyword: request.keyword.clone()
          , provider: generated.provider
          , content: generated.content.clone()
          , metadata: generated.metadata.clone()
          , word_count: word_count(&generated.content)
          , created_at: Utc::now()
        }
    }
}

/// Words in `html` once tags are removed
pub fn word_count(html: &str) -> usize
{   let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars()
    {   match c
        {   '<' => { in_tag = true; text.push(' '); }
          , '>' if in_tag => in_tag = false
          , _ if in_tag => {}
          , _ => text.push(c)
        }
    }
    text.split_whitespace().count()
}

/// Append-only destination for successful generations
#[async_trait]
pub trait HistorySink: Send + Sync
{   async fn record(&self, record: HistoryRecord) -> Result<(), Error>;
}

/// In-memory history, newest last
#[derive(Debug, Default)]
pub struct MemoryHistory
{   records: RwLock<Vec<HistoryRecord>>
}

impl MemoryHistory
{   pub fn new() -> Self
    {   MemoryHistory::default()
    }

    /// A user's records, newest first
    pub fn for_user(
      &self
    , user_id: u64
    , limit: usize
    , offset: usize
    ) -> Vec<HistoryRecord>
    {   let records = self.records
          .read()
          .unwrap_or_else(PoisonError::into_inner);
        let mut mine: Vec<HistoryRecord> = records
          .iter()
          .filter(|r| r.user_id == Some(user_id))
          .cloned()
          .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine.into_iter().skip(offset).take(limit).collect()
    }

    pub fn count_for_user(&self, user_id: u64) -> usize
    {   self.records
          .read()
          .unwrap_or_else(PoisonError::into_inner)
          .iter()
          .filter(|r| r.user_id == Some(user_id))
          .count()
    }

    pub fn len(&self) -> usize
    {   self.records
          .read()
          .unwrap_or_else(PoisonError::into_inner)
          .len()
    }

    pub fn is_empty(&self) -> bool
    {   self.len() == 0
    }

    /// Drop records older than `days` (values below 1 mean 30).
    /// Returns how many were removed.
    pub fn cleanup_older_than(&self, days: i64) -> usize
    {   let days = if days < 1 { DEFAULT_RETENTION_DAYS } else { days };
        // A window reaching past the earliest representable time
        // keeps everything
        let cutoff = Duration::try_days(days)
          .and_then(|window| Utc::now().checked_sub_signed(window))
          .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut records = self.records
          .write()
          .unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        let removed = before - records.len();
        info!("Cleaned up {} old history records", removed);
        removed
    }

    /// Insert with an explicit timestamp
    pub fn push(&self, record: HistoryRecord)
    {   self.records
          .write()
          .unwrap_or_else(PoisonError::into_inner)
          .push(record);
    }
}

#[async_trait]
impl HistorySink for MemoryHistory
{   async fn record(&self, record: HistoryRecord) -> Result<(), Error>
    {   debug!(
          "Saving history for {:?} ({} words)",
          record.user_id, record.word_count
        );
        self.push(record);
        Ok(())
    }
}
