mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use aiseo::cache::{CacheStore, MemoryStore, ResultCache};
use aiseo::failover::{FallbackOrchestrator, RetryPolicy};
use aiseo::history::{HistoryRecord, HistorySink, MemoryHistory};
use aiseo::request::FINGERPRINT_PREFIX;
use aiseo::{
  ContentGenerator, Error, ErrorKind, GenerationRequest, Language,
  ProviderId, Tone,
};

use common::{fail, ok, table, ScriptedClient, ARTICLE};

const HOUR: Duration = Duration::from_secs(3_600);

// ===== Fingerprint =====

fn base_request() -> GenerationRequest
{   GenerationRequest::new("write about tea", "green tea")
      .with_word_count(800)
      .with_tone(Tone::Informative)
      .with_language(Language::English)
      .with_provider(ProviderId::DeepSeek)
}

#[test]
fn test_fingerprint_ignores_construction_order()
{   let a = base_request();
    let b = GenerationRequest::new("write about tea", "green tea")
      .with_provider(ProviderId::DeepSeek)
      .with_language(Language::English)
      .with_tone(Tone::Informative)
      .with_word_count(800);

    let fp = a.fingerprint(Language::Vietnamese);
    assert_eq!(fp, b.fingerprint(Language::Vietnamese));
    assert!(fp.starts_with(FINGERPRINT_PREFIX));
    assert_eq!(fp.len(), FINGERPRINT_PREFIX.len() + 64);
}

#[test]
fn test_fingerprint_changes_with_every_field()
{   let base = base_request().fingerprint(Language::Vietnamese);
    let variants = [
      GenerationRequest { prompt: "write about coffee".into(), ..base_request() }
    , GenerationRequest { keyword: "black tea".into(), ..base_request() }
    , base_request().with_word_count(801)
    , base_request().with_tone(Tone::Humorous)
    , base_request().with_language(Language::Korean)
    , base_request().with_provider(ProviderId::Gemini20)
    ];
    for variant in variants
    {   assert_ne!(
          variant.fingerprint(Language::Vietnamese),
          base,
          "{:?}",
          variant
        );
    }
}

#[test]
fn test_fingerprint_field_boundaries_are_unambiguous()
{   let a = GenerationRequest::new("ab", "c");
    let b = GenerationRequest::new("a", "bc");
    assert_ne!(
      a.fingerprint(Language::English),
      b.fingerprint(Language::English)
    );
}

#[test]
fn test_fingerprint_resolves_default_language()
{   let implicit = GenerationRequest::new("p", "k");
    let explicit = GenerationRequest::new("p", "k")
      .with_language(Language::Vietnamese);
    assert_eq!(
      implicit.fingerprint(Language::Vietnamese),
      explicit.fingerprint(Language::Vietnamese)
    );
    assert_ne!(
      implicit.fingerprint(Language::Vietnamese),
      implicit.fingerprint(Language::English)
    );
}

// ===== ResultCache =====

#[tokio::test(start_paused = true)]
async fn test_ttl_served_before_expiry_and_missed_after()
{   let cache: ResultCache<String> = ResultCache::new(HOUR);
    cache.insert("k", "payload".to_string());

    tokio::time::advance(HOUR - Duration::from_secs(1)).await;
    assert_eq!(cache.get("k"), Some("payload".to_string()));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.get("k"), None);
}

#[tokio::test(start_paused = true)]
async fn test_entry_is_dead_at_exactly_ttl()
{   let cache: ResultCache<String> = ResultCache::new(HOUR);
    cache.insert("k", "payload".to_string());
    tokio::time::advance(HOUR).await;
    assert_eq!(cache.get("k"), None);
}

#[tokio::test(start_paused = true)]
async fn test_get_or_compute_skips_compute_on_hit()
{   let cache: ResultCache<String> = ResultCache::new(HOUR);
    let first: Result<String, Error> = cache
      .get_or_compute("k", || async { Ok("fresh".to_string()) })
      .await;
    assert_eq!(first.unwrap(), "fresh");

    let second: Result<String, Error> = cache
      .get_or_compute("k", || async { Ok("recomputed".to_string()) })
      .await;
    assert_eq!(second.unwrap(), "fresh");
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_is_recomputed_and_restored()
{   let cache: ResultCache<u32> = ResultCache::new(HOUR);
    let _ = cache.get_or_compute("k", || async { Ok::<_, Error>(1) }).await;
    tokio::time::advance(HOUR + Duration::from_secs(1)).await;

    let value = cache
      .get_or_compute("k", || async { Ok::<_, Error>(2) })
      .await
      .unwrap();
    assert_eq!(value, 2);
    assert_eq!(cache.get("k"), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_expired_lookup_shrinks_store()
{   let store = Arc::new(MemoryStore::<u32>::new());
    let cache = ResultCache::with_store(store.clone(), Duration::from_secs(10));
    for i in 0..1_000
    {   cache.insert(&format!("key-{}", i), i);
    }
    tokio::time::advance(Duration::from_secs(11)).await;
    cache.insert("fresh", 7);

    for i in 0..1_000
    {   assert_eq!(cache.get(&format!("key-{}", i)), None);
    }
    assert_eq!(store.len(), 1);
    assert_eq!(cache.get("fresh"), Some(7));
}

#[tokio::test(start_paused = true)]
async fn test_eviction_keeps_a_restored_entry()
{   let store = MemoryStore::<u32>::new();
    store.set("k", 1, Duration::from_secs(10));
    let stale_read = tokio::time::Instant::now() + Duration::from_secs(11);
    tokio::time::advance(Duration::from_secs(11)).await;

    // Another writer refreshed the key after the dead read
    store.set("k", 2, Duration::from_secs(10));
    assert!(!store.evict_expired("k", stale_read));
    assert_eq!(store.get("k").map(|e| e.value), Some(2));
}

#[tokio::test]
async fn test_failures_are_never_cached()
{   let store = Arc::new(MemoryStore::<String>::new());
    let cache = ResultCache::with_store(store.clone(), HOUR);

    let failed: Result<String, Error> = cache
      .get_or_compute("k", || async {
        Err(Error::Other("boom".to_string()))
      })
      .await;
    assert!(failed.is_err());
    assert!(store.is_empty());
    assert_eq!(cache.get("k"), None);
}

#[tokio::test]
async fn test_clear_drops_everything()
{   let store = Arc::new(MemoryStore::<String>::new());
    let cache = ResultCache::with_store(store.clone(), HOUR);
    cache.insert("a", "1".to_string());
    cache.insert("b", "2".to_string());
    assert_eq!(store.len(), 2);

    cache.clear();
    assert!(store.is_empty());
    assert_eq!(cache.get("a"), None);
    assert!(store.get("b").is_none());
}

// ===== ContentGenerator =====

fn generator(
  clients: &[(ProviderId, Arc<ScriptedClient>)]
, priority: Vec<ProviderId>
) -> ContentGenerator
{   let orchestrator = FallbackOrchestrator::new(
      table(clients),
      RetryPolicy::new(2, Duration::from_secs(5)),
      priority
    ).unwrap();
    ContentGenerator::new(
      orchestrator,
      ResultCache::new(HOUR),
      Language::Vietnamese
    )
}

#[tokio::test(start_paused = true)]
async fn test_generate_extracts_metadata()
{   let client = ScriptedClient::always(ok(ARTICLE));
    let gen = generator(
      &[(ProviderId::Gemini15, client)],
      vec![ProviderId::Gemini15]
    );

    let content = gen
      .generate(&GenerationRequest::new("tea", "green tea"))
      .await
      .unwrap();
    assert_eq!(content.provider, ProviderId::Gemini15);
    assert_eq!(content.metadata.meta_title, "Green Tea Guide");
    assert_eq!(content.metadata.secondary_keyword, "tea health");
    assert!(content.content.starts_with("<h2>Why green tea</h2>"));
    assert!(!content.content.contains("SEO Title"));
}

#[tokio::test(start_paused = true)]
async fn test_cache_hit_calls_no_provider()
{   let client = ScriptedClient::always(ok(ARTICLE));
    let gen = generator(
      &[(ProviderId::Gemini15, client.clone())],
      vec![ProviderId::Gemini15]
    );
    let request = GenerationRequest::new("tea", "green tea");

    let first = gen.generate(&request).await.unwrap();
    let second = gen.generate(&request).await.unwrap();

    assert_eq!(client.calls(), 1);
    assert_eq!(first, second);
    assert_eq!(
      serde_json::to_vec(&first).unwrap(),
      serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_generation_is_retried_fresh()
{   let client = ScriptedClient::new(vec![
      fail(ErrorKind::Permanent, "rejected")
    , ok(ARTICLE)
    ]);
    let gen = generator(
      &[(ProviderId::Gemini15, client.clone())],
      vec![ProviderId::Gemini15]
    );
    let request = GenerationRequest::new("tea", "green tea");

    let err = gen.generate(&request).await.unwrap_err();
    assert!(matches!(err, Error::Generation(_)));

    let content = gen.generate(&request).await.unwrap();
    assert_eq!(content.metadata.synonym_keyword, "matcha");
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_invalid_request_never_reaches_providers()
{   let client = ScriptedClient::always(ok(ARTICLE));
    let gen = generator(
      &[(ProviderId::Gemini15, client.clone())],
      vec![ProviderId::Gemini15]
    );

    for request in [
      GenerationRequest::new("  ", "kw")
    , GenerationRequest::new("prompt", "")
    , GenerationRequest::new("prompt", "kw").with_word_count(0)
    ]
    {   let err = gen.generate(&request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)), "{:?}", err);
    }
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_clear_cache_forces_regeneration()
{   let client = ScriptedClient::always(ok(ARTICLE));
    let gen = generator(
      &[(ProviderId::Gemini15, client.clone())],
      vec![ProviderId::Gemini15]
    );
    let request = GenerationRequest::new("tea", "green tea");

    gen.generate(&request).await.unwrap();
    gen.clear_cache();
    gen.generate(&request).await.unwrap();
    assert_eq!(client.calls(), 2);
}

// ===== History =====

struct BrokenSink;

#[async_trait]
impl HistorySink for BrokenSink
{   async fn record(&self, _record: HistoryRecord) -> Result<(), Error>
    {   Err(Error::History("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_history_records_fresh_generations_only()
{   let client = ScriptedClient::always(ok(ARTICLE));
    let history = Arc::new(MemoryHistory::new());
    let gen = generator(
      &[(ProviderId::Gemini15, client)],
      vec![ProviderId::Gemini15]
    ).with_history(history.clone());
    let request = GenerationRequest::new("tea", "green tea");

    gen.generate_for(Some(7), &request).await.unwrap();
    gen.generate_for(Some(7), &request).await.unwrap();

    assert_eq!(history.count_for_user(7), 1);
    let record = &history.for_user(7, 10, 0)[0];
    assert_eq!(record.keyword, "green tea");
    assert_eq!(record.provider, ProviderId::Gemini15);
    assert_eq!(record.metadata.meta_title, "Green Tea Guide");
    // "Why green tea" + "It is good for you."
    assert_eq!(record.word_count, 8);
}

#[tokio::test]
async fn test_history_failure_does_not_fail_generation()
{   let client = ScriptedClient::always(ok(ARTICLE));
    let gen = generator(
      &[(ProviderId::Gemini15, client)],
      vec![ProviderId::Gemini15]
    ).with_history(Arc::new(BrokenSink));

    let content = gen
      .generate(&GenerationRequest::new("tea", "green tea"))
      .await;
    assert!(content.is_ok());
}

#[test]
fn test_history_listing_and_cleanup()
{   use aiseo::request::{GeneratedContent, SeoMetadata};
    use chrono::{Duration as Days, Utc};

    let history = MemoryHistory::new();
    let generated = GeneratedContent
    {   content: "<p>one two</p>".to_string()
      , metadata: SeoMetadata::default()
      , provider: ProviderId::DeepSeek
    };
    let request = GenerationRequest::new("p", "k");

    for age_days in [0, 5, 40]
    {   let mut record = HistoryRecord::new(Some(1), &request, &generated);
        record.created_at = Utc::now() - Days::days(age_days);
        history.push(record);
    }
    history.push(HistoryRecord::new(Some(2), &request, &generated));

    let page = history.for_user(1, 2, 0);
    assert_eq!(page.len(), 2);
    assert!(page[0].created_at > page[1].created_at);
    assert_eq!(history.for_user(1, 10, 2).len(), 1);
    assert_eq!(page[0].word_count, 2);

    assert_eq!(history.cleanup_older_than(0), 1);
    assert_eq!(history.count_for_user(1), 2);
    assert_eq!(history.len(), 3);
}

#[test]
fn test_history_cleanup_with_huge_window_keeps_everything()
{   use aiseo::request::{GeneratedContent, SeoMetadata};
    use chrono::{Duration as Days, Utc};

    let history = MemoryHistory::new();
    let generated = GeneratedContent
    {   content: "<p>old</p>".to_string()
      , metadata: SeoMetadata::default()
      , provider: ProviderId::Gemini15
    };
    let mut record = HistoryRecord::new(
      Some(1),
      &GenerationRequest::new("p", "k"),
      &generated
    );
    record.created_at = Utc::now() - Days::days(10_000);
    history.push(record);

    assert_eq!(history.cleanup_older_than(i64::MAX), 0);
    assert_eq!(history.cleanup_older_than(1_000_000_000), 0);
    assert_eq!(history.len(), 1);
}
