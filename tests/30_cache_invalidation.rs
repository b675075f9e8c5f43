mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use serde_json::{json, Value};

use common::films;
use monk_listener::cache::{Cache, MemoryCache};
use monk_listener::listener::{CacheInvalidation, DeferredListener, ListenerPipeline};
use monk_listener::transaction::MemorySession;
use monk_listener::types::RowKey;

fn warm(cache: &MemoryCache<RowKey, Value>, id: i64) {
    let _: Result<Value, ()> = cache.get_or_put(RowKey::new("films", id), |_| Ok(json!({ "id": id })));
}

#[test]
fn get_or_put_returns_existing_value_without_computing() {
    let cache: MemoryCache<RowKey, Value> = MemoryCache::new();
    warm(&cache, 1);

    let calls = AtomicUsize::new(0);
    let value: Result<Value, ()> = cache.get_or_put(RowKey::new("films", 1), |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!("recomputed"))
    });

    assert_eq!(value, Ok(json!({ "id": 1 })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn concurrent_get_or_put_keeps_a_single_value() {
    let cache: Arc<MemoryCache<i64, usize>> = Arc::new(MemoryCache::new());

    let results: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let cache = Arc::clone(&cache);
                scope.spawn(move || cache.get_or_put(1, |_| Ok::<_, ()>(n)).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let stored = cache.get(&1).unwrap();
    assert!(results.iter().all(|value| *value == stored));
}

fn pipeline_for(cache: &Arc<MemoryCache<RowKey, Value>>) -> ListenerPipeline {
    ListenerPipeline::new().with(Arc::new(DeferredListener::post_commit(CacheInvalidation::new(
        Arc::clone(cache),
    ))))
}

#[test]
fn committed_update_evicts_cached_row_after_commit() -> Result<()> {
    let cache: Arc<MemoryCache<RowKey, Value>> = Arc::new(MemoryCache::new());
    warm(&cache, 1);
    warm(&cache, 2);
    let pipeline = pipeline_for(&cache);
    let session = MemorySession::new();
    let table = films();

    session.begin()?;
    pipeline.updated(&session, &table, 1, json!({ "id": 1, "title": "new" }), None)?;
    // still cached while the transaction is open
    assert!(cache.get(&RowKey::new("films", 1)).is_some());
    session.commit()?;

    assert!(cache.get(&RowKey::new("films", 1)).is_none());
    assert!(cache.get(&RowKey::new("films", 2)).is_some());
    Ok(())
}

#[test]
fn rolled_back_delete_keeps_cached_row() -> Result<()> {
    let cache: Arc<MemoryCache<RowKey, Value>> = Arc::new(MemoryCache::new());
    warm(&cache, 1);
    let pipeline = pipeline_for(&cache);
    let session = MemorySession::new();

    session.begin()?;
    pipeline.deleted(&session, &films(), 1, None)?;
    session.rollback()?;

    assert!(cache.get(&RowKey::new("films", 1)).is_some());
    Ok(())
}

#[test]
fn auto_commit_delete_evicts_immediately() -> Result<()> {
    let cache: Arc<MemoryCache<RowKey, Value>> = Arc::new(MemoryCache::new());
    warm(&cache, 4);
    let pipeline = pipeline_for(&cache);
    let session = MemorySession::new();

    pipeline.deleted(&session, &films(), 4, Some(json!({ "id": 4 })))?;

    assert!(cache.get(&RowKey::new("films", 4)).is_none());
    Ok(())
}
