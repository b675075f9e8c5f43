// Scripted walkthrough: a transaction inserts, updates and deletes rows while
// immediate and deferred listeners observe it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::cache::{Cache, MemoryCache};
use crate::cli::utils::{output_batch, output_success};
use crate::cli::OutputFormat;
use crate::listener::{
    CacheInvalidation, CommitHandler, DeferredListener, Event, EventLogger, ListenerError,
    ListenerPipeline, TimestampTransform,
};
use crate::transaction::{MemorySession, Session, Transaction};
use crate::types::{RecordId, RowKey, Table, TableRef};

#[derive(Debug, Clone, Copy)]
pub struct DemoOptions {
    pub pre_commit: bool,
    pub rollback: bool,
    pub rows: i64,
}

type Rows = Arc<Mutex<HashMap<RecordId, Value>>>;

/// Prints each delivered batch
struct BatchPrinter {
    output_format: OutputFormat,
}

impl CommitHandler for BatchPrinter {
    fn name(&self) -> &'static str {
        "BatchPrinter"
    }

    fn on_commit(&self, committed: bool, events: Vec<Event>) -> Result<(), ListenerError> {
        output_batch(self.output_format, self.name(), committed, &events)
            .map_err(|e| ListenerError::failed(self.name(), e.to_string()))
    }
}

pub fn handle(options: DemoOptions, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = crate::config::config();
    let films = Table::new("films").shared();
    let rows: Rows = Arc::new(Mutex::new(HashMap::new()));
    let cache = Arc::new(MemoryCache::<RowKey, Value>::from_config(&config.cache));

    let post_commit = config.listener.post_commit && !options.pre_commit;
    let mut pipeline = ListenerPipeline::new().with(Arc::new(TimestampTransform::new()));
    if config.listener.log_events {
        pipeline.register(Arc::new(EventLogger::from_config(&config.listener)));
    }
    pipeline.register(Arc::new(DeferredListener::new(BatchPrinter { output_format }, post_commit)));
    if config.cache.enabled {
        pipeline.register(Arc::new(DeferredListener::post_commit(CacheInvalidation::new(Arc::clone(&cache)))));
    }

    let session = MemorySession::new();

    // Seed one row in auto-commit mode and warm the cache with it
    let seed = pipeline.pre_insert(&session, &films, 0, json!({ "title": "Seed" }))?;
    lock(&rows).insert(RecordId::Int(0), seed.clone());
    pipeline.inserted(&session, &films, 0, seed)?;
    load(&cache, &rows, &films, 0)?;

    let transaction = session.begin()?;
    let staged: Arc<Mutex<Vec<(RecordId, Option<Value>)>>> = Arc::new(Mutex::new(Vec::new()));

    // Apply staged writes only once the transaction commits
    {
        let rows = Arc::clone(&rows);
        let staged = Arc::clone(&staged);
        transaction.post_commit_handler(Box::new(move |committed, _| {
            if committed {
                let mut rows = lock(&rows);
                for (id, value) in lock(&staged).drain(..) {
                    match value {
                        Some(value) => rows.insert(id, value),
                        None => rows.remove(&id),
                    };
                }
            }
            Ok(())
        }))?;
    }

    for id in 1..=options.rows {
        let row = pipeline.pre_insert(&session, &films, id, json!({ "title": format!("Film {}", id) }))?;
        lock(&staged).push((RecordId::Int(id), Some(row.clone())));
        pipeline.inserted(&session, &films, id, row)?;
    }

    let old = lock(&rows).get(&RecordId::Int(0)).cloned();
    let updated = pipeline.pre_update(&session, &films, 0, json!({ "title": "Seed (remastered)" }), old.clone())?;
    lock(&staged).push((RecordId::Int(0), Some(updated.clone())));
    pipeline.updated(&session, &films, 0, updated, old)?;

    if options.rows > 0 {
        let last_id = RecordId::Int(options.rows);
        let last = lock(&staged)
            .iter()
            .rev()
            .find(|(id, _)| *id == last_id)
            .and_then(|(_, value)| value.clone());
        lock(&staged).push((last_id, None));
        pipeline.deleted(&session, &films, options.rows, last)?;
    }

    if options.rollback {
        session.rollback()?;
    } else {
        session.commit()?;
    }

    let cached_seed = cache.get(&RowKey::new(films.name.clone(), 0));
    output_success(
        output_format,
        if options.rollback { "Transaction rolled back" } else { "Transaction committed" },
        Some(json!({
            "delivery": if post_commit { "post-commit" } else { "pre-commit" },
            "rows": lock(&rows).len(),
            "seed_cached": cached_seed.is_some(),
            "in_transaction": session.current_transaction().is_some(),
        })),
    )
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Read-through load of one row into the cache
fn load(cache: &MemoryCache<RowKey, Value>, rows: &Rows, table: &TableRef, id: i64) -> anyhow::Result<Value> {
    cache.get_or_put(RowKey::new(table.name.clone(), id), |key| {
        lock(rows)
            .get(&key.id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No row {}", key))
    })
}
