// Evicts cached rows once the transaction that changed them has committed
use std::sync::Arc;

use serde_json::Value;

use crate::cache::Cache;
use crate::listener::error::ListenerError;
use crate::listener::event::Event;
use crate::listener::traits::CommitHandler;
use crate::types::RowKey;

/// Commit handler that invalidates `RowKey { table, id }` for every persisted
/// change in a committed batch. Rolled-back batches leave the cache untouched.
///
/// Wrap in a post-commit `DeferredListener` so readers never repopulate the
/// cache with a value from a transaction that later rolls back.
pub struct CacheInvalidation<C> {
    cache: Arc<C>,
}

impl<C> CacheInvalidation<C>
where
    C: Cache<RowKey, Value> + 'static,
{
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }
}

impl<C> CommitHandler for CacheInvalidation<C>
where
    C: Cache<RowKey, Value> + 'static,
{
    fn name(&self) -> &'static str {
        "CacheInvalidation"
    }

    fn on_commit(&self, committed: bool, events: Vec<Event>) -> Result<(), ListenerError> {
        if !committed {
            tracing::debug!("Rolled back, keeping cache for {} events", events.len());
            return Ok(());
        }

        let mut invalidated = 0;
        for event in events.iter().filter(|event| !event.is_transform()) {
            let key = RowKey::new(event.table_name(), event.id().clone());
            self.cache.invalidate(&key);
            tracing::trace!("Invalidated cached row {}", key);
            invalidated += 1;
        }

        tracing::debug!("Invalidated {} cached rows", invalidated);
        Ok(())
    }
}
