// Buffers events per transaction and hands each transaction's batch to a
// CommitHandler exactly once, when the transaction resolves.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::config::ListenerConfig;
use crate::listener::error::ListenerError;
use crate::listener::event::Event;
use crate::listener::traits::{CommitHandler, Listener};
use crate::transaction::{Session, Transaction, TransactionError, TransactionId};

struct EventBuffer<H: CommitHandler> {
    handler: H,
    post_commit: bool,
    // Only the map operations are shared across threads; each list has a
    // single writer, the thread driving its transaction.
    events_by_transaction: DashMap<TransactionId, Vec<Event>>,
}

impl<H: CommitHandler> EventBuffer<H> {
    fn deliver(&self, id: TransactionId, committed: bool) -> Result<(), ListenerError> {
        let Some((_, events)) = self.events_by_transaction.remove(&id) else {
            warn!("{}: commit hook fired for {} with no buffered events", self.handler.name(), id);
            return Ok(());
        };

        info!(
            "{}: delivering {} events for {} (committed={})",
            self.handler.name(),
            events.len(),
            id,
            committed
        );
        self.handler.on_commit(committed, events)
    }

    fn discard(&self, id: TransactionId) {
        if let Some((_, events)) = self.events_by_transaction.remove(&id) {
            debug!(
                "{}: {} resolved without firing its hook, discarding {} events",
                self.handler.name(),
                id,
                events.len()
            );
        }
    }
}

/// Owned by the registered hook. Firing delivers the batch; dropping the hook
/// unfired (pre-commit hook on rollback, abandoned transaction) frees it.
struct DeliveryGuard<H: CommitHandler> {
    buffer: Arc<EventBuffer<H>>,
    id: TransactionId,
    fired: bool,
}

impl<H: CommitHandler> DeliveryGuard<H> {
    fn fire(mut self, committed: bool) -> Result<(), ListenerError> {
        self.fired = true;
        self.buffer.deliver(self.id, committed)
    }
}

impl<H: CommitHandler> Drop for DeliveryGuard<H> {
    fn drop(&mut self) {
        if !self.fired {
            self.buffer.discard(self.id);
        }
    }
}

/// Listener that defers delivery of events until the owning transaction resolves.
///
/// With `post_commit = true` the batch is delivered after commit or rollback with
/// the real outcome. With `post_commit = false` it is delivered from a pre-commit
/// hook, always as `committed = true`, so the handler can still take part in the
/// commit attempt; a failure after that point is not reported again, and a
/// rollback before commit delivers nothing.
///
/// Outside a transaction each event is delivered immediately as its own batch.
pub struct DeferredListener<H: CommitHandler> {
    buffer: Arc<EventBuffer<H>>,
}

impl<H: CommitHandler> DeferredListener<H> {
    pub fn new(handler: H, post_commit: bool) -> Self {
        Self {
            buffer: Arc::new(EventBuffer {
                handler,
                post_commit,
                events_by_transaction: DashMap::new(),
            }),
        }
    }

    /// Post-commit delivery
    pub fn post_commit(handler: H) -> Self {
        Self::new(handler, true)
    }

    /// Pre-commit delivery
    pub fn pre_commit(handler: H) -> Self {
        Self::new(handler, false)
    }

    pub fn from_config(handler: H, config: &ListenerConfig) -> Self {
        Self::new(handler, config.post_commit)
    }

    pub fn is_post_commit(&self) -> bool {
        self.buffer.post_commit
    }

    pub fn handler(&self) -> &H {
        &self.buffer.handler
    }

    /// Number of transactions with buffered, undelivered events
    pub fn pending_transactions(&self) -> usize {
        self.buffer.events_by_transaction.len()
    }

    pub fn buffered_events(&self, id: TransactionId) -> usize {
        self.buffer
            .events_by_transaction
            .get(&id)
            .map(|events| events.len())
            .unwrap_or(0)
    }

    fn add_commit_hook(&self, transaction: &dyn Transaction) -> Result<(), TransactionError> {
        let guard = DeliveryGuard {
            buffer: Arc::clone(&self.buffer),
            id: transaction.id(),
            fired: false,
        };

        if self.buffer.post_commit {
            transaction.post_commit_handler(Box::new(move |committed, _session| guard.fire(committed)))
        } else {
            transaction.pre_commit_handler(Box::new(move |_session| guard.fire(true)))
        }
    }
}

impl<H: CommitHandler> Listener for DeferredListener<H> {
    fn name(&self) -> &'static str {
        self.buffer.handler.name()
    }

    fn on_event(&self, session: &dyn Session, event: &mut Event) -> Result<(), ListenerError> {
        let Some(transaction) = session.current_transaction() else {
            // No transaction: auto-commit, a transaction of one event
            return self.buffer.handler.on_commit(true, vec![event.clone()]);
        };
        let id = transaction.id();

        if let Some(mut events) = self.buffer.events_by_transaction.get_mut(&id) {
            events.push(event.clone());
            return Ok(());
        }

        // First event for this transaction: exactly one hook per id
        self.buffer.events_by_transaction.insert(id, vec![event.clone()]);
        if let Err(e) = self.add_commit_hook(transaction.as_ref()) {
            self.buffer.events_by_transaction.remove(&id);
            return Err(e.into());
        }

        debug!(
            "{}: buffering events for {} ({} delivery)",
            self.buffer.handler.name(),
            id,
            if self.buffer.post_commit { "post-commit" } else { "pre-commit" }
        );
        Ok(())
    }
}
