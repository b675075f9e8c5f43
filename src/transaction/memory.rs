use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};

use crate::transaction::{
    PostCommitHook, PreCommitHook, Session, Transaction, TransactionError, TransactionId,
};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct Hooks {
    pre_commit: Vec<PreCommitHook>,
    post_commit: Vec<PostCommitHook>,
    resolved: bool,
}

/// In-process transaction: tracks hooks and resolution, holds no data
pub struct MemoryTransaction {
    id: TransactionId,
    hooks: Mutex<Hooks>,
}

impl MemoryTransaction {
    fn new() -> Self {
        Self {
            id: TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed)),
            hooks: Mutex::new(Hooks::default()),
        }
    }

    // Hooks are user callbacks and never run under this lock, so a poisoned
    // guard still holds consistent state.
    fn lock(&self) -> MutexGuard<'_, Hooks> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_pre_commit(&self) -> Vec<PreCommitHook> {
        std::mem::take(&mut self.lock().pre_commit)
    }

    /// Mark resolved. Returns the unfired pre-commit hooks and the post-commit hooks.
    fn resolve(&self) -> (Vec<PreCommitHook>, Vec<PostCommitHook>) {
        let mut hooks = self.lock();
        hooks.resolved = true;
        (
            std::mem::take(&mut hooks.pre_commit),
            std::mem::take(&mut hooks.post_commit),
        )
    }

    pub fn is_resolved(&self) -> bool {
        self.lock().resolved
    }
}

impl Transaction for MemoryTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    fn pre_commit_handler(&self, hook: PreCommitHook) -> Result<(), TransactionError> {
        let mut hooks = self.lock();
        if hooks.resolved {
            return Err(TransactionError::Resolved(self.id));
        }
        hooks.pre_commit.push(hook);
        Ok(())
    }

    fn post_commit_handler(&self, hook: PostCommitHook) -> Result<(), TransactionError> {
        let mut hooks = self.lock();
        if hooks.resolved {
            return Err(TransactionError::Resolved(self.id));
        }
        hooks.post_commit.push(hook);
        Ok(())
    }
}

/// Single-connection session driving at most one transaction at a time
#[derive(Default)]
pub struct MemorySession {
    current: Mutex<Option<Arc<MemoryTransaction>>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<MemoryTransaction>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active(&self) -> Result<Arc<MemoryTransaction>, TransactionError> {
        self.slot().clone().ok_or(TransactionError::NoActiveTransaction)
    }

    pub fn is_active(&self) -> bool {
        self.slot().is_some()
    }

    /// Start a transaction. Nested transactions are not supported.
    pub fn begin(&self) -> Result<Arc<MemoryTransaction>, TransactionError> {
        let mut slot = self.slot();
        if let Some(existing) = slot.as_ref() {
            return Err(TransactionError::AlreadyActive(existing.id));
        }
        let transaction = Arc::new(MemoryTransaction::new());
        debug!("Began transaction {}", transaction.id);
        *slot = Some(Arc::clone(&transaction));
        Ok(transaction)
    }

    /// Run pre-commit hooks, then commit and run post-commit hooks.
    ///
    /// Hooks registered by a running pre-commit hook (derived writes) run in the
    /// same commit attempt. A failing pre-commit hook rolls the transaction back.
    pub fn commit(&self) -> Result<(), TransactionError> {
        let transaction = self.active()?;
        let id = transaction.id;

        loop {
            let hooks = transaction.take_pre_commit();
            if hooks.is_empty() {
                break;
            }
            for hook in hooks {
                if let Err(source) = hook(self) {
                    error!("Pre-commit hook failed for {}: {}", id, source);
                    if let Err(rollback_error) = self.finish(&transaction, false) {
                        error!("Rollback after failed pre-commit of {}: {}", id, rollback_error);
                    }
                    return Err(TransactionError::PreCommitFailed { id, source });
                }
            }
        }

        self.finish(&transaction, true)
    }

    /// Roll back and run post-commit hooks with `committed = false`
    pub fn rollback(&self) -> Result<(), TransactionError> {
        let transaction = self.active()?;
        self.finish(&transaction, false)
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<TransactionError>,
    {
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = self.rollback() {
                    warn!("Rollback failed: {}", rollback_error);
                }
                Err(e)
            }
        }
    }

    fn finish(&self, transaction: &Arc<MemoryTransaction>, committed: bool) -> Result<(), TransactionError> {
        let id = transaction.id;
        let (unfired, post_commit) = transaction.resolve();

        {
            let mut slot = self.slot();
            if slot.as_ref().is_some_and(|current| current.id == id) {
                *slot = None;
            }
        }
        drop(unfired);

        debug!(
            "Transaction {} {} with {} post-commit hooks",
            id,
            if committed { "committed" } else { "rolled back" },
            post_commit.len()
        );

        // Every hook runs even if an earlier one fails
        let mut first_error = None;
        for hook in post_commit {
            if let Err(source) = hook(committed, self) {
                error!("Post-commit hook failed for {}: {}", id, source);
                first_error.get_or_insert(source);
            }
        }

        match first_error {
            Some(source) => Err(TransactionError::HookFailed { id, committed, source }),
            None => Ok(()),
        }
    }
}

impl Session for MemorySession {
    fn current_transaction(&self) -> Option<Arc<dyn Transaction>> {
        self.slot()
            .clone()
            .map(|transaction| transaction as Arc<dyn Transaction>)
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        let active = self.slot().clone();
        if let Some(transaction) = active {
            warn!("Session dropped with active transaction {}, rolling back", transaction.id);
            if let Err(e) = self.finish(&transaction, false) {
                error!("Rollback on drop failed: {}", e);
            }
        }
    }
}
