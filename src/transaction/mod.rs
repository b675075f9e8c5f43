// Transaction collaborator contract consumed by the listener core.
// The core never resolves transactions itself; it only registers hooks.

pub mod error;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::listener::ListenerError;

pub use error::*;
pub use memory::*;

/// Unique, monotonically issued transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Runs once, just before commit is attempted
pub type PreCommitHook = Box<dyn FnOnce(&dyn Session) -> Result<(), ListenerError> + Send>;

/// Runs once, after the transaction committed (`true`) or rolled back (`false`)
pub type PostCommitHook = Box<dyn FnOnce(bool, &dyn Session) -> Result<(), ListenerError> + Send>;

/// Unit of work with a stable id and exactly-once resolution
pub trait Transaction: Send + Sync {
    fn id(&self) -> TransactionId;

    /// Register a callback fired once before commit. Never fired on rollback.
    fn pre_commit_handler(&self, hook: PreCommitHook) -> Result<(), TransactionError>;

    /// Register a callback fired once the outcome is known
    fn post_commit_handler(&self, hook: PostCommitHook) -> Result<(), TransactionError>;
}

/// Connection-scoped context the data-access layer passes to listeners
pub trait Session {
    /// Active transaction, or `None` in auto-commit mode
    fn current_transaction(&self) -> Option<Arc<dyn Transaction>>;
}
