use thiserror::Error;

use crate::listener::ListenerError;
use crate::transaction::TransactionId;

/// Errors from the transaction collaborator
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Transaction {0} is already active on this session")]
    AlreadyActive(TransactionId),

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Transaction {0} is already resolved")]
    Resolved(TransactionId),

    #[error("Pre-commit hook failed, transaction {id} rolled back: {source}")]
    PreCommitFailed {
        id: TransactionId,
        #[source]
        source: ListenerError,
    },

    /// The outcome in `committed` stands; only a hook failed.
    #[error("Transaction {id} resolved (committed={committed}) but a post-commit hook failed: {source}")]
    HookFailed {
        id: TransactionId,
        committed: bool,
        #[source]
        source: ListenerError,
    },
}

impl TransactionError {
    /// Whether the transaction reached the committed state despite the error
    pub fn committed(&self) -> bool {
        matches!(self, TransactionError::HookFailed { committed: true, .. })
    }
}
