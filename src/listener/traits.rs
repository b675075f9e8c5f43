use crate::listener::error::ListenerError;
use crate::listener::event::{Event, EventKind};
use crate::transaction::Session;

/// Observer of row mutations, called inline with the persistence call.
///
/// Runs on whichever thread owns the active transaction and must not block
/// indefinitely. Transform listeners rewrite `event.transformed_mut()` in place.
pub trait Listener: Send + Sync {
    /// Listener name for logging and debugging
    fn name(&self) -> &'static str;

    fn on_event(&self, session: &dyn Session, event: &mut Event) -> Result<(), ListenerError>;

    /// Check if listener applies to this kind of event
    fn applies_to(&self, _kind: EventKind) -> bool {
        true
    }

    /// Check if listener applies to this table
    fn applies_to_table(&self, _table: &str) -> bool {
        true
    }
}

/// Receives the complete, ordered event list of one resolved transaction.
///
/// Called exactly once per transaction id, never with a partial list. Auto-commit
/// mutations arrive as a single-event batch with `committed = true`.
pub trait CommitHandler: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn on_commit(&self, committed: bool, events: Vec<Event>) -> Result<(), ListenerError>;
}
