use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::listener::{CommitHandler, Event, ListenerError};

/// Commit handler that records every delivered batch (shared across clones)
#[derive(Clone, Default)]
pub struct RecordingHandler {
    batches: Arc<Mutex<Vec<(bool, Vec<Event>)>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records batches, then fails every delivery
    pub fn failing() -> Self {
        let handler = Self::default();
        handler.fail.store(true, Ordering::SeqCst);
        handler
    }

    pub fn batches(&self) -> Vec<(bool, Vec<Event>)> {
        self.batches.lock().unwrap().clone()
    }
}

impl CommitHandler for RecordingHandler {
    fn name(&self) -> &'static str {
        "RecordingHandler"
    }

    fn on_commit(&self, committed: bool, events: Vec<Event>) -> Result<(), ListenerError> {
        self.batches.lock().unwrap().push((committed, events));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ListenerError::failed(self.name(), "configured to fail"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_recorded_batches() {
        let handler = RecordingHandler::new();
        let clone = handler.clone();
        clone.on_commit(true, Vec::new()).unwrap();
        assert_eq!(handler.batches().len(), 1);
    }
}
