#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::json;

use monk_listener::listener::{CommitHandler, Event, ListenerError};
use monk_listener::types::{Table, TableRef};

/// Records every delivered batch, shared across clones
#[derive(Clone, Default)]
pub struct Recorder {
    batches: Arc<Mutex<Vec<(bool, Vec<Event>)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<(bool, Vec<Event>)> {
        self.batches.lock().unwrap().clone()
    }

    pub fn single_batch(&self) -> (bool, Vec<Event>) {
        let batches = self.batches();
        assert_eq!(batches.len(), 1, "expected exactly one batch, got {}", batches.len());
        batches.into_iter().next().unwrap()
    }
}

impl CommitHandler for Recorder {
    fn name(&self) -> &'static str {
        "Recorder"
    }

    fn on_commit(&self, committed: bool, events: Vec<Event>) -> Result<(), ListenerError> {
        self.batches.lock().unwrap().push((committed, events));
        Ok(())
    }
}

pub fn films() -> TableRef {
    Table::new("films").shared()
}

pub fn insert(id: i64) -> Event {
    Event::insert(films(), id, json!({ "id": id }))
}

pub fn ids(events: &[Event]) -> Vec<String> {
    events.iter().map(|e| e.id().to_string()).collect()
}
