// Ordered listener dispatch used by the data-access layer on every mutation

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::listener::error::ListenerError;
use crate::listener::event::Event;
use crate::listener::traits::Listener;
use crate::transaction::Session;
use crate::types::{RecordId, TableRef};

/// Listeners in registration order. Dispatch is synchronous and stops at the
/// first failing listener.
#[derive(Default, Clone)]
pub struct ListenerPipeline {
    listeners: Vec<Arc<dyn Listener>>,
}

impl ListenerPipeline {
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    pub fn register(&mut self, listener: Arc<dyn Listener>) {
        tracing::debug!("Registered listener '{}'", listener.name());
        self.listeners.push(listener);
    }

    /// Builder-style registration
    pub fn with(mut self, listener: Arc<dyn Listener>) -> Self {
        self.register(listener);
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver one event to every applicable listener
    pub fn fire(&self, session: &dyn Session, event: &mut Event) -> Result<(), ListenerError> {
        let kind = event.kind();

        for listener in &self.listeners {
            if !listener.applies_to(kind) {
                tracing::trace!("Listener {} skipped - doesn't apply to {:?}", listener.name(), kind);
                continue;
            }

            if !listener.applies_to_table(event.table_name()) {
                tracing::trace!(
                    "Listener {} skipped - doesn't apply to table {}",
                    listener.name(),
                    event.table_name()
                );
                continue;
            }

            let started = Instant::now();
            if let Err(error) = listener.on_event(session, event) {
                tracing::warn!(
                    "Listener {} failed on {:?} {}/{} in {:?}: {}",
                    listener.name(),
                    kind,
                    event.table_name(),
                    event.id(),
                    started.elapsed(),
                    error
                );
                return Err(error);
            }
        }

        Ok(())
    }

    /// Fire a pre-insert event and return the payload to persist
    pub fn pre_insert(
        &self,
        session: &dyn Session,
        table: &TableRef,
        id: impl Into<RecordId>,
        new: Value,
    ) -> Result<Value, ListenerError> {
        let mut event = Event::pre_insert(Arc::clone(table), id, new);
        self.fire(session, &mut event)?;
        Ok(Self::frozen(event))
    }

    /// Fire a pre-update event and return the payload to persist
    pub fn pre_update(
        &self,
        session: &dyn Session,
        table: &TableRef,
        id: impl Into<RecordId>,
        new: Value,
        old: Option<Value>,
    ) -> Result<Value, ListenerError> {
        let mut event = Event::pre_update(Arc::clone(table), id, new, old);
        self.fire(session, &mut event)?;
        Ok(Self::frozen(event))
    }

    pub fn inserted(
        &self,
        session: &dyn Session,
        table: &TableRef,
        id: impl Into<RecordId>,
        value: Value,
    ) -> Result<(), ListenerError> {
        self.fire(session, &mut Event::insert(Arc::clone(table), id, value))
    }

    pub fn updated(
        &self,
        session: &dyn Session,
        table: &TableRef,
        id: impl Into<RecordId>,
        new: Value,
        old: Option<Value>,
    ) -> Result<(), ListenerError> {
        self.fire(session, &mut Event::update(Arc::clone(table), id, new, old))
    }

    pub fn deleted(
        &self,
        session: &dyn Session,
        table: &TableRef,
        id: impl Into<RecordId>,
        value: Option<Value>,
    ) -> Result<(), ListenerError> {
        self.fire(session, &mut Event::delete(Arc::clone(table), id, value))
    }

    fn frozen(event: Event) -> Value {
        match event {
            Event::PreInsert(e) => e.into_transformed(),
            Event::PreUpdate(e) => e.into_transformed(),
            Event::Insert(e) => e.value,
            Event::Update(e) => e.new,
            Event::Delete(e) => e.value.unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::event::EventKind;
    use crate::testing::RecordingHandler;
    use crate::listener::DeferredListener;
    use crate::transaction::MemorySession;
    use crate::types::Table;
    use serde_json::json;
    use std::sync::Mutex;

    struct Uppercase;

    impl Listener for Uppercase {
        fn name(&self) -> &'static str {
            "Uppercase"
        }

        fn on_event(&self, _session: &dyn Session, event: &mut Event) -> Result<(), ListenerError> {
            if let Some(Value::Object(row)) = event.transformed_mut() {
                if let Some(Value::String(title)) = row.get_mut("title") {
                    *title = title.to_uppercase();
                }
            }
            Ok(())
        }

        fn applies_to(&self, kind: EventKind) -> bool {
            kind.is_transform()
        }
    }

    struct Reject;

    impl Listener for Reject {
        fn name(&self) -> &'static str {
            "Reject"
        }

        fn on_event(&self, _session: &dyn Session, _event: &mut Event) -> Result<(), ListenerError> {
            Err(ListenerError::ValidationError("rejected".into()))
        }

        fn applies_to_table(&self, table: &str) -> bool {
            table == "locked"
        }
    }

    #[derive(Default)]
    struct Seen(Mutex<Vec<EventKind>>);

    impl Listener for Seen {
        fn name(&self) -> &'static str {
            "Seen"
        }

        fn on_event(&self, _session: &dyn Session, event: &mut Event) -> Result<(), ListenerError> {
            self.0.lock().unwrap().push(event.kind());
            Ok(())
        }
    }

    #[test]
    fn pre_insert_returns_transformed_payload() {
        let pipeline = ListenerPipeline::new().with(Arc::new(Uppercase));
        let session = MemorySession::new();
        let films = Table::new("films").shared();

        let persisted = pipeline
            .pre_insert(&session, &films, 1, json!({ "title": "alien" }))
            .unwrap();
        assert_eq!(persisted, json!({ "title": "ALIEN" }));
    }

    #[test]
    fn later_listeners_see_earlier_transforms() {
        let seen = Arc::new(Seen::default());
        let handler = RecordingHandler::new();
        let pipeline = ListenerPipeline::new()
            .with(Arc::new(Uppercase))
            .with(seen.clone())
            .with(Arc::new(DeferredListener::post_commit(handler.clone())));
        let session = MemorySession::new();
        let films = Table::new("films").shared();

        pipeline
            .pre_update(&session, &films, 1, json!({ "title": "heat" }), None)
            .unwrap();

        let batches = handler.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].1[0].transformed(), Some(&json!({ "title": "HEAT" })));
        assert_eq!(*seen.0.lock().unwrap(), vec![EventKind::PreUpdate]);
    }

    #[test]
    fn failing_listener_stops_dispatch() {
        let seen = Arc::new(Seen::default());
        let pipeline = ListenerPipeline::new()
            .with(Arc::new(Reject))
            .with(seen.clone());
        let session = MemorySession::new();

        let open = Table::new("open").shared();
        pipeline.deleted(&session, &open, 1, None).unwrap();

        let locked = Table::new("locked").shared();
        let err = pipeline.inserted(&session, &locked, 1, json!({})).unwrap_err();
        assert_eq!(err, ListenerError::ValidationError("rejected".into()));
        assert_eq!(*seen.0.lock().unwrap(), vec![EventKind::Delete]);
    }

    #[test]
    fn skips_listeners_for_other_kinds() {
        let pipeline = ListenerPipeline::new().with(Arc::new(Uppercase));
        let session = MemorySession::new();
        let films = Table::new("films").shared();
        assert_eq!(pipeline.len(), 1);

        pipeline
            .updated(&session, &films, 1, json!({ "title": "x" }), Some(json!({ "title": "y" })))
            .unwrap();
    }
}
