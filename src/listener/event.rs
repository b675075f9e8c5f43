use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{RecordId, TableRef};

/// Which of the five mutation events a value is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PreInsert,
    PreUpdate,
    Insert,
    Update,
    Delete,
}

impl EventKind {
    /// Pre-persistence events carry a rewritable payload
    pub fn is_transform(&self) -> bool {
        matches!(self, EventKind::PreInsert | EventKind::PreUpdate)
    }
}

/// Fired before an insert executes. `transformed` is what gets persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PreInsertEvent {
    pub table: TableRef,
    pub id: RecordId,
    pub new: Value,
    transformed: Value,
}

impl PreInsertEvent {
    pub fn new(table: TableRef, id: impl Into<RecordId>, new: Value) -> Self {
        Self {
            table,
            id: id.into(),
            transformed: new.clone(),
            new,
        }
    }

    pub fn transformed(&self) -> &Value {
        &self.transformed
    }

    pub fn set_transformed(&mut self, value: Value) {
        self.transformed = value;
    }

    /// Consume the event, freezing the payload to persist
    pub fn into_transformed(self) -> Value {
        self.transformed
    }
}

/// Fired before an update executes. `old` is `None` when the previous row is unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct PreUpdateEvent {
    pub table: TableRef,
    pub id: RecordId,
    pub new: Value,
    pub old: Option<Value>,
    transformed: Value,
}

impl PreUpdateEvent {
    pub fn new(table: TableRef, id: impl Into<RecordId>, new: Value, old: Option<Value>) -> Self {
        Self {
            table,
            id: id.into(),
            transformed: new.clone(),
            new,
            old,
        }
    }

    pub fn transformed(&self) -> &Value {
        &self.transformed
    }

    pub fn set_transformed(&mut self, value: Value) {
        self.transformed = value;
    }

    pub fn into_transformed(self) -> Value {
        self.transformed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertEvent {
    pub table: TableRef,
    pub id: RecordId,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteEvent {
    pub table: TableRef,
    pub id: RecordId,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEvent {
    pub table: TableRef,
    pub id: RecordId,
    pub new: Value,
    pub old: Option<Value>,
}

/// Something happened to one row of one table
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PreInsert(PreInsertEvent),
    PreUpdate(PreUpdateEvent),
    Insert(InsertEvent),
    Update(UpdateEvent),
    Delete(DeleteEvent),
}

impl Event {
    pub fn pre_insert(table: TableRef, id: impl Into<RecordId>, new: Value) -> Self {
        Event::PreInsert(PreInsertEvent::new(table, id, new))
    }

    pub fn pre_update(table: TableRef, id: impl Into<RecordId>, new: Value, old: Option<Value>) -> Self {
        Event::PreUpdate(PreUpdateEvent::new(table, id, new, old))
    }

    pub fn insert(table: TableRef, id: impl Into<RecordId>, value: Value) -> Self {
        Event::Insert(InsertEvent { table, id: id.into(), value })
    }

    pub fn update(table: TableRef, id: impl Into<RecordId>, new: Value, old: Option<Value>) -> Self {
        Event::Update(UpdateEvent { table, id: id.into(), new, old })
    }

    pub fn delete(table: TableRef, id: impl Into<RecordId>, value: Option<Value>) -> Self {
        Event::Delete(DeleteEvent { table, id: id.into(), value })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::PreInsert(_) => EventKind::PreInsert,
            Event::PreUpdate(_) => EventKind::PreUpdate,
            Event::Insert(_) => EventKind::Insert,
            Event::Update(_) => EventKind::Update,
            Event::Delete(_) => EventKind::Delete,
        }
    }

    pub fn table(&self) -> &TableRef {
        match self {
            Event::PreInsert(e) => &e.table,
            Event::PreUpdate(e) => &e.table,
            Event::Insert(e) => &e.table,
            Event::Update(e) => &e.table,
            Event::Delete(e) => &e.table,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table().name
    }

    pub fn id(&self) -> &RecordId {
        match self {
            Event::PreInsert(e) => &e.id,
            Event::PreUpdate(e) => &e.id,
            Event::Insert(e) => &e.id,
            Event::Update(e) => &e.id,
            Event::Delete(e) => &e.id,
        }
    }

    pub fn is_transform(&self) -> bool {
        self.kind().is_transform()
    }

    /// The value that will be persisted, for pre-persistence events only
    pub fn transformed(&self) -> Option<&Value> {
        match self {
            Event::PreInsert(e) => Some(e.transformed()),
            Event::PreUpdate(e) => Some(e.transformed()),
            _ => None,
        }
    }

    /// Mutable access to the payload to persist. `None` for informational events.
    pub fn transformed_mut(&mut self) -> Option<&mut Value> {
        match self {
            Event::PreInsert(e) => Some(&mut e.transformed),
            Event::PreUpdate(e) => Some(&mut e.transformed),
            _ => None,
        }
    }

    /// JSON rendering for logs. Payloads are omitted unless requested.
    pub fn to_json(&self, include_payload: bool) -> Value {
        let mut out = json!({
            "kind": self.kind(),
            "table": self.table_name(),
            "id": self.id(),
        });

        if include_payload {
            let payload = match self {
                Event::PreInsert(e) => json!({ "new": e.new, "transformed": e.transformed }),
                Event::PreUpdate(e) => json!({ "new": e.new, "old": e.old, "transformed": e.transformed }),
                Event::Insert(e) => json!({ "value": e.value }),
                Event::Update(e) => json!({ "new": e.new, "old": e.old }),
                Event::Delete(e) => json!({ "value": e.value }),
            };
            out["payload"] = payload;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Table;

    #[test]
    fn transformed_starts_as_new_and_is_independent() {
        let table = Table::new("films").shared();
        let mut event = Event::pre_insert(table, 1, json!({ "title": "Alien" }));

        *event.transformed_mut().unwrap() = json!({ "title": "ALIEN" });

        match &event {
            Event::PreInsert(e) => {
                assert_eq!(e.new, json!({ "title": "Alien" }));
                assert_eq!(e.transformed(), &json!({ "title": "ALIEN" }));
            }
            _ => panic!("expected pre-insert"),
        }
    }

    #[test]
    fn informational_events_are_not_transformable() {
        let table = Table::new("films").shared();
        let mut insert = Event::insert(table.clone(), 1, json!({}));
        let mut delete = Event::delete(table, 1, None);
        assert!(insert.transformed_mut().is_none());
        assert!(delete.transformed().is_none());
        assert!(!insert.is_transform());
    }

    #[test]
    fn pre_update_freezes_transformed_payload() {
        let table = Table::new("films").shared();
        let mut event = PreUpdateEvent::new(table, "f-1", json!({ "n": 1 }), Some(json!({ "n": 0 })));
        event.set_transformed(json!({ "n": 2 }));
        assert_eq!(event.old, Some(json!({ "n": 0 })));
        assert_eq!(event.into_transformed(), json!({ "n": 2 }));
    }

    #[test]
    fn accessors_share_table_reference() {
        let table = Table::new("actors").shared();
        let event = Event::update(table.clone(), 9, json!({}), None);
        assert!(std::sync::Arc::ptr_eq(event.table(), &table));
        assert_eq!(event.id(), &RecordId::Int(9));
        assert_eq!(event.kind(), EventKind::Update);
    }

    #[test]
    fn json_rendering_omits_payload_by_default() {
        let table = Table::new("actors").shared();
        let event = Event::delete(table, 3, Some(json!({ "name": "x" })));
        let plain = event.to_json(false);
        assert_eq!(plain["kind"], "delete");
        assert_eq!(plain["id"], 3);
        assert!(plain.get("payload").is_none());
        assert_eq!(event.to_json(true)["payload"]["value"]["name"], "x");
    }
}
