use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::listener::error::ListenerError;
use crate::listener::event::{Event, EventKind};
use crate::listener::traits::Listener;
use crate::transaction::Session;

/// Stamps `created_at` on insert and `updated_at` on insert and update into the
/// payload that will be persisted. Caller-supplied `created_at` values are kept.
pub struct TimestampTransform {
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl TimestampTransform {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self { clock: Box::new(clock) }
    }
}

impl Default for TimestampTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener for TimestampTransform {
    fn name(&self) -> &'static str {
        "TimestampTransform"
    }

    fn applies_to(&self, kind: EventKind) -> bool {
        kind.is_transform()
    }

    fn on_event(&self, _session: &dyn Session, event: &mut Event) -> Result<(), ListenerError> {
        let kind = event.kind();
        let now = Value::String((self.clock)().to_rfc3339_opts(SecondsFormat::Millis, true));

        let Some(transformed) = event.transformed_mut() else {
            return Ok(());
        };
        let row = match transformed {
            Value::Object(row) => row,
            other => {
                return Err(ListenerError::ValidationError(format!(
                    "{} expects an object payload, got {}",
                    self.name(),
                    other
                )))
            }
        };

        if kind == EventKind::PreInsert {
            row.entry("created_at").or_insert_with(|| now.clone());
        }
        row.insert("updated_at".to_string(), now);
        Ok(())
    }
}
