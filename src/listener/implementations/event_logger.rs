use crate::config::ListenerConfig;
use crate::listener::error::ListenerError;
use crate::listener::event::Event;
use crate::listener::traits::Listener;
use crate::transaction::Session;

/// Logs every event as it happens, tagged with the owning transaction
#[derive(Debug, Clone, Default)]
pub struct EventLogger {
    include_payloads: bool,
}

impl EventLogger {
    pub fn new(include_payloads: bool) -> Self {
        Self { include_payloads }
    }

    pub fn from_config(config: &ListenerConfig) -> Self {
        Self::new(config.log_payloads)
    }
}

impl Listener for EventLogger {
    fn name(&self) -> &'static str {
        "EventLogger"
    }

    fn on_event(&self, session: &dyn Session, event: &mut Event) -> Result<(), ListenerError> {
        let transaction = session
            .current_transaction()
            .map(|tx| tx.id().to_string())
            .unwrap_or_else(|| "auto-commit".to_string());

        tracing::info!(
            transaction = %transaction,
            event = %event.to_json(self.include_payloads),
            "{:?} {}/{}",
            event.kind(),
            event.table_name(),
            event.id()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::MemorySession;
    use crate::types::Table;
    use serde_json::json;

    #[test]
    fn logging_leaves_event_untouched() {
        let logger = EventLogger::new(true);
        let session = MemorySession::new();
        let mut event = Event::pre_insert(Table::new("films").shared(), 1, json!({ "a": 1 }));
        let before = event.clone();

        logger.on_event(&session, &mut event).unwrap();
        session.begin().unwrap();
        logger.on_event(&session, &mut event).unwrap();

        assert_eq!(event, before);
    }
}
