use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::listener::Event;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            if let Some(data_value) = data {
                println!("{}", serde_json::to_string_pretty(&data_value)?);
            }
        }
    }
    Ok(())
}

/// Output one delivered batch in the appropriate format
pub fn output_batch(
    output_format: OutputFormat,
    listener: &str,
    committed: bool,
    events: &[Event],
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let response = json!({
                "listener": listener,
                "committed": committed,
                "events": events.iter().map(|e| e.to_json(true)).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string(&response)?);
        }
        OutputFormat::Text => {
            println!(
                "{} received {} events (committed={})",
                listener,
                events.len(),
                committed
            );
            for event in events {
                println!("  {:?} {}/{}", event.kind(), event.table_name(), event.id());
            }
        }
    }
    Ok(())
}
