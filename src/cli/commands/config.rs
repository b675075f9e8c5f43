use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = crate::config::config();
    let data = serde_json::to_value(config)?;
    output_success(
        output_format,
        &format!("Effective configuration ({:?})", config.environment),
        Some(data),
    )
}
