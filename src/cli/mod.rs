pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "monk-listener")]
#[command(about = "Monk listener - transactional event buffering for data-access listeners")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run a scripted transaction through the listener pipeline")]
    Demo {
        #[arg(long, help = "Deliver batches from a pre-commit hook")]
        pre_commit: bool,

        #[arg(long, help = "Roll the transaction back instead of committing")]
        rollback: bool,

        #[arg(long, default_value_t = 3, help = "Rows to insert")]
        rows: i64,
    },

    #[command(about = "Show the effective configuration")]
    Config,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Demo { pre_commit, rollback, rows } => {
            let options = commands::demo::DemoOptions { pre_commit, rollback, rows };
            commands::demo::handle(options, output_format)
        }
        Commands::Config => commands::config::handle(output_format),
    }
}
