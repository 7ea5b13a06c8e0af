//! # mfv CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use std::process::ExitCode;

use clap::Parser;
use mfv_cli::check::{self, CheckArgs};
use mfv_cli::list::{self, ListArgs};

/// Validate JSON and YAML documents against a directory of named schemas.
#[derive(Parser, Debug)]
#[command(name = "mfv", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate documents against a registered schema.
    Check(CheckArgs),
    /// List registered schema names.
    List(ListArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => {
            let validator = args.schema.load().await?;
            let reports = check::run_check(&validator, &args).await?;
            for report in &reports {
                println!("{}", report.to_json());
            }
            if reports.iter().all(|r| r.is_valid()) {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::List(args) => {
            let validator = args.schema.load().await?;
            let names = list::run_list(&validator);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for name in names {
                    println!("{name}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
