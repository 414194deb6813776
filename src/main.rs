use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use dotenv::dotenv;
use flyrun::config::{ConfigBuilder, ConnectionArgs};
use flyrun::constants::CONFIG_FILENAME;
use flyrun::dispatch::{self, FailureKind, Invocation, Outcome, Prepared};
use flyrun::ops::Operation;
use itertools::Itertools;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file in key=value properties format
    #[arg(long, default_value = CONFIG_FILENAME, global = true)]
    config_file: String,

    /// Enable verbose output (info level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress all non-essential output (error level only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the schema to the latest version
    Migrate {
        #[command(flatten)]
        connection_args: ConnectionArgs,

        /// The target version up to which migrations are considered
        #[arg(long)]
        target: Option<String>,
    },

    /// Repair the schema history table
    Repair {
        #[command(flatten)]
        connection_args: ConnectionArgs,
    },

    /// Drop all objects in the configured schemas
    Clean {
        #[command(flatten)]
        connection_args: ConnectionArgs,
    },

    /// Execute a marshaled work request (spawned by the dispatcher)
    #[command(hide = true)]
    Worker,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    initialize_logging(&cli);
    run_main(cli).await
}

fn initialize_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn" // default level
    };

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    // Logs go to stderr: stdout carries user output and, in worker mode, the
    // response payload.
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_main(cli: Cli) -> Result<()> {
    let (operation, connection_args, target) = match cli.command {
        Commands::Worker => return dispatch::worker::run_worker().await,
        Commands::Migrate {
            connection_args,
            target,
        } => (Operation::Migrate { target: None }, connection_args, target),
        Commands::Repair { connection_args } => (Operation::Repair, connection_args, None),
        Commands::Clean { connection_args } => (Operation::Clean, connection_args, None),
    };

    let config_file = Path::new(&cli.config_file);
    let configuration = ConfigBuilder::new()
        .with_file(config_file)?
        .with_environment()
        .with_cli(&connection_args, target.as_deref())
        .resolve();

    let parent = config_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let root_dir = std::path::absolute(parent)?;

    match dispatch::prepare(operation, configuration, &root_dir)? {
        Prepared::Skip { locations } => {
            let shown = if locations.is_empty() {
                "the configured locations".to_string()
            } else {
                locations
                    .directories()
                    .map(|dir| dir.display().to_string())
                    .join(", ")
            };
            println!("No migration scripts in {} - nothing to do", shown);
            Ok(())
        }
        Prepared::Run(invocation) => {
            info!(
                operation = invocation.request.operation.verb(),
                url = %invocation.request.connection.display_url(),
                "dispatching operation"
            );
            let outcome = dispatch::dispatch(&invocation).await;
            report_outcome(&invocation, outcome)
        }
    }
}

fn report_outcome(invocation: &Invocation, outcome: Outcome) -> Result<()> {
    let url = invocation.request.connection.display_url();
    match outcome {
        Outcome::Succeeded(report) => {
            match &invocation.request.operation {
                Operation::Migrate { .. } => {
                    let applied = report.migrations_applied.unwrap_or(0);
                    let noun = if applied == 1 {
                        "migration"
                    } else {
                        "migrations"
                    };
                    println!(
                        "{} Applied {} {} to {}",
                        style("✓").green(),
                        applied,
                        noun,
                        url
                    );
                }
                Operation::Repair => {
                    println!("{} Schema history repaired on {}", style("✓").green(), url);
                }
                Operation::Clean => {
                    println!("{} Cleaned configured schemas on {}", style("✓").green(), url);
                }
            }
            Ok(())
        }
        Outcome::NoApplicableWork => {
            println!("Nothing to do");
            Ok(())
        }
        Outcome::Failed(failure) => {
            println!(
                "{} {} failed: {}",
                style("✗").red(),
                invocation.request.operation.verb(),
                style(&failure.message).red()
            );
            if failure.kind == FailureKind::Validation {
                println!(
                    "{}",
                    style("Run `flyrun repair` to realign the schema history, then retry.").dim()
                );
            }
            std::process::exit(1);
        }
    }
}
