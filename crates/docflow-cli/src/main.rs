//! CLI application for batch invoice extraction.

mod commands;
mod report;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, run};

/// Batch-submit invoices to Bedrock Data Automation and collect the extracted fields
#[derive(Parser)]
#[command(name = "docflow")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log raw service payloads (needs -vv to be visible)
    #[arg(long, global = true)]
    debug_payloads: bool,

    /// Batch folder name under the input root (e.g. "march" for input/march)
    batch: Option<String>,

    /// Batch folder name given as an option; needed for a batch named "config"
    #[arg(long = "batch", value_name = "BATCH", conflicts_with = "batch")]
    batch_option: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match (cli.command, cli.batch.or(cli.batch_option)) {
        (Some(Commands::Config(args)), _) => config::run(args).await,
        (None, Some(batch)) => run::run(&batch, cli.config.as_deref(), cli.debug_payloads).await,
        (None, None) => {
            eprintln!("Please provide a batch folder name as command line argument");
            eprintln!();
            eprintln!("{}", Cli::command().render_usage());
            std::process::exit(1);
        }
    }
}
