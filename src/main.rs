use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use rubrate::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP rate service
    Serve {
        /// Keep quotes in memory instead of the on-disk store
        #[arg(long)]
        ephemeral: bool,
    },
    /// Show the most recent stored quotes
    History {
        /// Number of quotes to show
        #[arg(short, long, default_value_t = rubrate::service::HISTORY_LEN)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config_path = cli.config_path.as_deref();
    let result = match cli.command {
        Some(Commands::Setup) => rubrate::cli::setup::setup(),
        Some(Commands::Serve { ephemeral }) => {
            rubrate::run_command(rubrate::AppCommand::Serve { ephemeral }, config_path).await
        }
        Some(Commands::History { limit }) => {
            rubrate::run_command(rubrate::AppCommand::History { limit }, config_path).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
