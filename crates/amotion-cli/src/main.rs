mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use amotion_core::{DeviceInfo, SessionRegistry};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // No unit session needed
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "amotion", &mut std::io::stdout());
            Ok(())
        }

        // HTTP only
        Command::Onboard(args) => commands::onboard::handle(&args, &cli.global).await,

        cmd => {
            let mut session_config = config::build_session_config(&cli.global)?;
            // Only long-running commands keep the link healthy in the background.
            if !matches!(cmd, Command::Watch(_)) {
                session_config.health_interval = None;
            }
            // Report what the unit says, not what the profile remembers.
            if matches!(cmd, Command::Discover) {
                session_config.device = DeviceInfo::default();
            }

            let registry = SessionRegistry::new();
            let session = registry.open(session_config).await?;

            tracing::debug!(command = ?cmd, session = %session.name(), "dispatching command");
            let result = commands::dispatch(cmd, &session, &cli.global).await;
            registry.shutdown_all().await;
            result
        }
    }
}
