use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

use zerotier_service::config::ServiceConfig;
use zerotier_service::lifecycle::{self, Controller, RunOutcome, ServiceContext, EXIT_STATUS};
use zerotier_service::node::LocalNode;
use zerotier_service::signals::SignalSet;

/// Runs the node in the foreground until SIGINT, SIGQUIT or SIGTERM, then shuts it
/// down and exits.
#[derive(Parser, Debug)]
#[command(name = "zerotier-service", version, about)]
pub struct Cli {
    /// Home directory holding zerotier.pid and node state (overrides config)
    #[arg(short = 'p', long, value_name = "PATH")]
    home: Option<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The service takes no arguments; anything here is a usage error
    #[arg(hide = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                return ExitCode::from(EXIT_STATUS);
            }
        },
    };

    if let Err(e) = lifecycle::validate_arguments(&cli.args) {
        eprintln!("error: {e}\n");
        let _ = Cli::command().print_help();
        return ExitCode::from(EXIT_STATUS);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zerotier_service=info".into()),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => match ServiceConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                println!("FATAL: {e}");
                return ExitCode::from(EXIT_STATUS);
            }
        },
        None => ServiceConfig::default(),
    };
    let home = config.resolve_home(cli.home.as_deref());

    tracing::info!(home = %home.display(), "zerotier-service starting");

    let controller = Controller::new(LocalNode, ServiceContext::new(home));
    match controller.run(&SignalSet::service()).await {
        RunOutcome::InitFailed(e) => {
            println!("FATAL: error initializing node: {e}");
        }
        RunOutcome::SignalsUnavailable(e) => {
            println!("FATAL: {e}");
        }
        RunOutcome::Stopped { signal } => {
            tracing::info!(signal = ?signal, "shutdown complete");
        }
    }

    ExitCode::from(EXIT_STATUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_arguments() {
        let cli = Cli::try_parse_from(["zerotier-service"]).unwrap();
        assert!(cli.args.is_empty());
        assert!(cli.home.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_collects_stray_arguments() {
        let cli = Cli::try_parse_from(["zerotier-service", "foo", "bar"]).unwrap();
        assert_eq!(cli.args, vec!["foo", "bar"]);
        assert!(lifecycle::validate_arguments(&cli.args).is_err());
    }

    #[test]
    fn test_cli_home_and_config() {
        let cli = Cli::try_parse_from([
            "zerotier-service",
            "-p",
            "/tmp/svc",
            "--config",
            "/etc/zt.toml",
        ])
        .unwrap();
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/svc")));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/zt.toml")));
    }

    #[test]
    fn test_cli_unknown_flag_is_error() {
        let err = Cli::try_parse_from(["zerotier-service", "--bogus"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
