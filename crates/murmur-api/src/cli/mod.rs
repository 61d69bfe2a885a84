//! CLI command definitions for the `murmur` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod history;
pub mod user;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use murmur_observe::tracing_setup::LogFormat;

/// Realtime chat server.
#[derive(Parser)]
#[command(name = "murmur", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Log line format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    /// Filter used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => match self.command {
                Commands::Serve { .. } => "info",
                _ => "warn",
            },
            1 => "info,murmur=debug,tower_http=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP + WebSocket server.
    Serve {
        /// Port to listen on (overrides config.toml).
        #[arg(short, long, env = "MURMUR_PORT")]
        port: Option<u16>,

        /// Host to bind to (overrides config.toml).
        #[arg(long, env = "MURMUR_HOST")]
        host: Option<String>,
    },

    /// Manage user accounts.
    User {
        #[command(subcommand)]
        action: user::UserCommand,
    },

    /// Print the most recent chat messages.
    History {
        /// Number of messages to show.
        #[arg(short = 'n', long, default_value = "20")]
        limit: u32,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["murmur", "serve", "--port", "9000", "--host", "0.0.0.0"])
            .unwrap();
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, Some(9000));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_user_add_admin() {
        let cli = Cli::try_parse_from([
            "murmur",
            "user",
            "add",
            "root",
            "--admin",
            "--password",
            "hunter22",
        ])
        .unwrap();
        match cli.command {
            Commands::User {
                action: user::UserCommand::Add { username, admin, password },
            } => {
                assert_eq!(username, "root");
                assert!(admin);
                assert_eq!(password.as_deref(), Some("hunter22"));
            }
            _ => panic!("expected user add"),
        }
    }

    #[test]
    fn test_log_filter_by_verbosity() {
        let quiet = Cli::try_parse_from(["murmur", "--quiet", "history"]).unwrap();
        assert_eq!(quiet.log_filter(), "error");

        let debug = Cli::try_parse_from(["murmur", "-vv", "history"]).unwrap();
        assert_eq!(debug.log_filter(), "trace");
    }
}
