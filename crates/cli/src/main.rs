//! Apparel CLI - storefront and admin console from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse a category (no account needed)
//! apparel browse --category women --pages 2
//!
//! # One-shot command as a signed-in user (password from APPAREL_PASSWORD
//! # or prompted)
//! apparel --email rajat@example.in wishlist toggle 64f0c2
//!
//! # Interactive session: sign in once, then run commands
//! apparel shell
//! > login -e rajat@example.in
//! > cart list
//! > checkout
//! ```
//!
//! # Environment Variables
//!
//! See `apparel_storefront::config` for backend settings. Additionally:
//! - `APPAREL_EMAIL` / `APPAREL_PASSWORD` - credentials for one-shot commands
//! - `RUST_LOG` - log filter (default: `apparel_storefront=info,apparel_admin=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

mod commands;
mod console;
mod error;

use std::io::Write;
use std::process::ExitCode;

use apparel_admin::AdminConsole;
use apparel_storefront::Storefront;
use apparel_storefront::config::StorefrontConfig;
use clap::{Parser, Subcommand};
use commands::{App, Command};
use console::Console;
use error::CliError;
use secrecy::SecretString;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "apparel_storefront=info,apparel_admin=info,apparel_cli=info";

#[derive(Parser)]
#[command(name = "apparel")]
#[command(author, version, about = "Apparel storefront CLI")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Sign in as this user before running the command
    #[arg(long, env = "APPAREL_EMAIL")]
    email: Option<String>,

    /// Password for --email; prompted when absent
    #[arg(long, env = "APPAREL_PASSWORD", hide_env_values = true, requires = "email")]
    password: Option<String>,

    #[command(subcommand)]
    command: TopLevel,
}

#[derive(Subcommand)]
enum TopLevel {
    /// Interactive session that keeps one sign-in across commands
    Shell,
    #[command(flatten)]
    Run(Command),
}

/// A single line typed into the shell.
#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(json: bool) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    // Logs go to stderr so command output stays clean on stdout.
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(cli.json_logs);
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(cli.json_logs);

    match start(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            let _ = writeln!(std::io::stderr(), "error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn start(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let storefront = Storefront::from_config(config)?;
    let _session_watch = storefront.watch_session();
    if let Some(user) = storefront.start().await {
        tracing::debug!(username = %user.username, "restored signed-in user");
    }

    let mut app = App {
        admin: AdminConsole::for_storefront(&storefront),
        storefront,
        console: Console::new(),
    };

    if let Some(email) = &cli.email {
        let password = match cli.password {
            Some(password) => SecretString::from(password),
            None => app.console.read_secret("Password: ").await?,
        };
        commands::account::login_with(&mut app, email, &password).await?;
    }

    match cli.command {
        TopLevel::Run(command) => commands::run(&mut app, command).await,
        TopLevel::Shell => shell(&mut app).await,
    }
}

/// Read commands until `exit` or end of input. Errors are printed and the
/// session continues.
async fn shell(app: &mut App) -> Result<(), CliError> {
    writeln!(app.console.out(), "Type 'help' for commands, 'exit' to quit.")?;
    while let Some(line) = app.console.read_line("> ").await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.first().copied() {
            None => continue,
            Some("exit" | "quit") => break,
            Some(_) => {}
        }

        match ShellLine::try_parse_from(words) {
            Ok(parsed) => {
                if let Err(e) = commands::run(app, parsed.command).await {
                    e.report();
                    writeln!(app.console.out(), "error: {}", e.user_message())?;
                }
            }
            Err(e) => writeln!(app.console.out(), "{e}")?,
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
        ShellLine::command().debug_assert();
    }

    #[test]
    fn test_shell_line_parses_without_binary_name() {
        let parsed = ShellLine::try_parse_from(["cart", "toggle", "p1"]).unwrap();
        assert!(matches!(
            parsed.command,
            Command::Cart {
                action: commands::ListAction::Toggle { .. }
            }
        ));
    }

    #[test]
    fn test_admin_status_is_parsed() {
        let parsed =
            ShellLine::try_parse_from(["admin", "set-status", "o1", "shipped", "--yes"]).unwrap();
        assert!(matches!(
            parsed.command,
            Command::Admin {
                action: commands::admin::AdminCommand::SetStatus {
                    status: apparel_core::OrderStatus::Shipped,
                    yes: true,
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_watch_interval_must_be_positive() {
        assert!(ShellLine::try_parse_from(["orders", "watch", "--interval", "0"]).is_err());
        let parsed = ShellLine::try_parse_from(["orders", "watch", "--interval", "5"]).unwrap();
        assert!(matches!(
            parsed.command,
            Command::Orders {
                action: commands::OrderAction::Watch { interval: Some(5) }
            }
        ));
    }

    #[test]
    fn test_top_level_flattens_commands() {
        let cli = Cli::try_parse_from(["apparel", "browse", "--category", "women"]).unwrap();
        assert!(matches!(
            cli.command,
            TopLevel::Run(Command::Browse { ref category, pages: 1 }) if category == "women"
        ));
    }
}
