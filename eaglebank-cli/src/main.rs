//! Eaglebank CLI - accounts and money movement from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use eaglebank_core::config::{Config, LogFormat};
use eaglebank_core::OperationResult;

mod commands;
mod output;

use commands::{account, login, transaction, user};

/// Eaglebank - accounts and money movement from the terminal
#[derive(Parser)]
#[command(name = "eb", version, about, long_about = None)]
struct Cli {
    /// Bearer token from `eb login`
    #[arg(long, global = true, env = "EB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register and inspect users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Exchange email and password for a bearer token
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Prompted for if omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Open and inspect bank accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Deposit, withdraw and list transactions
    Tx {
        #[command(subcommand)]
        command: transaction::TxCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let json = cli.json;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                let envelope: OperationResult<()> = match e.downcast_ref::<eaglebank_core::Error>() {
                    Some(core) => OperationResult::from_error(core),
                    None => OperationResult::fail(format!("{:#}", e)),
                };
                match serde_json::to_string_pretty(&envelope) {
                    Ok(body) => println!("{}", body),
                    Err(_) => output::error(&format!("{:#}", e)),
                }
            } else {
                output::error(&format!("Error: {:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let token = cli.token.as_deref();
    match cli.command {
        Commands::User { command } => user::run(command, token, cli.json),
        Commands::Login { email, password } => login::run(email, password, cli.json),
        Commands::Account { command } => account::run(command, token, cli.json),
        Commands::Tx { command } => transaction::run(command, token, cli.json),
    }
}

/// Logs go to stderr so stdout stays clean for tokens and JSON
fn init_tracing() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // A broken settings file is reported by the command itself
    let config = commands::get_data_dir()
        .ok()
        .and_then(|dir| Config::load(&dir).ok());
    let level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());
    let format = config.map(|c| c.log_format).unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}
