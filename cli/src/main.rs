//! Tally command-line client

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tally_core::{ApiError, Config, CoreError, NavigationSignal, SortField, SortOrder, Tally};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not logged in; run `tally login` first")]
    NotLoggedIn,
    #[error("already logged in; run `tally logout` first")]
    AlreadyLoggedIn,
    #[error("refusing to delete the account without --yes")]
    Unconfirmed,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Tally transaction tracker client")]
struct Cli {
    /// Backend base URL, overrides TALLY_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding the token database, overrides TALLY_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Per-request timeout, overrides TALLY_REQUEST_TIMEOUT_SECS
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn config(&self) -> Result<Config, CliError> {
        let mut config = Config::from_env()?;

        if let Some(dir) = &self.data_dir {
            config = Config::new(dir.clone())
                .with_api_url(config.api_url)
                .with_timeout(config.request_timeout);
        }
        if let Some(api_url) = &self.api_url {
            config = config.with_api_url(api_url.trim());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the token pair
    Login(CredentialsArgs),
    /// Create a new account
    Register(CredentialsArgs),
    /// Revoke the refresh token and clear the stored session
    Logout,
    /// Show whether a session is stored and where the client points
    Status,
    /// Delete the logged-in account
    DeleteAccount {
        #[arg(long)]
        yes: bool,
    },
    Transactions(TransactionsCommand),
    Contractors,
    Statuses,
    Accounts,
}

impl Command {
    /// Client route the command belongs to, if it is guarded
    fn route(&self) -> Option<&'static str> {
        match self {
            Command::Login(_) => Some("/login"),
            Command::Register(_) => Some("/register"),
            Command::Logout | Command::Status => None,
            Command::DeleteAccount { .. }
            | Command::Transactions(_)
            | Command::Contractors
            | Command::Statuses
            | Command::Accounts => Some("/"),
        }
    }
}

#[derive(Args, Debug)]
struct CredentialsArgs {
    #[arg(long)]
    username: String,

    #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct TransactionsCommand {
    #[command(subcommand)]
    command: TransactionsSubcommand,
}

#[derive(Subcommand, Debug)]
enum TransactionsSubcommand {
    List {
        #[arg(long, default_value = "date")]
        sort_by: SortField,
        #[arg(long, default_value = "desc")]
        sort_order: SortOrder,
        /// Contractor name filter
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: i64,
    },
    Create {
        #[arg(long)]
        contractor_id: i64,
        #[arg(long = "type", default_value = "outgoing")]
        kind: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        account_id: i64,
    },
    SetStatus {
        id: i64,
        status_id: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tally_core::init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let app = Tally::new(cli.config()?)?;
    let mut signals = app.navigator().subscribe();

    let result = commands::dispatch(&app, cli.command).await;

    while let Ok(NavigationSignal::Redirect { from, to }) = signals.try_recv() {
        tracing::warn!(%from, %to, "Session ended");
        eprintln!("session ended ({from} -> {to}); run `tally login` to continue");
    }

    result
}
