//! Subcommand handlers

use serde::Serialize;
use serde_json::json;
use tally_core::{Credentials, GuardDecision, NewTransaction, Route, Tally, TransactionQuery};

use crate::{CliError, Command, TransactionsSubcommand};

pub(crate) async fn dispatch(app: &Tally, command: Command) -> Result<(), CliError> {
    if let Some(route) = command.route() {
        enter(app, route)?;
    }

    match command {
        Command::Login(args) => {
            app.auth()
                .login(&Credentials::new(args.username, args.password))
                .await?;
            app.navigate(Route::Root.path());
            println!("logged in");
        }
        Command::Register(args) => {
            let message = app
                .auth()
                .register(&Credentials::new(args.username, args.password))
                .await?;
            println!("{message}");
        }
        Command::Logout => {
            app.auth().logout().await?;
            app.navigate(Route::Login.path());
            println!("logged out");
        }
        Command::Status => {
            print_json(&json!({
                "logged_in": app.session().has_session(),
                "route": app.navigator().current().path(),
                "api_url": app.config().api_url,
                "database": app.config().database_path,
            }))?;
        }
        Command::DeleteAccount { yes } => {
            if !yes {
                return Err(CliError::Unconfirmed);
            }
            let message = app.auth().delete_account().await?;
            app.navigate(Route::Login.path());
            println!("{message}");
        }
        Command::Transactions(transactions) => run_transactions(app, transactions.command).await?,
        Command::Contractors => print_json(&app.transactions().contractors().await?)?,
        Command::Statuses => print_json(&app.transactions().statuses().await?)?,
        Command::Accounts => print_json(&app.transactions().accounts().await?)?,
    }

    Ok(())
}

async fn run_transactions(app: &Tally, command: TransactionsSubcommand) -> Result<(), CliError> {
    let api = app.transactions();

    match command {
        TransactionsSubcommand::List {
            sort_by,
            sort_order,
            search,
        } => {
            let query = TransactionQuery {
                sort_by,
                sort_order,
                search,
            };
            print_json(&api.list(&query).await?)
        }
        TransactionsSubcommand::Show { id } => print_json(&api.get(id).await?),
        TransactionsSubcommand::Create {
            contractor_id,
            kind,
            amount,
            account_id,
        } => {
            let created = api
                .create(&NewTransaction {
                    contractor_id,
                    kind,
                    amount,
                    account_id,
                })
                .await?;
            print_json(&created)
        }
        TransactionsSubcommand::SetStatus { id, status_id } => {
            print_json(&api.update_status(id, status_id).await?)
        }
    }
}

/// Run the navigation guard for `route` and refuse the command on redirect
fn enter(app: &Tally, route: &str) -> Result<(), CliError> {
    match app.navigate(route) {
        GuardDecision::Allow(_) => Ok(()),
        GuardDecision::Redirect(Route::Login) => Err(CliError::NotLoggedIn),
        GuardDecision::Redirect(_) => Err(CliError::AlreadyLoggedIn),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
