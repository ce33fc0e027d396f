//! Tally CLI - Small-business bookkeeping
//!
//! Usage:
//!   tally init                                     Initialize database
//!   tally add -b courses -t revenue -a 1200        Record a transaction
//!   tally forecast                                 Project next month
//!   tally serve --port 3000                        Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Add {
            business,
            tx_type,
            amount,
            date,
            cost,
            students,
            clients,
            category,
            notes,
            payment_method,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let args = commands::AddArgs {
                business,
                tx_type,
                amount,
                date,
                cost,
                students,
                clients,
                category,
                notes,
                payment_method,
            };
            commands::cmd_add(&db, args).map(|_| ())
        }
        Commands::Transactions {
            limit,
            business,
            tx_type,
            from,
            to,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_transactions_list(
                &db,
                limit,
                business.as_deref(),
                tx_type.as_deref(),
                from.as_deref(),
                to.as_deref(),
            )
        }
        Commands::Delete { id } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_delete(&db, id)
        }
        Commands::Aggregates { business } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_aggregates(&db, business.as_deref())
        }
        Commands::Forecast => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_forecast(&db)
        }
        Commands::Report { period, business } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_report(&db, &period, business.as_deref())
        }
        Commands::Dashboard { date } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_dashboard(&db, date.as_deref())
        }
        Commands::Employees { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(EmployeesAction::List) => commands::cmd_employees_list(&db),
                Some(EmployeesAction::Add {
                    name,
                    role,
                    business,
                    salary,
                    hired,
                }) => commands::cmd_employees_add(
                    &db,
                    &name,
                    role.as_deref(),
                    business.as_deref(),
                    salary,
                    hired.as_deref(),
                )
                .map(|_| ()),
                Some(EmployeesAction::Remove { id }) => commands::cmd_employees_remove(&db, id),
            }
        }
        Commands::Export {
            format,
            output,
            business,
            from,
            to,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_export(
                &db,
                &format,
                output.as_deref(),
                business.as_deref(),
                from.as_deref(),
                to.as_deref(),
            )
        }
        Commands::ImportBackup { file, yes } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import_backup(&db, &file, yes)
        }
        Commands::Rebuild => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_rebuild(&db)
        }
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
            allowed_origins,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
                allowed_origins,
            )
            .await
        }
    }
}
