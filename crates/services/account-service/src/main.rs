//! Account Service - administrative command line.

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use account_service_lib::cancel::cancel_after;
use account_service_lib::config::AccountServiceConfig;
use account_service_lib::{AccountRuntime, MigrateAction};
use domain::{AccountId, AccountResponse, DEFAULT_PAGE_SIZE, FIRST_PAGE};

#[derive(Parser)]
#[command(name = "account-service")]
#[command(about = "Account management administration")]
struct Cli {
    /// Abort the command after this many seconds
    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    /// List active accounts, newest first
    List {
        #[arg(long, default_value_t = FIRST_PAGE)]
        page: u64,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u64,
    },
    /// Show one account
    Show {
        #[arg(long)]
        id: i64,
    },
    /// Deactivate an account
    Deactivate {
        #[arg(long)]
        id: i64,
    },
    /// Permanently delete an account record
    Purge {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

fn print_account(account: impl Into<AccountResponse>) -> Result<(), Box<dyn std::error::Error>> {
    let response: AccountResponse = account.into();
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AccountServiceConfig::from_env();

    let timeout = Duration::from_secs(cli.timeout_secs);

    match cli.command {
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            account_service_lib::run_migrations(&config, migrate_action).await?;
        }
        Commands::List { page, page_size } => {
            let runtime = AccountRuntime::connect(&config).await?;
            let accounts = runtime
                .service
                .list_accounts(page, page_size, &cancel_after(timeout))
                .await?;
            let rows: Vec<AccountResponse> = accounts.into_iter().map(Into::into).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::Show { id } => {
            let runtime = AccountRuntime::connect(&config).await?;
            let account = runtime
                .service
                .get_account(AccountId(id), &cancel_after(timeout))
                .await?;
            print_account(account)?;
        }
        Commands::Deactivate { id } => {
            let runtime = AccountRuntime::connect(&config).await?;
            runtime
                .service
                .deactivate_account(AccountId(id), &cancel_after(timeout))
                .await?;
            println!("Account {} deactivated", id);
        }
        Commands::Purge { id } => {
            let runtime = AccountRuntime::connect(&config).await?;
            runtime.purge(AccountId(id), &cancel_after(timeout)).await?;
            println!("Account {} purged", id);
        }
    }

    Ok(())
}
