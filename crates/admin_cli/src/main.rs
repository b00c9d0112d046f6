use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{Amount, BalanceChangeCmd, Engine};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "balance_admin")]
#[command(about = "Admin utilities for the balance ledger (services, manual top-ups)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./balance.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Service(Service),
    Balance(Balance),
    Reservation(Reservation),
}

#[derive(Args, Debug)]
struct Service {
    #[command(subcommand)]
    command: ServiceCommand,
}

#[derive(Subcommand, Debug)]
enum ServiceCommand {
    /// Create a service or rename an existing one.
    Add(ServiceAddArgs),
    List,
}

#[derive(Args, Debug)]
struct ServiceAddArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct Balance {
    #[command(subcommand)]
    command: BalanceCommand,
}

#[derive(Subcommand, Debug)]
enum BalanceCommand {
    Show(UserArgs),
    /// Credit an account; the amount is decimal, e.g. `12.50`.
    Replenish(ReplenishArgs),
}

#[derive(Args, Debug)]
struct UserArgs {
    #[arg(long)]
    user: String,
}

#[derive(Args, Debug)]
struct ReplenishArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    amount: Amount,
    #[arg(long)]
    comment: Option<String>,
}

#[derive(Args, Debug)]
struct Reservation {
    #[command(subcommand)]
    command: ReservationCommand,
}

#[derive(Subcommand, Debug)]
enum ReservationCommand {
    /// Active reservations of a user.
    List(UserArgs),
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Service(Service {
            command: ServiceCommand::Add(args),
        }) => {
            let service = engine.upsert_service(&args.id, &args.name).await?;
            println!("saved service: {} ({})", service.name, service.id);
        }
        Command::Service(Service {
            command: ServiceCommand::List,
        }) => {
            for service in engine.services().await? {
                println!("{}\t{}", service.id, service.name);
            }
        }
        Command::Balance(Balance {
            command: BalanceCommand::Show(args),
        }) => {
            let balance = engine.balance(&args.user).await?;
            println!("{}: {balance}", args.user);
        }
        Command::Balance(Balance {
            command: BalanceCommand::Replenish(args),
        }) => {
            if !args.amount.is_positive() {
                eprintln!("amount must be > 0");
                std::process::exit(2);
            }
            let mut cmd = BalanceChangeCmd::new(args.user.as_str(), args.amount.minor());
            if let Some(comment) = args.comment {
                cmd = cmd.comment(comment);
            }
            let balance = engine.replenish(cmd).await?;
            println!("{}: {balance}", args.user);
        }
        Command::Reservation(Reservation {
            command: ReservationCommand::List(args),
        }) => {
            for reservation in engine.reservations(&args.user).await? {
                let key = &reservation.key;
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    reservation.created_at.to_rfc3339(),
                    key.service_id,
                    key.order_id,
                    key.cost,
                    reservation.comment.as_deref().unwrap_or("")
                );
            }
        }
    }

    Ok(())
}
