use std::{error::Error, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{
    AccountKind, AlertOutcome, AlertPolicy, BudgetSelection, Engine, EngineError, MoneyCents,
    NewAccountCmd, Notifier, SpendPeriod,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "welth_admin")]
#[command(about = "Admin utilities for Welth (bootstrap data, scheduled alerts, repairs)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./welth.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Account(Account),
    Budget(Budget),
    Alerts(Alerts),
    Balance(Balance),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    /// Subject id issued by the identity provider.
    #[arg(long)]
    id: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "CURRENT")]
    kind: String,
    /// Opening balance, e.g. `1250.00`.
    #[arg(long, default_value = "0")]
    opening_balance: String,
    #[arg(long)]
    default: bool,
}

#[derive(Args, Debug)]
struct Budget {
    #[command(subcommand)]
    command: BudgetCommand,
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    Set(BudgetSetArgs),
}

#[derive(Args, Debug)]
struct BudgetSetArgs {
    #[arg(long)]
    user: String,
    /// Ceiling, e.g. `500` or `499.99`.
    #[arg(long)]
    amount: String,
}

#[derive(Args, Debug)]
struct Alerts {
    #[command(subcommand)]
    command: AlertsCommand,
}

#[derive(Subcommand, Debug)]
enum AlertsCommand {
    /// Evaluate budgets once and print the alerts that are due.
    Run(AlertsRunArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SelectionArg {
    FirstCreated,
    MostRecent,
    RejectMultiple,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PeriodArg {
    AllTime,
    CurrentMonth,
}

#[derive(Args, Debug)]
struct AlertsRunArgs {
    /// Only evaluate this user.
    #[arg(long)]
    user: Option<String>,
    #[arg(long, default_value = "UTC")]
    timezone: String,
    #[arg(long, value_enum, default_value_t = SelectionArg::FirstCreated)]
    selection: SelectionArg,
    #[arg(long, value_enum, default_value_t = PeriodArg::AllTime)]
    period: PeriodArg,
}

#[derive(Args, Debug)]
struct Balance {
    #[command(subcommand)]
    command: BalanceCommand,
}

#[derive(Subcommand, Debug)]
enum BalanceCommand {
    /// Rebuild an account balance from its transactions.
    Recompute(BalanceRecomputeArgs),
}

#[derive(Args, Debug)]
struct BalanceRecomputeArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    account: Uuid,
}

/// Prints every alert on stdout, one block per message, so a cron job can
/// pipe them to a mailer.
struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EngineError> {
        println!("To: {to}\nSubject: {subject}\n\n{body}\n");
        Ok(())
    }
}

fn alert_policy(args: &AlertsRunArgs) -> Result<AlertPolicy, String> {
    let timezone = args
        .timezone
        .parse()
        .map_err(|_| format!("unknown time zone: {}", args.timezone))?;
    Ok(AlertPolicy {
        selection: match args.selection {
            SelectionArg::FirstCreated => BudgetSelection::FirstCreated,
            SelectionArg::MostRecent => BudgetSelection::MostRecent,
            SelectionArg::RejectMultiple => BudgetSelection::RejectMultiple,
        },
        period: match args.period {
            PeriodArg::AllTime => SpendPeriod::AllTime,
            PeriodArg::CurrentMonth => SpendPeriod::CurrentMonth,
        },
        timezone,
    })
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
    let now = Utc::now();

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let engine = Engine::builder().database(db).build().await?;
            let user = engine
                .ensure_user(&args.id, &args.email, args.name.as_deref(), now)
                .await?;
            println!("user: {} <{}>", user.id, user.email);
        }
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            let kind = AccountKind::try_from(args.kind.as_str())?;
            let opening_balance: MoneyCents = args.opening_balance.parse()?;
            let engine = Engine::builder().database(db).build().await?;
            let account = engine
                .create_account(
                    NewAccountCmd::new(args.user, args.name, kind)
                        .opening_balance(opening_balance)
                        .is_default(args.default),
                    now,
                )
                .await?;
            println!(
                "created account: {} ({}), balance {}",
                account.name, account.id, account.balance
            );
        }
        Command::Budget(Budget {
            command: BudgetCommand::Set(args),
        }) => {
            let amount: MoneyCents = args.amount.parse()?;
            let engine = Engine::builder().database(db).build().await?;
            let budget = engine.set_budget(&args.user, amount, now).await?;
            println!("budget for {}: {}", budget.user_id, budget.amount);
        }
        Command::Alerts(Alerts {
            command: AlertsCommand::Run(args),
        }) => {
            let policy = match alert_policy(&args) {
                Ok(policy) => policy,
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(2);
                }
            };
            let engine = Engine::builder()
                .database(db)
                .notifier(Arc::new(StdoutNotifier))
                .alert_policy(policy)
                .build()
                .await?;

            match args.user {
                Some(user) => match engine.run_budget_alert_for_user(&user, now).await? {
                    AlertOutcome::Sent { percent } => eprintln!("{user}: alerted at {percent}%"),
                    AlertOutcome::Skipped => eprintln!("{user}: nothing to send"),
                },
                None => {
                    let summary = engine.run_budget_alerts(now).await?;
                    for failure in &summary.failures {
                        eprintln!("{}: {}", failure.user_id, failure.reason);
                    }
                    eprintln!(
                        "evaluated {}, sent {}, skipped {}, failed {}",
                        summary.evaluated, summary.sent, summary.skipped, summary.failed
                    );
                    if summary.failed > 0 {
                        std::process::exit(1);
                    }
                }
            }
        }
        Command::Balance(Balance {
            command: BalanceCommand::Recompute(args),
        }) => {
            let engine = Engine::builder().database(db).build().await?;
            let account = engine.recompute_balance(args.account, &args.user).await?;
            println!("{} ({}): balance {}", account.name, account.id, account.balance);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alert_run_flags() {
        let cli = Cli::try_parse_from([
            "welth_admin",
            "alerts",
            "run",
            "--timezone",
            "Europe/Rome",
            "--selection",
            "most-recent",
            "--period",
            "current-month",
        ])
        .unwrap();
        let Command::Alerts(Alerts {
            command: AlertsCommand::Run(args),
        }) = cli.command
        else {
            panic!("expected alerts run");
        };
        let policy = alert_policy(&args).unwrap();
        assert_eq!(policy.timezone, chrono_tz::Europe::Rome);
        assert_eq!(policy.selection, BudgetSelection::MostRecent);
        assert_eq!(policy.period, SpendPeriod::CurrentMonth);
    }

    #[test]
    fn rejects_unknown_timezone() {
        let cli = Cli::try_parse_from(["welth_admin", "alerts", "run", "--timezone", "Nowhere"])
            .unwrap();
        let Command::Alerts(Alerts {
            command: AlertsCommand::Run(args),
        }) = cli.command
        else {
            panic!("expected alerts run");
        };
        assert!(alert_policy(&args).is_err());
    }

    #[test]
    fn account_create_requires_user_and_name() {
        assert!(Cli::try_parse_from(["welth_admin", "account", "create", "--name", "Main"]).is_err());
        assert!(
            Cli::try_parse_from([
                "welth_admin",
                "account",
                "create",
                "--user",
                "alice",
                "--name",
                "Main",
                "--opening-balance",
                "12.50",
            ])
            .is_ok()
        );
    }
}
