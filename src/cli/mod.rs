use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use crate::application::{parse_account_id, AccountService};
use crate::domain::{format_amount, parse_amount, Account, CustomerDetails, IntegrityIssue};
use crate::{http, observability};

/// Overdraft ledger - bank accounts with overdraft limits
#[derive(Parser)]
#[command(name = "ledger")]
#[command(about = "Bank-account ledger with overdraft limits, over SQLite")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "LEDGER_DATABASE", default_value = "ledger.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "LEDGER_BIND", default_value = "127.0.0.1:8080")]
        bind: String,
    },

    /// Open a new account with a zero balance
    Create {
        #[command(flatten)]
        details: DetailsArgs,

        /// Overdraft limit (e.g., "100.00")
        #[arg(short, long, default_value = "0")]
        limit: String,
    },

    /// Delete an account and its history
    Remove {
        /// Account ID
        id: String,
    },

    /// Deposit funds into an account
    Deposit {
        /// Account ID
        id: String,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,

        /// Date of the deposit (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Withdraw funds, possibly into the overdraft
    Withdraw {
        /// Account ID
        id: String,

        /// Amount to withdraw
        amount: String,

        /// Date of the withdrawal (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Change the overdraft limit
    SetLimit {
        /// Account ID
        id: String,

        /// New overdraft limit
        limit: String,
    },

    /// Replace the customer details
    SetDetails {
        /// Account ID
        id: String,

        #[command(flatten)]
        details: DetailsArgs,
    },

    /// Show an account
    Show {
        /// Account ID
        id: String,
    },

    /// Show the balance of an account
    Balance {
        /// Account ID
        id: String,
    },

    /// List the transactions of an account
    History {
        /// Account ID
        id: String,
    },

    /// List all accounts
    List,

    /// Show the sum of all balances
    Total,

    /// Verify ledger integrity
    Check,
}

#[derive(Args)]
pub struct DetailsArgs {
    /// Customer name
    #[arg(short, long)]
    pub name: String,

    /// Postal address
    #[arg(long)]
    pub address: Option<String>,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,

    /// Phone number
    #[arg(long)]
    pub phone: Option<String>,
}

impl From<DetailsArgs> for CustomerDetails {
    fn from(args: DetailsArgs) -> Self {
        CustomerDetails {
            name: args.name,
            address: args.address,
            email: args.email,
            phone: args.phone,
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        observability::init(self.verbose);

        match self.command {
            Commands::Init => {
                AccountService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve { bind } => {
                let service = AccountService::init(&self.database).await?;
                http::serve(Arc::new(service), &bind).await?;
            }

            command => {
                let service = AccountService::connect(&self.database).await?;
                run_account_command(&service, command).await?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(service: &AccountService, command: Commands) -> Result<()> {
    match command {
        Commands::Create { details, limit } => {
            let limit = parse_amount(&limit).context("Invalid limit. Use '100.00' or '100'")?;
            let account = service.create_account(details.into(), limit).await?;
            println!(
                "Created account {} for {} (limit {})",
                account.id,
                account.details.name,
                format_amount(account.limit)
            );
        }

        Commands::Remove { id } => {
            service.remove_account(parse_account_id(&id)?).await?;
            println!("Removed account {}", id);
        }

        Commands::Deposit { id, amount, date } => {
            let amount = parse_amount(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let date = date.as_deref().map(parse_date).transpose()?;
            let account = service
                .deposit(parse_account_id(&id)?, date, amount)
                .await?;
            println!(
                "Deposited {} into {} (balance {})",
                format_amount(amount),
                account.id,
                format_amount(account.balance)
            );
        }

        Commands::Withdraw { id, amount, date } => {
            let amount = parse_amount(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let date = date.as_deref().map(parse_date).transpose()?;
            let account = service
                .withdraw(parse_account_id(&id)?, date, amount)
                .await?;
            println!(
                "Withdrew {} from {} (balance {})",
                format_amount(amount),
                account.id,
                format_amount(account.balance)
            );
        }

        Commands::SetLimit { id, limit } => {
            let limit = parse_amount(&limit).context("Invalid limit. Use '100.00' or '100'")?;
            let account = service.change_limit(parse_account_id(&id)?, limit).await?;
            println!(
                "Overdraft limit of {} set to {}",
                account.id,
                format_amount(account.limit)
            );
        }

        Commands::SetDetails { id, details } => {
            let account = service
                .change_details(parse_account_id(&id)?, details.into())
                .await?;
            println!("Updated details of {}", account.id);
        }

        Commands::Show { id } => {
            let account = service.get_account(parse_account_id(&id)?).await?;
            print_account(&account);
        }

        Commands::Balance { id } => {
            let balance = service.get_balance(parse_account_id(&id)?).await?;
            println!("{}", format_amount(balance));
        }

        Commands::History { id } => {
            let transactions = service.get_all_transactions(parse_account_id(&id)?).await?;
            if transactions.is_empty() {
                println!("No transactions found.");
            } else {
                println!("{:>6} {:<10} {:>12} {:<20}", "ID", "TYPE", "AMOUNT", "DATE");
                println!("{}", "-".repeat(51));
                for tx in transactions {
                    println!(
                        "{:>6} {:<10} {:>12} {:<20}",
                        tx.id,
                        tx.kind,
                        format_amount(tx.amount),
                        tx.date.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }

        Commands::List => {
            let accounts = service.get_all_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!(
                    "{:<36} {:<20} {:>12} {:>12}",
                    "ID", "NAME", "BALANCE", "LIMIT"
                );
                println!("{}", "-".repeat(83));
                for account in accounts {
                    println!(
                        "{:<36} {:<20} {:>12} {:>12}",
                        account.id,
                        truncate(&account.details.name, 20),
                        format_amount(account.balance),
                        format_amount(account.limit)
                    );
                }
            }
        }

        Commands::Total => {
            let total = service.get_total().await?;
            println!("{}", format_amount(total));
        }

        Commands::Check => {
            let report = service.verify_ledger().await?;
            println!("Accounts checked: {}", report.accounts_checked);
            println!(
                "Total balance:    {} (stored) / {} (computed)",
                format_amount(report.stored_total),
                format_amount(report.computed_total)
            );
            for (id, issue) in &report.issues {
                println!("  {}: {}", id, describe_issue(issue));
            }
            if report.is_ok() {
                println!("Ledger OK");
            } else {
                anyhow::bail!("Ledger integrity check failed");
            }
        }

        Commands::Init | Commands::Serve { .. } => unreachable!("handled in Cli::run"),
    }
    Ok(())
}

fn print_account(account: &Account) {
    let details = &account.details;
    println!("Account: {}", account.id);
    println!("  Name:      {}", details.name);
    if let Some(address) = &details.address {
        println!("  Address:   {}", address);
    }
    if let Some(email) = &details.email {
        println!("  Email:     {}", email);
    }
    if let Some(phone) = &details.phone {
        println!("  Phone:     {}", phone);
    }
    println!(
        "  Opened:    {}",
        account.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!();
    println!("  Balance:   {}", format_amount(account.balance));
    println!("  Limit:     {}", format_amount(account.limit));
    println!("  Available: {}", format_amount(account.available()));
    println!("  Transactions: {}", account.transactions.len());
}

fn describe_issue(issue: &IntegrityIssue) -> String {
    match issue {
        IntegrityIssue::BalanceDrift { stored, replayed } => format!(
            "balance {} does not match replayed log {}",
            format_amount(*stored),
            format_amount(*replayed)
        ),
        IntegrityIssue::InvariantBroken { balance, limit } => format!(
            "balance {} exceeds overdraft limit {}",
            format_amount(*balance),
            format_amount(*limit)
        ),
        IntegrityIssue::OutOfOrder => "transaction ids are out of order".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    use chrono::NaiveDate;

    // Parse YYYY-MM-DD format
    let naive_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))?;

    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;

    Ok(DateTime::from_naive_utc_and_offset(naive_datetime, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let date = parse_date("2024-01-15").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-01-15T00:00:00+00:00");
        assert!(parse_date("15/01/2024").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("a very long customer name", 10), "a very ...");
    }

    #[test]
    fn test_cli_parses_withdraw() {
        let cli = Cli::try_parse_from([
            "ledger",
            "--database",
            "test.db",
            "withdraw",
            "3f2a",
            "12.50",
            "--date",
            "2024-02-01",
        ])
        .unwrap();

        match cli.command {
            Commands::Withdraw { id, amount, date } => {
                assert_eq!(id, "3f2a");
                assert_eq!(amount, "12.50");
                assert_eq!(date.as_deref(), Some("2024-02-01"));
            }
            _ => panic!("expected withdraw"),
        }
    }

    #[test]
    fn test_cli_parses_create_with_details() {
        let cli = Cli::try_parse_from([
            "ledger", "create", "--name", "Ada", "--email", "ada@example.com", "--limit", "50",
        ])
        .unwrap();

        match cli.command {
            Commands::Create { details, limit } => {
                let details: CustomerDetails = details.into();
                assert_eq!(details.name, "Ada");
                assert_eq!(details.email.as_deref(), Some("ada@example.com"));
                assert_eq!(limit, "50");
            }
            _ => panic!("expected create"),
        }
    }
}
