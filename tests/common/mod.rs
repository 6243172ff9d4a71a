// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use overdraft_ledger::application::AccountService;
use overdraft_ledger::domain::{Account, CustomerDetails};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(AccountService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = AccountService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

pub fn details(name: &str) -> CustomerDetails {
    CustomerDetails::new(name)
        .with_address("1 Main Street")
        .with_email(format!("{}@example.com", name.to_lowercase()))
}

/// Open an account with the given limit and starting deposit.
pub async fn funded_account(
    service: &AccountService,
    name: &str,
    limit: f64,
    deposit: f64,
) -> Result<Account> {
    let account = service.create_account(details(name), limit).await?;
    if deposit > 0.0 {
        return Ok(service.deposit(account.id, None, deposit).await?);
    }
    Ok(account)
}
