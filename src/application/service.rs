use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    audit_account, total_balance, Account, AccountId, Amount, CustomerDetails, IntegrityIssue,
    LedgerError, Transaction, BALANCE_TOLERANCE,
};
use crate::storage::Repository;

use super::{AccountLocks, AppError};

/// Application service providing the account operations.
/// This is the primary interface for any client (CLI, HTTP, tests).
pub struct AccountService {
    repo: Repository,
    locks: AccountLocks,
}

/// Result of auditing every stored account
#[derive(Debug)]
pub struct IntegrityReport {
    pub accounts_checked: usize,
    pub issues: Vec<(AccountId, IntegrityIssue)>,
    /// Aggregate reported by the store
    pub stored_total: Amount,
    /// Sum of the balances of the loaded accounts
    pub computed_total: Amount,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
            && (self.stored_total - self.computed_total).abs() <= BALANCE_TOLERANCE
    }
}

/// Parse an account id coming from a caller. Anything that is not a UUID
/// cannot name an existing account.
pub fn parse_account_id(input: &str) -> Result<AccountId, AppError> {
    Uuid::parse_str(input.trim()).map_err(|_| AppError::AccountNotFound(input.to_string()))
}

impl AccountService {
    /// Create a new account service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            locks: AccountLocks::new(),
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Service over a throwaway in-memory database.
    pub async fn in_memory() -> Result<Self, AppError> {
        Ok(Self::new(Repository::in_memory().await?))
    }

    // ========================
    // Mutations
    // ========================

    /// Open a new account with a zero balance.
    pub async fn create_account(
        &self,
        details: CustomerDetails,
        limit: Amount,
    ) -> Result<Account, AppError> {
        let mut account = Account::open(details, limit).map_err(|err| {
            warn!(limit, "rejected account creation: {}", err);
            AppError::InvalidArgument(err.to_string())
        })?;

        self.repo.save_account(&mut account).await?;
        info!(account_id = %account.id, limit, "account created");
        Ok(account)
    }

    /// Delete an account together with its transaction log.
    pub async fn remove_account(&self, id: AccountId) -> Result<(), AppError> {
        let guard = self.locks.acquire(id).await;
        let removed = self.repo.delete_account(id).await?;

        // Whether it was just deleted or never existed, the entry guards nothing now
        drop(guard);
        self.locks.forget(id);

        if !removed {
            return Err(AppError::AccountNotFound(id.to_string()));
        }
        info!(account_id = %id, "account removed");
        Ok(())
    }

    /// Credit an account. `date` defaults to now.
    pub async fn deposit(
        &self,
        id: AccountId,
        date: Option<DateTime<Utc>>,
        amount: Amount,
    ) -> Result<Account, AppError> {
        let account = self
            .mutate(id, "deposit", |account| {
                account
                    .deposit(amount, date.unwrap_or_else(Utc::now))
                    .map(|_| ())
            })
            .await?;

        info!(account_id = %id, amount, balance = account.balance, "deposit posted");
        Ok(account)
    }

    /// Debit an account, possibly into its overdraft. `date` defaults to now.
    pub async fn withdraw(
        &self,
        id: AccountId,
        date: Option<DateTime<Utc>>,
        amount: Amount,
    ) -> Result<Account, AppError> {
        let account = self
            .mutate(id, "withdraw", |account| {
                account
                    .withdraw(amount, date.unwrap_or_else(Utc::now))
                    .map(|_| ())
            })
            .await?;

        info!(account_id = %id, amount, balance = account.balance, "withdrawal posted");
        Ok(account)
    }

    /// Replace the customer details of an account.
    pub async fn change_details(
        &self,
        id: AccountId,
        details: CustomerDetails,
    ) -> Result<Account, AppError> {
        let account = self
            .mutate(id, "change_details", |account| {
                account.change_details(details);
                Ok(())
            })
            .await?;

        info!(account_id = %id, "details changed");
        Ok(account)
    }

    /// Replace the overdraft limit of an account.
    pub async fn change_limit(&self, id: AccountId, new_limit: Amount) -> Result<Account, AppError> {
        let account = self
            .mutate(id, "change_limit", |account| account.change_limit(new_limit))
            .await?;

        info!(account_id = %id, limit = new_limit, "overdraft limit changed");
        Ok(account)
    }

    /// Run one state transition under the account's lock: load, apply,
    /// persist. A rejected transition writes nothing.
    ///
    /// `apply` runs while the lock is held, so anything it reads from the
    /// clock is ordered the same way as the log.
    async fn mutate<F>(&self, id: AccountId, operation: &str, apply: F) -> Result<Account, AppError>
    where
        F: FnOnce(&mut Account) -> Result<(), LedgerError>,
    {
        let guard = self.locks.acquire(id).await;

        let mut account = match self.load(id).await {
            Ok(account) => account,
            Err(err) => {
                if err.is_not_found() {
                    drop(guard);
                    self.locks.forget(id);
                }
                return Err(err);
            }
        };
        if let Err(err) = apply(&mut account) {
            warn!(account_id = %id, operation, "rejected: {}", err);
            return Err(AppError::from_ledger(id, err));
        }

        self.repo.save_account(&mut account).await?;
        Ok(account)
    }

    // ========================
    // Queries
    // ========================

    async fn load(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// Full snapshot of an account, including its log.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        debug!(account_id = %id, "get_account");
        self.load(id).await
    }

    pub async fn get_balance(&self, id: AccountId) -> Result<Amount, AppError> {
        Ok(self.load(id).await?.balance)
    }

    /// Transaction log in posting order.
    pub async fn get_all_transactions(&self, id: AccountId) -> Result<Vec<Transaction>, AppError> {
        Ok(self.load(id).await?.transactions)
    }

    pub async fn get_all_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Sum of every account balance; 0.0 when there are none.
    pub async fn get_total(&self) -> Result<Amount, AppError> {
        Ok(self.repo.sum_balances().await?)
    }

    pub async fn contains(&self, id: AccountId) -> Result<bool, AppError> {
        Ok(self.repo.account_exists(id).await?)
    }

    pub async fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.repo.count_accounts().await? == 0)
    }

    /// Replay every account's log and check the ledger rules.
    /// Accounts and the stored total come from one snapshot, so this is safe
    /// to run against a live server.
    pub async fn verify_ledger(&self) -> Result<IntegrityReport, AppError> {
        let (accounts, stored_total) = self.repo.snapshot().await?;

        let issues: Vec<(AccountId, IntegrityIssue)> = accounts
            .iter()
            .flat_map(|account| {
                audit_account(account)
                    .into_iter()
                    .map(move |issue| (account.id, issue))
            })
            .collect();

        if !issues.is_empty() {
            warn!(count = issues.len(), "ledger integrity issues found");
        }

        Ok(IntegrityReport {
            accounts_checked: accounts.len(),
            issues,
            stored_total,
            computed_total: total_balance(&accounts),
        })
    }
}
