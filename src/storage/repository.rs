use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, Amount, CustomerDetails, Transaction, TransactionId, TransactionKind,
};

use super::MIGRATION_001_INITIAL;

const ACCOUNT_COLUMNS: &str = "id, details, balance, overdraft_limit, created_at";
const TRANSACTION_COLUMNS: &str = "id, account_id, kind, amount, date";

/// Repository for persisting accounts together with their transaction logs.
///
/// Every write runs inside a single SQL transaction, so the
/// balance / limit / log triple of an account is never observed half-written.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    /// `?mode=rwc` in the URL creates the file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Open a private in-memory database with the schema applied.
    ///
    /// The pool is pinned to one connection that never expires; dropping it
    /// would discard the database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory database URL")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let repo = Self::new(pool);
        repo.migrate().await?;
        Ok(repo)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    /// Insert or fully replace an account.
    ///
    /// Transactions that were never saved (id 0) are appended to the log and
    /// receive their sequence ids; already persisted ones are immutable and
    /// left alone.
    pub async fn save_account(&self, account: &mut Account) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let details_json = serde_json::to_string(&account.details)?;

        sqlx::query(
            r#"
            INSERT INTO accounts (id, details, balance, overdraft_limit, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                details = excluded.details,
                balance = excluded.balance,
                overdraft_limit = excluded.overdraft_limit
            "#,
        )
        .bind(account.id.to_string())
        .bind(&details_json)
        .bind(account.balance)
        .bind(account.limit)
        .bind(account.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save account")?;

        let mut assigned: Vec<(usize, TransactionId)> = Vec::new();
        for (index, transaction) in account.transactions.iter().enumerate() {
            if transaction.is_persisted() {
                continue;
            }
            let id = Self::insert_transaction(&mut tx, transaction).await?;
            assigned.push((index, id));
        }

        tx.commit().await.context("Failed to commit account")?;

        // Only hand out ids once they are durable
        for (index, id) in assigned {
            account.transactions[index].id = id;
        }
        Ok(())
    }

    async fn insert_transaction(
        conn: &mut SqliteConnection,
        transaction: &Transaction,
    ) -> Result<TransactionId> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (account_id, kind, amount, date)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(transaction.account_id.to_string())
        .bind(transaction.kind.as_str())
        .bind(transaction.amount)
        .bind(transaction.date.to_rfc3339())
        .fetch_one(conn)
        .await
        .context("Failed to append transaction")?;

        Ok(row.get("id"))
    }

    /// Get an account and its full transaction log by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        // One read transaction so the account row and its log come from the same snapshot
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch account")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE account_id = ? ORDER BY id"
        ))
        .bind(id.to_string())
        .fetch_all(&mut *tx)
        .await
        .context("Failed to fetch transactions")?;

        tx.commit().await.context("Failed to finish read")?;

        let transactions = rows
            .iter()
            .map(Self::row_to_transaction)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Self::row_to_account(&row, transactions)?))
    }

    /// Delete an account and its whole log. Returns false if it didn't exist.
    pub async fn delete_account(&self, id: AccountId) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM transactions WHERE account_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete transactions")?;

        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete account")?;

        tx.commit().await.context("Failed to commit delete")?;
        Ok(result.rows_affected() > 0)
    }

    /// List all accounts with their logs, oldest account first.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let accounts = Self::fetch_accounts(&mut tx).await?;
        tx.commit().await.context("Failed to finish read")?;
        Ok(accounts)
    }

    /// Every account together with the aggregate balance, both read from the
    /// same snapshot.
    pub async fn snapshot(&self) -> Result<(Vec<Account>, Amount)> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let accounts = Self::fetch_accounts(&mut tx).await?;
        let total = Self::fetch_total(&mut tx).await?;
        tx.commit().await.context("Failed to finish read")?;
        Ok((accounts, total))
    }

    async fn fetch_accounts(conn: &mut SqliteConnection) -> Result<Vec<Account>> {
        let account_rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at, id"
        ))
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list accounts")?;

        let transaction_rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY id"
        ))
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list transactions")?;

        let mut logs: HashMap<AccountId, Vec<Transaction>> = HashMap::new();
        for row in &transaction_rows {
            let transaction = Self::row_to_transaction(row)?;
            logs.entry(transaction.account_id)
                .or_default()
                .push(transaction);
        }

        account_rows
            .iter()
            .map(|row| {
                let id = Self::parse_account_id(row)?;
                Self::row_to_account(row, logs.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn fetch_total(conn: &mut SqliteConnection) -> Result<Amount> {
        let row = sqlx::query("SELECT COALESCE(SUM(balance), 0.0) AS total FROM accounts")
            .fetch_one(conn)
            .await
            .context("Failed to sum balances")?;

        Ok(row.get("total"))
    }

    /// Sum of all balances, 0.0 when there are no accounts.
    pub async fn sum_balances(&self) -> Result<Amount> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Self::fetch_total(&mut conn).await
    }

    pub async fn account_exists(&self, id: AccountId) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ?) AS present")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to check account existence")?;

        Ok(row.get::<i64, _>("present") != 0)
    }

    pub async fn count_accounts(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM accounts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count accounts")?;

        Ok(row.get("count"))
    }

    fn parse_account_id(row: &SqliteRow) -> Result<AccountId> {
        let id_str: String = row.get("id");
        Uuid::parse_str(&id_str).context("Invalid account ID")
    }

    fn row_to_account(row: &SqliteRow, transactions: Vec<Transaction>) -> Result<Account> {
        let details_json: String = row.get("details");
        let created_at_str: String = row.get("created_at");

        let details: CustomerDetails =
            serde_json::from_str(&details_json).context("Invalid customer details")?;

        Ok(Account {
            id: Self::parse_account_id(row)?,
            details,
            balance: row.get("balance"),
            limit: row.get("overdraft_limit"),
            transactions,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let account_id_str: String = row.get("account_id");
        let kind_str: String = row.get("kind");
        let date_str: String = row.get("date");

        Ok(Transaction {
            id: row.get("id"),
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            amount: row.get("amount"),
            date: parse_timestamp(&date_str).context("Invalid transaction date")?,
            account_id: Uuid::parse_str(&account_id_str).context("Invalid account ID")?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
