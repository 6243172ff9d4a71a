use thiserror::Error;

use crate::domain::{AccountId, Amount, LedgerError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation on account {account_id} would break balance + limit >= 0: {reason}")]
    InvariantViolation {
        account_id: AccountId,
        balance: Amount,
        limit: Amount,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub(crate) fn from_ledger(account_id: AccountId, err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount(_) | LedgerError::InvalidLimit(_) => {
                AppError::InvalidArgument(err.to_string())
            }
            LedgerError::InsufficientFunds { balance, limit, .. } => {
                AppError::InvariantViolation {
                    account_id,
                    balance,
                    limit,
                    reason: err.to_string(),
                }
            }
            LedgerError::LimitBelowBalance { balance, requested } => {
                AppError::InvariantViolation {
                    account_id,
                    balance,
                    limit: requested,
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::AccountNotFound(_))
    }
}
