use super::{Account, Amount, Transaction};

/// Absolute drift tolerated between a stored balance and its replayed log.
pub const BALANCE_TOLERANCE: Amount = 1e-6;

/// Rebuild a balance from a transaction log.
/// Accounts open at zero, so this must match the stored balance.
pub fn replay_balance(transactions: &[Transaction]) -> Amount {
    transactions
        .iter()
        .fold(0.0, |balance, tx| balance + tx.signed_amount())
}

/// Sum of balances over a set of accounts.
pub fn total_balance(accounts: &[Account]) -> Amount {
    accounts.iter().map(|a| a.balance).sum()
}

/// Problems found while auditing a single account.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityIssue {
    /// Stored balance disagrees with the replayed transaction log
    BalanceDrift { stored: Amount, replayed: Amount },
    /// `balance + limit` is negative
    InvariantBroken { balance: Amount, limit: Amount },
    /// Transaction ids are not strictly increasing
    OutOfOrder,
}

/// Audit one account against the ledger rules.
pub fn audit_account(account: &Account) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();

    let replayed = replay_balance(&account.transactions);
    if (replayed - account.balance).abs() > BALANCE_TOLERANCE {
        issues.push(IntegrityIssue::BalanceDrift {
            stored: account.balance,
            replayed,
        });
    }

    if !account.satisfies_invariant() {
        issues.push(IntegrityIssue::InvariantBroken {
            balance: account.balance,
            limit: account.limit,
        });
    }

    if account.transactions.windows(2).any(|w| w[0].id >= w[1].id) {
        issues.push(IntegrityIssue::OutOfOrder);
    }

    issues
}

/// Rule violations raised by account state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Amount is zero, negative or not finite
    InvalidAmount(Amount),
    /// Overdraft limit is negative or not finite
    InvalidLimit(Amount),
    /// Withdrawal would take the balance below `-limit`
    InsufficientFunds {
        balance: Amount,
        limit: Amount,
        requested: Amount,
    },
    /// New limit is too small for the current (overdrawn) balance
    LimitBelowBalance { balance: Amount, requested: Amount },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::InvalidAmount(amount) => {
                write!(f, "Amount must be positive, got {}", amount)
            }
            LedgerError::InvalidLimit(limit) => {
                write!(f, "Overdraft limit must be non-negative, got {}", limit)
            }
            LedgerError::InsufficientFunds {
                balance,
                limit,
                requested,
            } => write!(
                f,
                "Insufficient funds: withdrawing {} from balance {} with overdraft limit {}",
                requested, balance, limit
            ),
            LedgerError::LimitBelowBalance { balance, requested } => write!(
                f,
                "Cannot set overdraft limit to {} while balance is {}",
                requested, balance
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::CustomerDetails;

    fn numbered(mut account: Account) -> Account {
        for (i, tx) in account.transactions.iter_mut().enumerate() {
            tx.id = i as i64 + 1;
        }
        account
    }

    #[test]
    fn test_replay_empty_log() {
        assert_eq!(replay_balance(&[]), 0.0);
    }

    #[test]
    fn test_replay_matches_balance() {
        let mut acc = Account::open(CustomerDetails::new("Eve"), 50.0).unwrap();
        acc.deposit(100.0, Utc::now()).unwrap();
        acc.withdraw(130.0, Utc::now()).unwrap();

        assert_eq!(replay_balance(&acc.transactions), -30.0);
        assert!(audit_account(&numbered(acc)).is_empty());
    }

    #[test]
    fn test_audit_detects_drift() {
        let mut acc = Account::open(CustomerDetails::new("Eve"), 0.0).unwrap();
        acc.deposit(10.0, Utc::now()).unwrap();
        acc.balance = 15.0;

        let issues = audit_account(&numbered(acc));
        assert_eq!(
            issues,
            vec![IntegrityIssue::BalanceDrift {
                stored: 15.0,
                replayed: 10.0
            }]
        );
    }

    #[test]
    fn test_audit_detects_broken_invariant_and_ordering() {
        let mut acc = Account::open(CustomerDetails::new("Eve"), 0.0).unwrap();
        acc.deposit(1.0, Utc::now()).unwrap();
        acc.deposit(1.0, Utc::now()).unwrap();
        acc.transactions[0].id = 5;
        acc.transactions[1].id = 3;
        acc.balance = -8.0;

        let issues = audit_account(&acc);
        assert!(issues.contains(&IntegrityIssue::OutOfOrder));
        assert!(issues
            .iter()
            .any(|i| matches!(i, IntegrityIssue::InvariantBroken { .. })));
    }

    #[test]
    fn test_total_balance() {
        let mut a = Account::open(CustomerDetails::new("A"), 100.0).unwrap();
        let mut b = Account::open(CustomerDetails::new("B"), 0.0).unwrap();
        a.withdraw(40.0, Utc::now()).unwrap();
        b.deposit(15.5, Utc::now()).unwrap();

        assert_eq!(total_balance(&[a, b]), -24.5);
        assert_eq!(total_balance(&[]), 0.0);
    }
}
