use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Amount};

/// Store-assigned sequence number. Monotonically increasing, never reused.
pub type TransactionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdraw => "WITHDRAW",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEPOSIT" => Some(TransactionKind::Deposit),
            "WITHDRAW" => Some(TransactionKind::Withdraw),
            _ => None,
        }
    }

    /// Effect of a transaction of this kind on the account balance.
    pub fn signed(&self, amount: Amount) -> Amount {
        match self {
            TransactionKind::Deposit => amount,
            TransactionKind::Withdraw => -amount,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single posted balance change. Transactions are immutable once recorded
/// and are owned exclusively by their account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Assigned by the repository on first save; 0 until then
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Always strictly positive
    pub amount: Amount,
    /// When the movement happened (defaults to posting time)
    pub date: DateTime<Utc>,
    pub account_id: AccountId,
}

impl Transaction {
    pub(crate) fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Amount,
        date: DateTime<Utc>,
    ) -> Self {
        debug_assert!(amount > 0.0, "Transaction amount must be positive");
        Self {
            id: 0,
            kind,
            amount,
            date,
            account_id,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    pub fn signed_amount(&self) -> Amount {
        self.kind.signed(self.amount)
    }
}
