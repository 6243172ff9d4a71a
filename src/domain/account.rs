use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, LedgerError, Transaction, TransactionKind};

pub type AccountId = Uuid;

/// Customer information attached to an account. The ledger never inspects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl CustomerDetails {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// A customer account with an overdraft facility.
///
/// The balance may go negative, but never below `-limit`: every state
/// transition keeps `balance + limit >= 0`. Transitions that would break
/// it are rejected before anything is changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub details: CustomerDetails,
    pub balance: Amount,
    /// Overdraft limit, never negative
    pub limit: Amount,
    /// Posting order is chronological order
    pub transactions: Vec<Transaction>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account with a zero balance and an empty history.
    pub fn open(details: CustomerDetails, limit: Amount) -> Result<Self, LedgerError> {
        validate_limit(limit)?;
        Ok(Self {
            id: Uuid::new_v4(),
            details,
            balance: 0.0,
            limit,
            transactions: Vec::new(),
            created_at: Utc::now(),
        })
    }

    /// Funds that can still be withdrawn: balance plus overdraft headroom.
    pub fn available(&self) -> Amount {
        self.balance + self.limit
    }

    pub fn satisfies_invariant(&self) -> bool {
        self.available() >= 0.0
    }

    /// Credit the account and append a DEPOSIT entry.
    pub fn deposit(
        &mut self,
        amount: Amount,
        date: DateTime<Utc>,
    ) -> Result<&Transaction, LedgerError> {
        validate_amount(amount)?;
        validate_balance(self.balance + amount, amount)?;
        Ok(self.post(TransactionKind::Deposit, amount, date))
    }

    /// Debit the account and append a WITHDRAW entry.
    /// Fails without side effects when `balance + limit < amount`.
    ///
    /// The check is made on the resulting state, `(balance - amount) + limit`,
    /// so it can be one rounding step stricter than the comparison above:
    /// with `balance = 0.1`, `limit = 0.2` and `amount = 0.1 + 0.2` the
    /// withdrawal is refused even though `balance + limit == amount`.
    pub fn withdraw(
        &mut self,
        amount: Amount,
        date: DateTime<Utc>,
    ) -> Result<&Transaction, LedgerError> {
        validate_amount(amount)?;
        let balance = self.balance - amount;
        validate_balance(balance, amount)?;
        if balance + self.limit < 0.0 {
            return Err(LedgerError::InsufficientFunds {
                balance: self.balance,
                limit: self.limit,
                requested: amount,
            });
        }
        Ok(self.post(TransactionKind::Withdraw, amount, date))
    }

    /// Replace the overdraft limit.
    /// Fails without side effects when the balance is already below `-new_limit`.
    pub fn change_limit(&mut self, new_limit: Amount) -> Result<(), LedgerError> {
        validate_limit(new_limit)?;
        if self.balance + new_limit < 0.0 {
            return Err(LedgerError::LimitBelowBalance {
                balance: self.balance,
                requested: new_limit,
            });
        }
        self.limit = new_limit;
        Ok(())
    }

    pub fn change_details(&mut self, details: CustomerDetails) {
        self.details = details;
    }

    fn post(&mut self, kind: TransactionKind, amount: Amount, date: DateTime<Utc>) -> &Transaction {
        self.balance += kind.signed(amount);
        self.transactions
            .push(Transaction::new(self.id, kind, amount, date));
        &self.transactions[self.transactions.len() - 1]
    }
}

fn validate_amount(amount: Amount) -> Result<(), LedgerError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

/// A posting whose result is not representable would leave the log and the
/// balance disagreeing.
fn validate_balance(balance: Amount, amount: Amount) -> Result<(), LedgerError> {
    if !balance.is_finite() {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

fn validate_limit(limit: Amount) -> Result<(), LedgerError> {
    if !limit.is_finite() || limit < 0.0 {
        return Err(LedgerError::InvalidLimit(limit));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn account(limit: Amount) -> Account {
        Account::open(CustomerDetails::new("Ada Lovelace"), limit).unwrap()
    }

    #[test]
    fn test_open_starts_empty() {
        let acc = account(50.0);
        assert_eq!(acc.balance, 0.0);
        assert_eq!(acc.limit, 50.0);
        assert!(acc.transactions.is_empty());
    }

    #[test]
    fn test_open_rejects_negative_limit() {
        let result = Account::open(CustomerDetails::new("Bob"), -1.0);
        assert_eq!(result.unwrap_err(), LedgerError::InvalidLimit(-1.0));
    }

    #[test]
    fn test_open_rejects_nan_limit() {
        let result = Account::open(CustomerDetails::new("Bob"), f64::NAN);
        assert!(matches!(result, Err(LedgerError::InvalidLimit(_))));
    }

    #[test]
    fn test_deposit_rejects_non_positive_amounts() {
        let mut acc = account(0.0);
        for amount in [0.0, -5.0, f64::INFINITY] {
            assert!(matches!(
                acc.deposit(amount, Utc::now()),
                Err(LedgerError::InvalidAmount(_))
            ));
        }
        assert_eq!(acc.balance, 0.0);
        assert!(acc.transactions.is_empty());
    }

    #[test]
    fn test_withdraw_into_overdraft() {
        let mut acc = account(50.0);
        acc.deposit(100.0, Utc::now()).unwrap();
        acc.withdraw(130.0, Utc::now()).unwrap();

        assert_eq!(acc.balance, -30.0);
        assert_eq!(acc.transactions.len(), 2);
    }

    #[test]
    fn test_withdraw_beyond_limit_leaves_state_untouched() {
        let mut acc = account(50.0);
        acc.deposit(100.0, Utc::now()).unwrap();
        acc.withdraw(130.0, Utc::now()).unwrap();

        let before = acc.clone();
        let result = acc.withdraw(25.0, Utc::now());
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(acc, before);
    }

    #[test]
    fn test_withdraw_exactly_to_limit() {
        let mut acc = account(20.0);
        acc.withdraw(20.0, Utc::now()).unwrap();
        assert_eq!(acc.balance, -20.0);
        assert!(acc.satisfies_invariant());
    }

    #[test]
    fn test_change_limit_below_overdrawn_balance() {
        let mut acc = account(50.0);
        acc.withdraw(30.0, Utc::now()).unwrap();

        let result = acc.change_limit(10.0);
        assert!(matches!(result, Err(LedgerError::LimitBelowBalance { .. })));
        assert_eq!(acc.limit, 50.0);

        acc.change_limit(30.0).unwrap();
        assert_eq!(acc.limit, 30.0);
    }

    #[test]
    fn test_change_limit_rejects_negative() {
        let mut acc = account(10.0);
        assert_eq!(acc.change_limit(-0.5), Err(LedgerError::InvalidLimit(-0.5)));
    }

    #[test]
    fn test_balance_overflow_is_rejected() {
        let mut acc = account(0.0);
        acc.deposit(f64::MAX, Utc::now()).unwrap();

        let before = acc.clone();
        let result = acc.deposit(f64::MAX, Utc::now());
        assert_eq!(result.unwrap_err(), LedgerError::InvalidAmount(f64::MAX));
        assert_eq!(acc, before);
        assert!(acc.balance.is_finite());
    }

    #[test]
    fn test_overdraft_overflow_is_rejected() {
        let mut acc = account(f64::MAX);
        acc.withdraw(f64::MAX, Utc::now()).unwrap();

        let before = acc.clone();
        assert!(matches!(
            acc.withdraw(f64::MAX, Utc::now()),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert_eq!(acc, before);
    }

    #[test]
    fn test_withdraw_checks_resulting_balance() {
        let mut acc = account(0.2);
        acc.deposit(0.1, Utc::now()).unwrap();

        // 0.1 + 0.2 compares equal to the headroom but would leave it just below zero
        let result = acc.withdraw(0.1 + 0.2, Utc::now());
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(acc.transactions.len(), 1);

        acc.withdraw(0.3, Utc::now()).unwrap();
        assert!(acc.satisfies_invariant());
    }

    #[test]
    fn test_transactions_point_back_to_account() {
        let mut acc = account(0.0);
        let tx = acc.deposit(1.0, Utc::now()).unwrap().clone();
        assert_eq!(tx.account_id, acc.id);
        assert_eq!(tx.kind, TransactionKind::Deposit);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Deposit(f64),
        Withdraw(f64),
        Limit(f64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-10.0f64..500.0).prop_map(Op::Deposit),
            (-10.0f64..500.0).prop_map(Op::Withdraw),
            (-10.0f64..500.0).prop_map(Op::Limit),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: no sequence of operations, accepted or rejected,
        /// leaves the account with balance + limit < 0.
        #[test]
        fn invariant_holds_after_any_sequence(
            limit in 0.0f64..200.0,
            ops in prop::collection::vec(op(), 0..40)
        ) {
            let mut acc = Account::open(CustomerDetails::new("prop"), limit).unwrap();

            for op in ops {
                let before = acc.clone();
                let accepted = match op {
                    Op::Deposit(a) => acc.deposit(a, Utc::now()).is_ok(),
                    Op::Withdraw(a) => acc.withdraw(a, Utc::now()).is_ok(),
                    Op::Limit(l) => acc.change_limit(l).is_ok(),
                };
                if !accepted {
                    prop_assert_eq!(&acc, &before);
                }
                prop_assert!(acc.satisfies_invariant());
            }
        }

        /// Property: a deposit followed by an equal withdrawal restores the
        /// balance and appends exactly DEPOSIT then WITHDRAW.
        #[test]
        fn deposit_then_withdraw_round_trips(
            limit in 0.0f64..100.0,
            amount in 0.01f64..10_000.0
        ) {
            let mut acc = Account::open(CustomerDetails::new("prop"), limit).unwrap();
            let start = acc.balance;

            acc.deposit(amount, Utc::now()).unwrap();
            acc.withdraw(amount, Utc::now()).unwrap();

            prop_assert_eq!(acc.balance, start);
            let kinds: Vec<_> = acc.transactions.iter().map(|t| t.kind).collect();
            prop_assert_eq!(kinds, vec![TransactionKind::Deposit, TransactionKind::Withdraw]);
        }
    }
}
