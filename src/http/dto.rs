use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{Amount, CustomerDetails};

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub details: CustomerDetails,
    /// Missing limit means no overdraft
    #[serde(default)]
    pub limit: Amount,
}

/// Body of deposit and withdraw requests.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub amount: Amount,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLimitRequest {
    pub limit: Amount,
}
