//! Transaction model.

use serde::{Deserialize, Serialize};

/// A transaction as returned by `GET /api/transactions`.
///
/// The sign of `amount` is kept exactly as the API reports it: positive is
/// income, negative is an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Cleaned merchant name, when the API could determine one.
    #[serde(default)]
    pub merchant_name: Option<String>,
    /// Raw transaction description.
    pub name: String,
    /// Signed amount.
    pub amount: f64,
    /// Posting date (`YYYY-MM-DD`).
    pub date: String,
}

impl Transaction {
    /// Returns the name shown on the display: the merchant name, or the raw
    /// description when the merchant name is missing or empty.
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.merchant_name
            .as_deref()
            .filter(|merchant| !merchant.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Envelope of the `GET /api/transactions` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionsResponse {
    /// Transactions in the requested window.
    pub transactions: Vec<Transaction>,
    /// Total number of transactions the backend knows about, if reported.
    #[serde(default)]
    pub total_transactions: Option<u64>,
}
