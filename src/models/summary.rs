//! Display payload.

use serde::{Deserialize, Serialize};

/// Direction of a transaction as shown on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money in (`amount > 0`).
    Income,
    /// Money out. Zero amounts land here too.
    Expense,
}

impl TransactionKind {
    /// Classifies a signed amount.
    #[inline]
    #[must_use]
    pub fn of(amount: f64) -> Self {
        if amount > 0.0 {
            Self::Income
        } else {
            Self::Expense
        }
    }
}

/// One row of the "recent transactions" list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTransaction {
    /// Merchant name, or the raw description when there is none.
    pub name: String,
    /// Signed amount, unchanged from the API.
    pub amount: f64,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Posting date (`YYYY-MM-DD`).
    pub date: String,
}

/// The record written to the display once per cycle.
///
/// Field names are part of the device protocol; the firmware looks them up
/// by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    /// Sum of current balances across accounts, rounded to cents.
    pub bank_balance: f64,
    /// Sum of positive amounts, rounded to cents.
    pub total_income: f64,
    /// Magnitude of the sum of negative amounts, rounded to cents.
    pub total_expenses: f64,
    /// Income minus expenses, rounded to cents.
    pub net_amount: f64,
    /// Up to five most recent transactions, newest first.
    pub recent_transactions: Vec<RecentTransaction>,
}
