//! Data models for the financial API and the display payload.
//!
//! [`Account`] and [`Transaction`] mirror the JSON returned by the API;
//! [`FinancialSummary`] is the record written to the display.

mod account;
mod summary;
mod transaction;

pub use account::{Account, AccountsResponse, Balances};
pub use summary::{FinancialSummary, RecentTransaction, TransactionKind};
pub use transaction::{Transaction, TransactionsResponse};
