//! Reduction of raw accounts and transactions into a [`FinancialSummary`].
//!
//! Everything here is pure: no I/O, no clock, no logging side effects
//! beyond `trace!` output.

use core::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive as _;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{Account, FinancialSummary, RecentTransaction, Transaction, TransactionKind};

/// Number of transactions shown on the display.
pub const RECENT_LIMIT: usize = 5;

/// Rounds to two decimal places, normalizing `-0.0` to `0.0` so the display
/// never shows a signed zero.
///
/// The exact binary value is rounded, with exact midpoints going to the even
/// cent: `2.675` is stored just below the midpoint and gives `2.67`, while
/// `0.125` is an exact midpoint and gives `0.12`. Values outside the decimal
/// range (and non-finite ones) are returned unchanged.
#[inline]
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    let rounded = Decimal::from_f64_retain(value)
        .map(|exact| exact.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
        .and_then(|cents| cents.to_f64())
        .unwrap_or(value);
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Builds the display summary from one fetch of accounts and transactions.
///
/// Totals are summed unrounded and each output field is rounded once, so
/// `net_amount` is derived from the raw sums rather than from the already
/// rounded income and expense figures.
#[must_use]
pub fn build_summary(accounts: &[Account], transactions: &[Transaction]) -> FinancialSummary {
    let balance: f64 = accounts.iter().map(Account::current_balance).sum();

    let (income, expenses) = transactions
        .iter()
        .fold((0.0_f64, 0.0_f64), |(income, expenses), tx| {
            match tx.amount.partial_cmp(&0.0) {
                Some(Ordering::Greater) => (income + tx.amount, expenses),
                Some(Ordering::Less) => (income, expenses + tx.amount),
                Some(Ordering::Equal) | None => (income, expenses),
            }
        });

    tracing::trace!(
        accounts = accounts.len(),
        transactions = transactions.len(),
        "building summary"
    );

    FinancialSummary {
        bank_balance: round_cents(balance),
        total_income: round_cents(income),
        total_expenses: round_cents(expenses.abs()),
        net_amount: round_cents(income + expenses),
        recent_transactions: recent(transactions),
    }
}

/// Picks the newest [`RECENT_LIMIT`] transactions.
///
/// Dates are ISO-8601 strings, so lexicographic order is date order. The
/// sort is stable: transactions on the same day keep their API order.
fn recent(transactions: &[Transaction]) -> Vec<RecentTransaction> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|tx| RecentTransaction {
            name: tx.display_name().to_owned(),
            amount: tx.amount,
            kind: TransactionKind::of(tx.amount),
            date: tx.date.clone(),
        })
        .collect()
}
