//! Account model.

use serde::{Deserialize, Serialize};

/// A linked bank account as returned by `GET /api/accounts`.
///
/// Only the fields used to compute the summary are modelled; everything
/// else in the API payload is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Balance information.
    pub balances: Balances,
}

/// Balance block of an [`Account`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    /// Current balance. The API reports `null` when the institution does
    /// not provide one.
    #[serde(default)]
    pub current: Option<f64>,
}

impl Account {
    /// Returns the current balance, treating a missing one as zero.
    #[inline]
    #[must_use]
    pub fn current_balance(&self) -> f64 {
        self.balances.current.unwrap_or(0.0)
    }
}

/// Envelope of the `GET /api/accounts` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountsResponse {
    /// Linked accounts.
    pub accounts: Vec<Account>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_accounts_response_ignores_extra_fields() {
        let json = r#"{
            "accounts": [
                {
                    "account_id": "BxBXxLj1m4HMXBm9WZZmCWVbPjX16EHwv99vp",
                    "name": "Plaid Checking",
                    "mask": "0000",
                    "type": "depository",
                    "balances": {
                        "available": 100,
                        "current": 110.5,
                        "iso_currency_code": "USD",
                        "limit": null
                    }
                }
            ],
            "item": {"item_id": "eVBnVMp7zdTJLkRNr33Rs6zr7KNJqBFL9DrE6"},
            "request_id": "qk5Bxes3gDfv4F2"
        }"#;
        let response: AccountsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.accounts.len(), 1);
        let account = response.accounts.first().unwrap();
        assert!((account.current_balance() - 110.5).abs() < f64::EPSILON);
    }

    #[test]
    fn null_current_balance_counts_as_zero() {
        let json = r#"{"balances": {"current": null}}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.balances.current, None);
        assert!(account.current_balance().abs() < f64::EPSILON);
    }

    #[test]
    fn identity_fields_are_not_kept() {
        let json = r#"{"account_id": "a1", "name": "Checking", "balances": {"current": 5.0}}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        let reencoded = serde_json::to_value(&account).unwrap();
        assert_eq!(reencoded, serde_json::json!({"balances": {"current": 5.0}}));
    }

    #[test]
    fn missing_balances_is_rejected() {
        let json = r#"{"account_id": "a1", "name": "Broken"}"#;
        assert!(serde_json::from_str::<Account>(json).is_err());
    }
}
