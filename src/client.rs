//! Blocking HTTP client for the financial data API.
//!
//! The API is the small Express backend that fronts Plaid: it exposes
//! `GET /api/accounts` and `GET /api/transactions` and authenticates each
//! request with the `plaid-access-token` header.

use core::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use url::Url;

use crate::error::{BridgeError, Result};
use crate::models::{Account, AccountsResponse, Transaction, TransactionsResponse};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the access token.
pub const ACCESS_TOKEN_HEADER: &str = "plaid-access-token";

/// Accounts endpoint path.
const ACCOUNTS_PATH: &str = "/api/accounts";

/// Transactions endpoint path.
const TRANSACTIONS_PATH: &str = "/api/transactions";

/// Builder for constructing a [`PlaidClient`].
#[derive(Debug)]
pub struct PlaidClientBuilder {
    /// Access token for API authentication.
    token: Option<String>,
    /// Base URL override.
    base_url: Option<String>,
    /// Per-request timeout.
    timeout: Duration,
}

impl PlaidClientBuilder {
    /// Sets the access token sent with every request.
    #[inline]
    #[must_use]
    pub fn token<T: Into<String>>(mut self, token: T) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the base URL (useful for testing with a mock server).
    #[inline]
    #[must_use]
    pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the timeout applied to each request, connect included.
    #[inline]
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the token is missing, empty or not
    /// a valid header value, or if the base URL does not parse.
    /// Returns [`BridgeError::Http`] if the HTTP client fails to build.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> Result<PlaidClient> {
        let token = self
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| BridgeError::Config("access token is required".to_owned()))?;
        let mut token_header = HeaderValue::from_str(&token).map_err(|err| {
            BridgeError::Config(format!("access token is not a valid header value: {err}"))
        })?;
        token_header.set_sensitive(true);

        let raw_url = self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let parsed = Url::parse(&raw_url)
            .map_err(|err| BridgeError::Config(format!("invalid API base URL {raw_url:?}: {err}")))?;
        let base_url = parsed.as_str().trim_end_matches('/').to_owned();

        tracing::debug!(base_url = %base_url, timeout = ?self.timeout, "building client");
        let http = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        Ok(PlaidClient {
            http,
            token_header,
            base_url,
        })
    }
}

/// Both lists fetched in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialSnapshot {
    /// Linked accounts.
    pub accounts: Vec<Account>,
    /// Recent transactions.
    pub transactions: Vec<Transaction>,
}

/// Blocking client for the financial data API.
///
/// Use [`PlaidClient::builder()`] to construct an instance. The client does
/// not retry; callers decide how to react to failures.
#[derive(Debug)]
pub struct PlaidClient {
    /// Underlying HTTP client.
    http: reqwest::blocking::Client,
    /// Access token, pre-encoded and marked sensitive.
    token_header: HeaderValue,
    /// API base URL without a trailing slash.
    base_url: String,
}

impl PlaidClient {
    /// Creates a new builder for configuring the client.
    #[inline]
    #[must_use]
    pub const fn builder() -> PlaidClientBuilder {
        PlaidClientBuilder {
            token: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Fetches linked accounts via `GET /api/accounts`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails, the server returns a
    /// non-success status, or the response cannot be deserialized.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn accounts(&self) -> Result<Vec<Account>> {
        let response: AccountsResponse = self.get_json(ACCOUNTS_PATH)?;
        tracing::debug!(count = response.accounts.len(), "fetched accounts");
        Ok(response.accounts)
    }

    /// Fetches transactions via `GET /api/transactions`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails, the server returns a
    /// non-success status, or the response cannot be deserialized.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn transactions(&self) -> Result<Vec<Transaction>> {
        let response: TransactionsResponse = self.get_json(TRANSACTIONS_PATH)?;
        let returned = response.transactions.len();
        if let Some(total) = response
            .total_transactions
            .filter(|&total| u64::try_from(returned).is_ok_and(|count| count < total))
        {
            tracing::warn!(returned, total, "backend returned a partial transaction list");
        }
        tracing::debug!(count = returned, "fetched transactions");
        Ok(response.transactions)
    }

    /// Fetches accounts, then transactions.
    ///
    /// # Errors
    ///
    /// Returns the first error from either request.
    #[inline]
    pub fn snapshot(&self) -> Result<FinancialSnapshot> {
        Ok(FinancialSnapshot {
            accounts: self.accounts()?,
            transactions: self.transactions()?,
        })
    }

    /// Sends an authenticated GET request and deserializes the JSON body.
    #[tracing::instrument(skip_all, fields(path = %path))]
    fn get_json<Resp: serde::de::DeserializeOwned>(&self, path: &'static str) -> Result<Resp> {
        let url = format!("{}{path}", self.base_url);
        tracing::trace!(url = %url, "sending GET request");
        let response = self
            .http
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, self.token_header.clone())
            .header(ACCEPT, "application/json")
            .send()?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");
        if status.is_success() {
            let body = response.text()?;
            tracing::trace!(body_len = body.len(), "parsing response body");
            serde_json::from_str(&body).map_err(|source| BridgeError::Decode {
                endpoint: path,
                source,
            })
        } else {
            let message = response
                .text()
                .unwrap_or_else(|_| "unknown error".to_owned());
            tracing::debug!(status = status.as_u16(), message = %message, "API error");
            Err(BridgeError::Api {
                endpoint: path,
                status: status.as_u16(),
                message,
            })
        }
    }
}
