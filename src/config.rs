//! Runtime configuration.
//!
//! Everything is read once at startup from environment variables, optionally
//! backed by a dotenv file, into an immutable [`Config`].

use core::time::Duration;
use std::collections::HashMap;
use std::path::Path;

use secrecy::{ExposeSecret as _, SecretString};
use url::Url;

use crate::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, PlaidClient};
use crate::delivery::Schedule;
use crate::error::{BridgeError, Result};
use crate::serial::SerialSettings;

/// Access token (required).
pub const TOKEN_ENV: &str = "PLAID_ACCESS_TOKEN";
/// API base URL.
pub const API_URL_ENV: &str = "PLAID_DISPLAY_API_URL";
/// Serial device path.
pub const SERIAL_PORT_ENV: &str = "PLAID_DISPLAY_SERIAL_PORT";
/// Serial baud rate.
pub const BAUD_RATE_ENV: &str = "PLAID_DISPLAY_BAUD_RATE";
/// Seconds to wait after a delivered cycle.
pub const POLL_INTERVAL_ENV: &str = "PLAID_DISPLAY_POLL_INTERVAL_SECS";
/// Seconds to wait after the first API failure.
pub const FETCH_BACKOFF_ENV: &str = "PLAID_DISPLAY_FETCH_BACKOFF_SECS";
/// Upper bound in seconds for the API failure backoff.
pub const MAX_FETCH_BACKOFF_ENV: &str = "PLAID_DISPLAY_MAX_FETCH_BACKOFF_SECS";
/// Seconds to wait after other cycle failures.
pub const ERROR_PAUSE_ENV: &str = "PLAID_DISPLAY_ERROR_PAUSE_SECS";
/// Seconds to wait after opening the device.
pub const SETTLE_ENV: &str = "PLAID_DISPLAY_SETTLE_SECS";
/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_ENV: &str = "PLAID_DISPLAY_REQUEST_TIMEOUT_SECS";
/// Serial write timeout in seconds.
pub const SERIAL_TIMEOUT_ENV: &str = "PLAID_DISPLAY_SERIAL_TIMEOUT_SECS";
/// Path of a dotenv file to load instead of `./.env`.
pub const ENV_FILE_ENV: &str = "PLAID_DISPLAY_ENV_FILE";

/// Complete bridge configuration.
#[derive(Debug)]
pub struct Config {
    /// Token passed unchanged in the `plaid-access-token` header.
    pub access_token: SecretString,
    /// Base URL of the financial data API.
    pub api_base_url: Url,
    /// Timeout for each HTTP request.
    pub request_timeout: Duration,
    /// Serial device settings.
    pub serial: SerialSettings,
    /// Loop timing.
    pub schedule: Schedule,
}

impl Config {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the token is missing or any value
    /// is invalid.
    #[inline]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration from a dotenv file. Process environment
    /// variables take precedence over the file, as with `dotenvy`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::EnvFile`] if the file cannot be read or
    /// parsed, or [`BridgeError::Config`] for invalid values.
    #[inline]
    pub fn from_env_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let env_file_error = |source| BridgeError::EnvFile {
            path: path.display().to_string(),
            source,
        };
        let file_values = dotenvy::from_path_iter(path)
            .map_err(env_file_error)?
            .collect::<core::result::Result<HashMap<String, String>, _>>()
            .map_err(env_file_error)?;
        tracing::debug!(path = %path.display(), keys = file_values.len(), "loaded env file");
        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_values.get(key).cloned())
        })
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the token is missing or any value
    /// is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let access_token = get(TOKEN_ENV)
            .map(SecretString::from)
            .ok_or_else(|| BridgeError::Config(format!("{TOKEN_ENV} is not set")))?;

        let raw_url = get(API_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let api_base_url = Url::parse(raw_url.trim()).map_err(|err| {
            BridgeError::Config(format!("{API_URL_ENV}: invalid URL {raw_url:?}: {err}"))
        })?;

        let defaults = SerialSettings::default();
        let baud_rate = match get(BAUD_RATE_ENV) {
            Some(raw) => parse_baud_rate(&raw)?,
            None => defaults.baud_rate,
        };
        let serial = SerialSettings {
            path: get(SERIAL_PORT_ENV).unwrap_or(defaults.path),
            baud_rate,
            write_timeout: seconds(&get, SERIAL_TIMEOUT_ENV, defaults.write_timeout)?,
        };

        let base = Schedule::default();
        let schedule = Schedule {
            poll_interval: seconds(&get, POLL_INTERVAL_ENV, base.poll_interval)?,
            fetch_backoff: seconds(&get, FETCH_BACKOFF_ENV, base.fetch_backoff)?,
            max_fetch_backoff: seconds(&get, MAX_FETCH_BACKOFF_ENV, base.max_fetch_backoff)?,
            error_pause: seconds(&get, ERROR_PAUSE_ENV, base.error_pause)?,
            settle_delay: seconds(&get, SETTLE_ENV, base.settle_delay)?,
        };
        if schedule.max_fetch_backoff < schedule.fetch_backoff {
            return Err(BridgeError::Config(format!(
                "{MAX_FETCH_BACKOFF_ENV} must not be below {FETCH_BACKOFF_ENV}"
            )));
        }

        Ok(Self {
            access_token,
            api_base_url,
            request_timeout: seconds(&get, REQUEST_TIMEOUT_ENV, DEFAULT_TIMEOUT)?,
            serial,
            schedule,
        })
    }

    /// Builds an API client from this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    #[inline]
    pub fn client(&self) -> Result<PlaidClient> {
        PlaidClient::builder()
            .token(self.access_token.expose_secret())
            .base_url(self.api_base_url.as_str())
            .timeout(self.request_timeout)
            .build()
    }
}

/// Parses a non-zero baud rate.
fn parse_baud_rate(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(BridgeError::Config(format!("{BAUD_RATE_ENV} must be positive"))),
        Ok(rate) => Ok(rate),
        Err(err) => Err(BridgeError::Config(format!(
            "{BAUD_RATE_ENV}: invalid number {raw:?}: {err}"
        ))),
    }
}

/// Reads a duration given in (possibly fractional) seconds.
fn seconds<G>(get: &G, key: &str, default: Duration) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let invalid = |reason: &str| BridgeError::Config(format!("{key}: {reason} {raw:?}"));
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_err| invalid("not a number"))?;
    Duration::try_from_secs_f64(secs).map_err(|_err| invalid("not a valid duration"))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|&(key, value)| (key.to_owned(), value.to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = Config::from_lookup(lookup(&[(TOKEN_ENV, "access-sandbox-1")])).unwrap();
        assert_eq!(config.access_token.expose_secret(), "access-sandbox-1");
        assert_eq!(config.api_base_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.serial, SerialSettings::default());
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.schedule, Schedule::default());
        assert_eq!(config.schedule.poll_interval, Duration::from_secs(10));
        assert_eq!(config.schedule.fetch_backoff, Duration::from_secs(5));
        assert_eq!(config.schedule.error_pause, Duration::from_secs(1));
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[(TOKEN_ENV, "   ")])).unwrap_err();
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            (TOKEN_ENV, "tok"),
            (API_URL_ENV, "https://bridge.local:8443"),
            (SERIAL_PORT_ENV, "/dev/ttyUSB0"),
            (BAUD_RATE_ENV, "9600"),
            (POLL_INTERVAL_ENV, "2.5"),
            (FETCH_BACKOFF_ENV, "3"),
            (MAX_FETCH_BACKOFF_ENV, "30"),
            (ERROR_PAUSE_ENV, "0.5"),
            (SETTLE_ENV, "0"),
            (REQUEST_TIMEOUT_ENV, "15"),
            (SERIAL_TIMEOUT_ENV, "0.25"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url.host_str(), Some("bridge.local"));
        assert_eq!(config.serial.path, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.write_timeout, Duration::from_millis(250));
        assert_eq!(config.schedule.poll_interval, Duration::from_millis(2500));
        assert_eq!(config.schedule.fetch_backoff, Duration::from_secs(3));
        assert_eq!(config.schedule.max_fetch_backoff, Duration::from_secs(30));
        assert_eq!(config.schedule.error_pause, Duration::from_millis(500));
        assert_eq!(config.schedule.settle_delay, Duration::ZERO);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        for (key, value) in [
            (BAUD_RATE_ENV, "fast"),
            (BAUD_RATE_ENV, "0"),
            (POLL_INTERVAL_ENV, "-1"),
            (POLL_INTERVAL_ENV, "ten"),
            (SERIAL_TIMEOUT_ENV, "NaN"),
        ] {
            let result = Config::from_lookup(lookup(&[(TOKEN_ENV, "tok"), (key, value)]));
            let err = result.unwrap_err();
            assert!(err.to_string().contains(key), "{key}={value}: {err}");
        }
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = Config::from_lookup(lookup(&[(TOKEN_ENV, "tok"), (API_URL_ENV, "localhost")]))
            .unwrap_err();
        assert!(err.to_string().contains(API_URL_ENV));
    }

    #[test]
    fn backoff_cap_below_base_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            (TOKEN_ENV, "tok"),
            (FETCH_BACKOFF_ENV, "10"),
            (MAX_FETCH_BACKOFF_ENV, "5"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(MAX_FETCH_BACKOFF_ENV));
    }

    #[test]
    fn env_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# bridge settings").unwrap();
        writeln!(file, "{TOKEN_ENV}=access-sandbox-from-file").unwrap();
        writeln!(file, "{SERIAL_PORT_ENV}=/dev/cu.usbserial-42").unwrap();
        writeln!(file, "{BAUD_RATE_ENV}=57600").unwrap();
        file.flush().unwrap();

        let config = Config::from_env_file(file.path()).unwrap();

        assert_eq!(config.serial.path, "/dev/cu.usbserial-42");
        assert_eq!(config.serial.baud_rate, 57_600);
        assert!(!config.access_token.expose_secret().is_empty());
    }

    #[test]
    fn missing_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_env_file(dir.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, BridgeError::EnvFile { .. }));
    }

    #[test]
    fn debug_output_hides_token() {
        let config = Config::from_lookup(lookup(&[(TOKEN_ENV, "access-sandbox-secret")])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("access-sandbox-secret"));
    }

    #[test]
    fn client_is_built_from_config() {
        let config = Config::from_lookup(lookup(&[
            (TOKEN_ENV, "tok"),
            (API_URL_ENV, "http://127.0.0.1:9/"),
        ]))
        .unwrap();
        assert!(config.client().is_ok());
    }
}
