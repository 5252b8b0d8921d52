//! Bridge between a Plaid-backed financial API and a serial display.
//!
//! Every cycle the bridge fetches accounts and transactions over HTTP,
//! reduces them to a [`models::FinancialSummary`], and writes it as one line
//! of JSON to a microcontroller on a serial port.
//!
//! ```no_run
//! use plaid_display::config::Config;
//! use plaid_display::delivery::serve;
//! use plaid_display::shutdown;
//!
//! # fn main() -> plaid_display::error::Result<()> {
//! let config = Config::from_env()?;
//! let client = config.client()?;
//! let (_trigger, waiter) = shutdown::channel();
//! let report = serve(&config, client, waiter)?;
//! println!("delivered {} summaries", report.delivered);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod delivery;
pub mod error;
pub mod models;
pub mod serial;
pub mod shutdown;
pub mod summary;
