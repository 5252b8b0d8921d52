//! The fetch → build → send → wait loop.
//!
//! [`serve`] opens the serial device (CONNECTING) and hands it to a
//! [`DeliveryLoop`] (RUNNING). Each cycle asks a [`SummarySource`] for a
//! fresh [`FinancialSummary`], writes it as one JSON line, and waits. How
//! long it waits depends on how the cycle ended:
//!
//! | outcome | class | wait |
//! |---|---|---|
//! | delivered | | [`Schedule::poll_interval`] |
//! | API failure | [`ErrorClass::RemoteFetch`] | [`Schedule::fetch_retry_delay`] |
//! | other cycle failure | [`ErrorClass::Cycle`] | [`Schedule::error_pause`] |
//! | device lost | [`ErrorClass::SerialUnavailable`] | none, the loop returns the error |
//!
//! The serial handle is owned by the loop for its whole run and is never
//! reopened; it is released when the loop is dropped, on every exit path.

use core::time::Duration;
use std::io::Write;

use crate::client::PlaidClient;
use crate::config::Config;
use crate::error::{BridgeError, ErrorClass, Result};
use crate::models::FinancialSummary;
use crate::serial;
use crate::shutdown::Pause;
use crate::summary::build_summary;

/// Wait after a delivered cycle when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// First wait after an API failure when none is configured.
pub const DEFAULT_FETCH_BACKOFF: Duration = Duration::from_secs(5);

/// Cap on the API failure backoff when none is configured.
pub const DEFAULT_MAX_FETCH_BACKOFF: Duration = Duration::from_secs(60);

/// Wait after any other cycle failure when none is configured.
pub const DEFAULT_ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Wait after opening the device when none is configured. Many boards
/// reset when the port opens and miss the first line otherwise.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Timing policy of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Wait after a delivered cycle.
    pub poll_interval: Duration,
    /// Wait after the first consecutive API failure.
    pub fetch_backoff: Duration,
    /// Upper bound for the doubling API failure backoff.
    pub max_fetch_backoff: Duration,
    /// Wait after a serialization or write failure.
    pub error_pause: Duration,
    /// Wait between opening the device and the first cycle.
    pub settle_delay: Duration,
}

impl Default for Schedule {
    #[inline]
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_backoff: DEFAULT_FETCH_BACKOFF,
            max_fetch_backoff: DEFAULT_MAX_FETCH_BACKOFF,
            error_pause: DEFAULT_ERROR_PAUSE,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl Schedule {
    /// Returns the wait after the `consecutive`-th API failure in a row
    /// (1-based): `fetch_backoff`, doubled per further failure, capped at
    /// `max_fetch_backoff`.
    #[inline]
    #[must_use]
    pub fn fetch_retry_delay(&self, consecutive: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(consecutive.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.fetch_backoff
            .saturating_mul(factor)
            .min(self.max_fetch_backoff)
    }
}

/// Produces one summary per cycle.
pub trait SummarySource {
    /// Fetches fresh data and reduces it to a summary.
    ///
    /// # Errors
    ///
    /// Returns an error of class [`ErrorClass::RemoteFetch`] when the data
    /// could not be retrieved.
    fn next_summary(&mut self) -> Result<FinancialSummary>;
}

impl<T: SummarySource + ?Sized> SummarySource for &mut T {
    #[inline]
    fn next_summary(&mut self) -> Result<FinancialSummary> {
        (**self).next_summary()
    }
}

impl SummarySource for PlaidClient {
    #[inline]
    fn next_summary(&mut self) -> Result<FinancialSummary> {
        let snapshot = self.snapshot()?;
        Ok(build_summary(&snapshot.accounts, &snapshot.transactions))
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    /// Summaries written to the device.
    pub delivered: u64,
    /// Cycles that failed talking to the API.
    pub fetch_failures: u64,
    /// Cycles that failed for any other non-fatal reason.
    pub cycle_failures: u64,
}

/// Owns the serial sink and drives cycles until stopped.
#[derive(Debug)]
pub struct DeliveryLoop<S, W, P> {
    /// Where summaries come from.
    source: S,
    /// The open serial connection.
    sink: W,
    /// Timing policy.
    schedule: Schedule,
    /// Interruptible wait between cycles.
    pause: P,
    /// API failures since the last success.
    consecutive_fetch_failures: u32,
    /// Running counters.
    report: LoopReport,
}

impl<S: SummarySource, W: Write, P: Pause> DeliveryLoop<S, W, P> {
    /// Creates a loop around an already open sink.
    #[inline]
    #[must_use]
    pub fn new(source: S, sink: W, schedule: Schedule, pause: P) -> Self {
        Self {
            source,
            sink,
            schedule,
            pause,
            consecutive_fetch_failures: 0,
            report: LoopReport::default(),
        }
    }

    /// Runs one fetch → build → send cycle.
    ///
    /// # Errors
    ///
    /// Returns whatever the source, the encoder or the sink failed with.
    #[tracing::instrument(skip_all)]
    pub fn run_cycle(&mut self) -> Result<FinancialSummary> {
        let summary = self.source.next_summary()?;
        let line = serial::encode_line(&summary)?;
        serial::send_line(&mut self.sink, &line)?;
        let payload = String::from_utf8_lossy(&line);
        tracing::debug!(payload = %payload.trim_end(), "sent financial data");
        Ok(summary)
    }

    /// Runs cycles until the pause reports a stop request.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error ([`ErrorClass::SerialUnavailable`] or
    /// [`ErrorClass::Configuration`]). Every other failure is logged and
    /// retried.
    #[tracing::instrument(skip_all)]
    pub fn run(&mut self) -> Result<LoopReport> {
        tracing::info!(
            poll_interval = ?self.schedule.poll_interval,
            "delivery loop running"
        );
        loop {
            let wait = match self.run_cycle() {
                Ok(summary) => self.on_delivered(&summary),
                Err(err) => self.on_failure(err)?,
            };
            if !self.pause.pause(wait) {
                tracing::info!(
                    delivered = self.report.delivered,
                    fetch_failures = self.report.fetch_failures,
                    cycle_failures = self.report.cycle_failures,
                    "stop requested, leaving delivery loop"
                );
                return Ok(self.report);
            }
        }
    }

    /// Returns the counters collected so far.
    #[inline]
    #[must_use]
    pub const fn report(&self) -> LoopReport {
        self.report
    }

    /// Consumes the loop and returns the sink.
    #[inline]
    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Books a delivered cycle and returns the next wait.
    fn on_delivered(&mut self, summary: &FinancialSummary) -> Duration {
        self.report.delivered = self.report.delivered.saturating_add(1);
        self.consecutive_fetch_failures = 0;
        tracing::info!(
            bank_balance = summary.bank_balance,
            net_amount = summary.net_amount,
            recent = summary.recent_transactions.len(),
            "delivered summary"
        );
        self.schedule.poll_interval
    }

    /// Books a failed cycle and returns the next wait, or the error itself
    /// when it is fatal.
    fn on_failure(&mut self, err: BridgeError) -> Result<Duration> {
        match err.class() {
            ErrorClass::RemoteFetch => {
                self.report.fetch_failures = self.report.fetch_failures.saturating_add(1);
                self.consecutive_fetch_failures = self.consecutive_fetch_failures.saturating_add(1);
                let wait = self
                    .schedule
                    .fetch_retry_delay(self.consecutive_fetch_failures);
                tracing::warn!(
                    error = %err,
                    consecutive = self.consecutive_fetch_failures,
                    retry_in = ?wait,
                    "API error, keeping serial connection and retrying"
                );
                Ok(wait)
            }
            ErrorClass::Cycle => {
                self.report.cycle_failures = self.report.cycle_failures.saturating_add(1);
                tracing::warn!(
                    error = %err,
                    retry_in = ?self.schedule.error_pause,
                    "cycle failed, retrying"
                );
                Ok(self.schedule.error_pause)
            }
            ErrorClass::SerialUnavailable | ErrorClass::Configuration => {
                tracing::error!(error = %err, "fatal error, leaving delivery loop");
                Err(err)
            }
        }
    }
}

/// Opens the configured serial device and runs the delivery loop on it.
///
/// Nothing is fetched if the device cannot be opened. Returns an empty
/// report if a stop is requested while the device settles.
///
/// # Errors
///
/// Returns [`BridgeError::SerialOpen`] if the device cannot be opened, or
/// the fatal error that ended the loop.
#[tracing::instrument(skip_all, fields(port = %config.serial.path))]
pub fn serve<S: SummarySource, P: Pause>(
    config: &Config,
    source: S,
    mut pause: P,
) -> Result<LoopReport> {
    let port = serial::open(&config.serial)?;
    tracing::info!(baud_rate = config.serial.baud_rate, "connected to display");
    if !pause.pause(config.schedule.settle_delay) {
        tracing::info!("stop requested before the first cycle");
        return Ok(LoopReport::default());
    }
    DeliveryLoop::new(source, port, config.schedule, pause).run()
}
