//! Serial link to the display.
//!
//! The device protocol is one JSON object per line, UTF-8, terminated by
//! `\n`. Nothing is read back.

use core::time::Duration;
use std::io::Write;

use serialport::SerialPort;

use crate::error::{BridgeError, Result};
use crate::models::FinancialSummary;

/// Device path used when none is configured.
pub const DEFAULT_PORT: &str = "/dev/tty.usbserial-0001";

/// Baud rate used when none is configured.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Write timeout used when none is configured.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Where and how to open the display's serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Device path (`/dev/ttyUSB0`, `COM3`, ...).
    pub path: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Timeout for a single write.
    pub write_timeout: Duration,
}

impl Default for SerialSettings {
    #[inline]
    fn default() -> Self {
        Self {
            path: DEFAULT_PORT.to_owned(),
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Opens the serial device.
///
/// The returned handle closes the device when dropped.
///
/// # Errors
///
/// Returns [`BridgeError::SerialOpen`] if the device cannot be opened.
#[inline]
#[tracing::instrument(skip_all, fields(path = %settings.path, baud_rate = settings.baud_rate))]
pub fn open(settings: &SerialSettings) -> Result<Box<dyn SerialPort>> {
    tracing::debug!("opening serial device");
    serialport::new(settings.path.as_str(), settings.baud_rate)
        .timeout(settings.write_timeout)
        .open()
        .map_err(|source| BridgeError::SerialOpen {
            path: settings.path.clone(),
            source,
        })
}

/// Encodes a summary as a single line of JSON, newline included.
///
/// # Errors
///
/// Returns [`BridgeError::Serialization`] if the summary cannot be encoded.
#[inline]
pub fn encode_line(summary: &FinancialSummary) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(summary).map_err(BridgeError::Serialization)?;
    line.push(b'\n');
    Ok(line)
}

/// Writes one encoded line and flushes it to the device.
///
/// # Errors
///
/// Returns [`BridgeError::SerialDisconnected`] if the device has gone away,
/// or [`BridgeError::SerialWrite`] for other write failures.
#[inline]
pub fn send_line<W: Write + ?Sized>(sink: &mut W, line: &[u8]) -> Result<()> {
    sink.write_all(line).map_err(BridgeError::from_write)?;
    sink.flush().map_err(BridgeError::from_write)
}
