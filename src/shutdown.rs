//! Interruptible waits between cycles.

use core::time::Duration;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};

/// Something the delivery loop can wait on between cycles.
pub trait Pause {
    /// Waits up to `duration`.
    ///
    /// Returns `false` if the loop should stop instead of continuing.
    fn pause(&mut self, duration: Duration) -> bool;
}

impl<T: Pause + ?Sized> Pause for &mut T {
    #[inline]
    fn pause(&mut self, duration: Duration) -> bool {
        (**self).pause(duration)
    }
}

/// Creates a linked trigger/waiter pair.
#[inline]
#[must_use]
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = mpsc::channel();
    (
        ShutdownTrigger {
            tx,
            requested: false,
        },
        Shutdown {
            rx,
            requested: false,
        },
    )
}

/// Requests a stop. Cheap to clone; safe to call from a signal handler
/// thread.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    /// Sending half of the stop channel.
    tx: Sender<()>,
    /// Set once this handle has asked for a stop.
    requested: bool,
}

impl ShutdownTrigger {
    /// Asks the waiting side to stop.
    ///
    /// Returns `true` if this handle had already asked before, which lets a
    /// signal handler escalate when the operator presses Ctrl-C twice while
    /// a cycle is still blocked on I/O.
    #[inline]
    pub fn request(&mut self) -> bool {
        if self.tx.send(()).is_err() {
            tracing::debug!("shutdown requested after the loop already stopped");
        }
        core::mem::replace(&mut self.requested, true)
    }
}

/// Waits for a timeout or a stop request, whichever comes first.
///
/// Once a stop has been observed every later wait returns immediately.
/// Dropping every [`ShutdownTrigger`] also counts as a stop request.
#[derive(Debug)]
pub struct Shutdown {
    /// Receiving half of the stop channel.
    rx: Receiver<()>,
    /// Latched once a stop is seen.
    requested: bool,
}

impl Pause for Shutdown {
    #[inline]
    fn pause(&mut self, duration: Duration) -> bool {
        if self.requested {
            return false;
        }
        match self.rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => true,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                self.requested = true;
                false
            }
        }
    }
}
