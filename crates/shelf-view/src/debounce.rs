//! Trailing-edge debounce with an owned timer handle.
//!
//! Each `schedule` aborts the pending timer (if any) and starts a new one, so
//! only the last value supplied before the input goes quiet reaches the
//! callback. `dispose` cancels the pending timer and refuses new ones; the
//! timer is also cancelled on drop.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Debouncer for one logical input.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<JoinHandle<()>>,
    disposed: bool,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback(value)` after `delay` of quiet.
    ///
    /// A zero delay invokes the callback immediately. Outside a tokio
    /// runtime there is no timer to arm, so the callback also runs
    /// immediately. Returns `false` if the debouncer is disposed.
    pub fn schedule<T, F>(&mut self, value: T, delay: Duration, callback: F) -> bool
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        if self.disposed {
            tracing::debug!("Debouncer disposed, dropping scheduled value");
            return false;
        }

        self.cancel();

        if delay.is_zero() {
            callback(value);
            return true;
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("No async runtime for debounce timer, applying immediately");
                callback(value);
                return true;
            }
        };

        // Deadline is fixed now, not when the task is first polled
        let deadline = Instant::now() + delay;
        self.pending = Some(handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            callback(value);
        }));
        true
    }

    /// Cancel the pending timer. Returns `true` if one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(timer) => {
                let waiting = !timer.is_finished();
                timer.abort();
                waiting
            }
            None => false,
        }
    }

    /// Whether a timer is armed and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the pending timer and refuse further scheduling.
    pub fn dispose(&mut self) {
        self.cancel();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
