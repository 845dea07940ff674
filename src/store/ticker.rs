//! Periodic Ticker
//!
//! A cancellable driver that runs an async callback once per fixed period on
//! a background task. It knows nothing about the store; the store hands it a
//! closure and owns the start/stop lifecycle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};

// == Callback Types ==
/// The future produced by one callback invocation.
pub type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The callback invoked on every tick.
pub type TickFn = Arc<dyn Fn() -> TickFuture + Send + Sync>;

// == Ticker Error ==
/// Lifecycle errors of a single ticker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TickerError {
    /// The period was zero at construction
    #[error("zero ticker period")]
    InvalidPeriod,
    /// `start` was called while the ticker was running
    #[error("already started")]
    AlreadyStarted,
    /// `stop` was called while the ticker was not running
    #[error("already stopped")]
    AlreadyStopped,
}

// == Ticker ==
/// Runs a callback every `period` until stopped.
///
/// `start` and `stop` may alternate any number of times; each `start` spawns
/// a fresh loop with a fresh stop channel. The loop is biased toward the
/// stop signal, so no new invocation begins once the signal is observed; an
/// invocation already in flight runs to completion because the callback
/// future is awaited outside the cancellation race.
pub struct Ticker {
    period: Duration,
    callback: TickFn,
    stopper: Option<oneshot::Sender<()>>,
}

impl Ticker {
    // == Constructor ==
    /// Creates a stopped ticker. Fails if `period` is zero.
    pub fn new(period: Duration, callback: TickFn) -> Result<Self, TickerError> {
        if period.is_zero() {
            return Err(TickerError::InvalidPeriod);
        }
        Ok(Self {
            period,
            callback,
            stopper: None,
        })
    }

    /// Whether the ticker currently holds a running loop.
    pub fn is_running(&self) -> bool {
        self.stopper.is_some()
    }

    // == Start ==
    /// Begins ticking. The first tick fires no earlier than one period from
    /// now. Fails with `AlreadyStarted` if the ticker is running.
    pub fn start(&mut self) -> Result<(), TickerError> {
        if self.is_running() {
            return Err(TickerError::AlreadyStarted);
        }
        let (tx, mut rx) = oneshot::channel::<()>();
        let callback = Arc::clone(&self.callback);
        let period = self.period;
        tokio::spawn(async move {
            let mut tick = time::interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut rx => return,
                    _ = tick.tick() => {}
                }
                // Awaited outside the select so a stop signal cannot cancel
                // an invocation mid-flight.
                (callback)().await;
            }
        });
        self.stopper = Some(tx);
        Ok(())
    }

    // == Stop ==
    /// Halts ticking, discarding any tick that has not yet fired. Fails with
    /// `AlreadyStopped` if the ticker is not running.
    pub fn stop(&mut self) -> Result<(), TickerError> {
        match self.stopper.take() {
            // The loop may already have exited; a dead receiver is fine.
            Some(tx) => {
                let _ = tx.send(());
                Ok(())
            }
            None => Err(TickerError::AlreadyStopped),
        }
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}
