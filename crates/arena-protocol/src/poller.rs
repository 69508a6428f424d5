//! Cooperative cancellation, poll loops and retries.
//!
//! Cancellation is only observed between steps. A step that has started
//! (sync, inspect, submit) always runs to completion.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ProtocolError, Result};

/// Advisory stop signal shared by every loop of a session.
#[derive(Clone, Debug)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // the sender lives as long as any token clone, so this only ends on cancel
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleeps between poll iterations unless cancelled first.
#[derive(Clone, Debug)]
pub struct Pacer {
    interval: Duration,
    token: CancelToken,
}

impl Pacer {
    pub fn new(interval: Duration, token: CancelToken) -> Self {
        Self { interval, token }
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Fail fast if the loop has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(ProtocolError::Cancelled);
        }
        Ok(())
    }

    pub async fn wait(&self) -> Result<()> {
        tokio::select! {
            _ = self.token.cancelled() => Err(ProtocolError::Cancelled),
            _ = sleep(self.interval) => Ok(()),
        }
    }
}

/// Outcome of one poll step.
#[derive(Debug)]
pub enum Step<T> {
    Done(T),
    Pending,
}

/// Run `step` every interval until it reports `Done`.
///
/// Transient faults are logged and the loop continues; any other error ends
/// the loop.
pub async fn poll_until<T, F, Fut>(pacer: &Pacer, mut step: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Step<T>>>,
{
    let mut iteration: u64 = 0;
    loop {
        pacer.check()?;
        iteration += 1;
        match step().await {
            Ok(Step::Done(value)) => return Ok(value),
            Ok(Step::Pending) => {}
            Err(err) if err.is_transient() => {
                warn!(iteration, error = %err, "poll iteration failed");
            }
            Err(err) => return Err(err),
        }
        pacer.wait().await?;
    }
}

/// Retry `op` on transient faults with a fixed backoff.
pub async fn retry_with_backoff<T, F, Fut>(
    attempts: u32,
    backoff: Duration,
    what: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(what, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < attempts => {
                warn!(what, attempt, attempts, error = %err, "transient failure, retrying");
                attempt += 1;
                sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}
