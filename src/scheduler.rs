//! One-shot expiry timers for resolver entries learned with a lifetime.
//!
//! Each armed timer is a Tokio task that sleeps for the entry's lifetime and
//! then posts its [`TimerToken`] to the scheduler's channel. The owner of the
//! scheduler receives tokens with [`ExpiryScheduler::next_expired`] and maps
//! them back to entries. A token may arrive for a timer that was cancelled
//! after it had already fired, so receivers must ignore tokens they no longer
//! recognize.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Deadline used when a lifetime overflows the clock, roughly 30 years out.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Identity of one armed timer. Rearming an entry issues a fresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// A pending expiry owned by a resolver entry.
///
/// Dropping the timer cancels it.
#[derive(Debug)]
pub struct ExpiryTimer {
    token: TimerToken,
    lifetime: Duration,
    task: JoinHandle<()>,
}

impl ExpiryTimer {
    #[must_use]
    pub const fn token(&self) -> TimerToken {
        self.token
    }

    /// Lifetime the timer was armed with.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Aborts the timer task. Safe to call more than once.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Arms expiry timers and collects the ones that fire.
#[derive(Debug)]
pub struct ExpiryScheduler {
    next_token: u64,
    fired_tx: mpsc::UnboundedSender<TimerToken>,
    fired_rx: mpsc::UnboundedReceiver<TimerToken>,
}

impl ExpiryScheduler {
    #[must_use]
    pub fn new() -> Self {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        Self {
            next_token: 0,
            fired_tx,
            fired_rx,
        }
    }

    /// Arms a timer that fires once after `lifetime`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn arm(&mut self, lifetime: Duration) -> ExpiryTimer {
        let token = TimerToken(self.next_token);
        self.next_token += 1;

        let now = Instant::now();
        let deadline = now.checked_add(lifetime).unwrap_or_else(|| now + FAR_FUTURE);
        let tx = self.fired_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // The receiver lives as long as the scheduler; a send error only
            // means the resolver is gone.
            let _ = tx.send(token);
        });

        tracing::trace!(?token, ?lifetime, "Armed expiry timer");
        ExpiryTimer {
            token,
            lifetime,
            task,
        }
    }

    /// Waits for the next timer to fire.
    ///
    /// Returns `None` only if the channel is closed, which cannot happen while
    /// the scheduler is alive.
    pub async fn next_expired(&mut self) -> Option<TimerToken> {
        self.fired_rx.recv().await
    }

    #[cfg(test)]
    fn try_next_expired(&mut self) -> Option<TimerToken> {
        self.fired_rx.try_recv().ok()
    }
}

impl Default for ExpiryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_lifetime() {
        let mut scheduler = ExpiryScheduler::new();
        let start = Instant::now();
        let timer = scheduler.arm(Duration::from_secs(30));

        let token = scheduler.next_expired().await.unwrap();
        assert_eq!(token, timer.token());
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let mut scheduler = ExpiryScheduler::new();
        let doomed = scheduler.arm(Duration::from_secs(5));
        let survivor = scheduler.arm(Duration::from_secs(10));

        doomed.cancel();
        doomed.cancel();

        let token = scheduler.next_expired().await.unwrap();
        assert_eq!(token, survivor.token());
        assert!(scheduler.try_next_expired().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_timer_cancels_it() {
        let mut scheduler = ExpiryScheduler::new();
        drop(scheduler.arm(Duration::from_secs(1)));

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(scheduler.try_next_expired().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_lifetime_saturates() {
        let mut scheduler = ExpiryScheduler::new();
        let timer = scheduler.arm(Duration::MAX);
        assert_eq!(timer.lifetime(), Duration::MAX);

        let fired = tokio::time::timeout(Duration::from_secs(86_400), scheduler.next_expired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_are_unique() {
        let mut scheduler = ExpiryScheduler::new();
        let a = scheduler.arm(Duration::from_secs(1));
        let b = scheduler.arm(Duration::from_secs(1));
        assert_ne!(a.token(), b.token());
        assert_eq!(a.lifetime(), Duration::from_secs(1));
    }
}
