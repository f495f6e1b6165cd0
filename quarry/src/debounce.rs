//! Restartable one-shot timer on the tokio runtime.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A one-shot delayed callback where scheduling again discards the previous
/// callback.
///
/// Dropping the timer cancels whatever is pending. Must be used from within
/// a tokio runtime.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    pending: Option<CancellationToken>,
}

impl DebounceTimer {
    /// Create an idle timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fire` after `delay`, cancelling any previously scheduled callback.
    pub fn schedule<F>(&mut self, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    cancel.cancel();
                    fire();
                }
            }
        });
        self.pending = Some(token);
    }

    /// Discard the pending callback, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// Check if a callback is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_discards_previous() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::new();

        for value in 1..=3 {
            let fired = Arc::clone(&fired);
            timer.schedule(Duration::from_millis(100), move || {
                fired.store(value, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let mut timer = DebounceTimer::new();
            let fired = Arc::clone(&fired);
            timer.schedule(Duration::from_millis(50), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
