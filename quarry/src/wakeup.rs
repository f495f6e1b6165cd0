//! Change notifications for hosts that render on demand.
//!
//! One channel can serve every session on a screen. A wakeup names the
//! session that changed; each session sends at most one wakeup per dirty
//! cycle (see [`SearchSession::clear_dirty`](crate::SearchSession::clear_dirty)),
//! so the queue never holds more entries than there are sessions.

use tokio::sync::mpsc;

use crate::session::SessionId;

/// Sender half, handed to sessions.
#[derive(Debug, Clone)]
pub struct WakeupSender {
    tx: mpsc::UnboundedSender<SessionId>,
}

impl WakeupSender {
    /// Report that `session` changed. A dropped receiver is ignored.
    pub(crate) fn wake(&self, session: SessionId) {
        let _ = self.tx.send(session);
    }
}

/// Receiver half, owned by the host event loop.
#[derive(Debug)]
pub struct WakeupReceiver {
    rx: mpsc::UnboundedReceiver<SessionId>,
}

impl WakeupReceiver {
    /// Wait for the next changed session.
    ///
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<SessionId> {
        self.rx.recv().await
    }

    /// Take every queued wakeup without waiting, in arrival order and
    /// without duplicates.
    pub fn drain(&mut self) -> Vec<SessionId> {
        let mut changed = Vec::new();
        while let Ok(session) = self.rx.try_recv() {
            if !changed.contains(&session) {
                changed.push(session);
            }
        }
        changed
    }
}

/// Create a wakeup channel.
pub fn channel() -> (WakeupSender, WakeupReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (WakeupSender { tx }, WakeupReceiver { rx })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::SearchSession;
    use crate::config::SearchConfig;
    use crate::option::options;
    use crate::resolver::OptionsSource;

    fn session(tx: &WakeupSender) -> SearchSession<()> {
        SearchSession::builder(OptionsSource::list(options(["Option 1"])))
            .config(SearchConfig::default().with_debounce_threshold(Duration::from_millis(10)))
            .wakeup(tx.clone())
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_wakeup_per_dirty_cycle() {
        let (tx, mut rx) = channel();
        let a = session(&tx);

        a.set_query("o");
        a.set_query("op");
        assert_eq!(rx.drain(), [a.id()]);

        // still dirty: settling adds nothing to the queue
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.drain().is_empty());

        a.clear_dirty();
        a.set_query("opt");
        assert_eq!(rx.drain(), [a.id()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_channel_names_sessions() {
        let (tx, mut rx) = channel();
        let a = session(&tx);
        let b = session(&tx);
        assert_ne!(a.id(), b.id());

        b.set_query("o");
        a.set_query("o");
        assert_eq!(rx.drain(), [b.id(), a.id()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_on_dirty_session_wakes() {
        let a: SearchSession<()> =
            SearchSession::new(OptionsSource::list(Vec::new()), SearchConfig::default());
        a.set_query("o");

        let (tx, mut rx) = channel();
        a.install_wakeup(tx);
        assert_eq!(rx.recv().await, Some(a.id()));
    }
}
