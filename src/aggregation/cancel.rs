//! Cancellation for in-flight lookups.
//!
//! A [`Cancellation`] fires either when its [`CancelHandle`] is triggered or
//! when its deadline passes, whichever comes first. Every lookup task holds a
//! clone and `select!`s on [`Cancellation::cancelled`] alongside its I/O.

use std::future::pending;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Triggers every [`Cancellation`] created from it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // send_replace stores the value even with no receiver alive.
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A cancellation that never fires.
    #[cfg(test)]
    pub fn never() -> Self {
        Self::default()
    }

    /// A manually triggered cancellation and its trigger.
    pub fn manual() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx },
            Self {
                rx: Some(rx),
                deadline: None,
            },
        )
    }

    /// Also fire once `timeout` has elapsed from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn is_cancelled(&self) -> bool {
        let triggered = self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false);
        let expired = self.deadline.map(|d| Instant::now() >= d).unwrap_or(false);
        triggered || expired
    }

    /// Resolves once cancellation fires. Pending forever if it never does.
    pub async fn cancelled(&mut self) {
        let deadline = self.deadline;

        let triggered = async {
            match self.rx.as_mut() {
                Some(rx) => {
                    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                    if closed {
                        // Handle dropped without cancelling.
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };

        let expired = async {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = triggered => {}
            _ = expired => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_cancels_all_clones() {
        let (handle, cancel) = Cancellation::manual();
        let mut first = cancel.clone();
        let mut second = cancel.clone();
        assert!(!cancel.is_cancelled());

        handle.cancel();

        first.cancelled().await;
        second.cancelled().await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_before_wait_is_seen() {
        let (handle, mut cancel) = Cancellation::manual();
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), cancel.cancelled())
            .await
            .expect("cancellation should already be visible");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let mut cancel = Cancellation::never().with_timeout(Duration::from_secs(5));
        assert!(!cancel.is_cancelled());

        cancel.cancelled().await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_fire() {
        let mut cancel = Cancellation::never();
        let result = tokio::time::timeout(Duration::from_secs(60), cancel.cancelled()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_does_not_fire() {
        let (handle, mut cancel) = Cancellation::manual();
        drop(handle);
        let result = tokio::time::timeout(Duration::from_secs(60), cancel.cancelled()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_earliest_deadline_kept() {
        let cancel = Cancellation::never()
            .with_timeout(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(100));
        let deadline = cancel.deadline.unwrap();
        assert!(deadline <= Instant::now() + Duration::from_secs(1));
    }
}
