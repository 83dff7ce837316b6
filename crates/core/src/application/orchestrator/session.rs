// Session handle and cooperative cancellation

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::SessionSummary;
use crate::error::SessionError;

/// Cancellation signal observed by a running session
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested
    ///
    /// Never resolves if the sender is dropped without cancelling: a detached
    /// session runs to completion.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Cancellation sender
pub struct CancelSender {
    tx: watch::Sender<bool>,
}

impl CancelSender {
    /// Signal cancellation to the session
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a cancellation channel
pub fn cancel_channel() -> (CancelSender, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelSender { tx }, CancelToken { rx })
}

/// Handle to a session running on its own task
///
/// Dropping the handle detaches the session; it still runs to DONE.
pub struct SessionHandle {
    session_id: String,
    cancel: CancelSender,
    join: JoinHandle<SessionSummary>,
}

impl SessionHandle {
    pub(crate) fn new(
        session_id: String,
        cancel: CancelSender,
        join: JoinHandle<SessionSummary>,
    ) -> Self {
        Self {
            session_id,
            cancel,
            join,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Request cooperative cancellation; the session still emits DONE
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the session to finish
    ///
    /// # Errors
    /// - SessionError::Panicked if the session task panicked
    /// - SessionError::Aborted if the task was aborted by the runtime
    pub async fn wait(self) -> Result<SessionSummary, SessionError> {
        match self.join.await {
            Ok(summary) => Ok(summary),
            Err(join_err) if join_err.is_panic() => {
                let panic_info = join_err.into_panic();
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                Err(SessionError::Panicked(panic_msg))
            }
            Err(_) => Err(SessionError::Aborted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (tx, token) = cancel_channel();
        assert!(!token.is_cancelled());

        let waiter = tokio::spawn({
            let token = token.clone();
            async move { token.cancelled().await }
        });
        tx.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_sender_never_cancels() {
        let (tx, token) = cancel_channel();
        drop(tx);

        let result = tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(result.is_err());
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_reports_panic() {
        let (tx, _token) = cancel_channel();
        let join = tokio::spawn(async {
            if true {
                panic!("probe exploded");
            }
            SessionSummary::new("s")
        });
        let handle = SessionHandle::new("s".to_string(), tx, join);

        match handle.wait().await {
            Err(SessionError::Panicked(msg)) => assert_eq!(msg, "probe exploded"),
            other => panic!("unexpected: {:?}", other.map(|s| s.session_id)),
        }
    }
}
