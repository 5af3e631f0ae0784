// Kernel shutdown channel
// One sender, any number of socket loops waiting on their own token

use tokio::sync::watch;

/// Shutdown signal observed by each socket loop
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the shutdown signal; returns at once if it was already sent
    pub async fn wait(&mut self) {
        // Err means every sender is gone, which also ends the kernel
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Shutdown sender
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to all socket loops
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }

    /// New token for a loop started after the channel was created
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_after_shutdown_returns_immediately() {
        let (tx, mut token) = shutdown_channel();
        tx.shutdown();

        tokio_test::assert_ok!(tokio::time::timeout(Duration::from_secs(1), token.wait()).await);
        assert!(token.is_shutdown());
    }

    #[tokio::test]
    async fn test_subscribed_token_sees_shutdown() {
        let (tx, _token) = shutdown_channel();
        let mut late = tx.token();
        assert!(!late.is_shutdown());

        let waiter = tokio::spawn(async move { late.wait().await });
        tx.shutdown();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
