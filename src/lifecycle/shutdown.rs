//! Shutdown coordination.

use tokio::sync::broadcast;

/// Broadcasts a single shutdown notice to every long-running task
/// (HTTP server, config watcher).
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        // No subscribers left means nothing is running; that is fine.
        let _ = self.tx.send(());
    }

    /// Tasks still subscribed.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Resolve once `trigger` has been called.
    pub async fn wait(mut rx: broadcast::Receiver<()>) {
        // A closed channel also means shutdown.
        let _ = rx.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let a = shutdown.subscribe();
        let b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), async {
            Shutdown::wait(a).await;
            Shutdown::wait(b).await;
        })
        .await
        .unwrap();
    }
}
