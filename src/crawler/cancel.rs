//! External cancellation for a running crawl

use tokio::sync::watch;

/// Create a connected trigger/signal pair
pub fn cancel_pair() -> (CancelTrigger, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (CancelTrigger(sender), CancelSignal(receiver))
}

/// Owner side: requests cancellation of every crawl holding a matching signal
#[derive(Debug)]
pub struct CancelTrigger(watch::Sender<bool>);

impl CancelTrigger {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Observer side, handed to the crawl
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (sender, receiver) = watch::channel(false);
        // Keeping the receiver alone means `cancelled()` pends forever
        drop(sender);
        Self(receiver)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the trigger
    /// was dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.0.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
