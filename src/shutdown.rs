use tokio::sync::watch;

/// Cooperative cancellation for in-flight cycle stages.
#[derive(Clone)]
pub struct Cancel {
    rx: watch::Receiver<bool>,
}

pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancel_pair() -> (CancelHandle, Cancel) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, Cancel { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Cancel {
    /// A signal that never fires.
    #[cfg(test)]
    pub fn never() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever if the handle is dropped first.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|c| *c).await.map(|_| ()).is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn fires_after_cancel() {
        let (handle, cancel) = cancel_pair();
        assert!(!cancel.is_cancelled());
        handle.cancel();
        assert!(cancel.is_cancelled());
        tokio::time::timeout(Duration::from_millis(100), cancel.cancelled())
            .await
            .expect("cancelled() should resolve");
    }

    #[tokio::test]
    async fn never_does_not_fire() {
        let cancel = Cancel::never();
        let res = tokio::time::timeout(Duration::from_millis(50), cancel.cancelled()).await;
        assert!(res.is_err());
        assert!(!cancel.is_cancelled());
    }
}
