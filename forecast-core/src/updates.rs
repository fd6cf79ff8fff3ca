use tokio::sync::watch;

/// Latest-value subscription over a [`watch`] channel.
///
/// The first call to [`Updates::next`] yields the value current at subscription
/// time; later calls wait for the next change. Intermediate values written
/// between two polls are coalesced into the most recent one.
#[derive(Debug)]
pub struct Updates<T> {
    rx: watch::Receiver<T>,
    primed: bool,
}

impl<T: Clone> Updates<T> {
    pub(crate) fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx, primed: false }
    }

    /// Next snapshot, or `None` once the producer is gone.
    ///
    /// Cancel safe: dropping the future loses no update.
    pub async fn next(&mut self) -> Option<T> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Value most recently published, without waiting.
    pub fn latest(&self) -> T {
        self.rx.borrow().clone()
    }
}
