//! Single-use hand-off for a search's terminal outcome

use tokio::sync::oneshot;

/// Write half, consumed by the one write it allows
pub struct SlotWriter<T>(oneshot::Sender<T>);

/// Read half, consumed by the one read it allows
pub struct SlotReader<T>(oneshot::Receiver<T>);

/// Create the slot for one search cycle
pub fn result_slot<T>() -> (SlotWriter<T>, SlotReader<T>) {
    let (tx, rx) = oneshot::channel();
    (SlotWriter(tx), SlotReader(rx))
}

impl<T> SlotWriter<T> {
    /// Deliver the value. Returns false if the reader is already gone.
    pub fn fill(self, value: T) -> bool {
        self.0.send(value).is_ok()
    }
}

impl<T> SlotReader<T> {
    /// Wait for the value; `None` if the writer was dropped without filling
    pub async fn wait(self) -> Option<T> {
        self.0.await.ok()
    }
}
