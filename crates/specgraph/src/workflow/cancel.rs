//! Caller-issued cancellation for batch operations.

use tokio::sync::watch;

/// Create a linked handle and signal.
///
/// The handle stays with the caller; the signal goes into the operation.
pub fn cancellation() -> (CancellationHandle, CancellationSignal) {
    let (tx, rx) = watch::channel(false);
    (CancellationHandle { tx }, CancellationSignal { rx })
}

/// Requests cancellation of the operations holding the matching signal.
#[derive(Debug)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

impl CancellationHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// A further signal linked to this handle.
    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Checked by batch operations between steps.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    rx: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// A signal that is never cancelled.
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    /// True once the handle has requested cancellation.
    ///
    /// Dropping the handle without calling
    /// [`cancel`](CancellationHandle::cancel) does not cancel.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::never()
    }
}
