//! Cross-thread writes into a single-threaded cell.
//!
//! Cells and the registry are `!Send`. Worker threads instead hold a
//! [`RemoteSetter`], which queues values on an unbounded tokio channel. The
//! owning thread drains the queue with a [`RemoteApplier`], which applies each
//! value through [`Observable::set`], so every post still happens on the
//! owning thread and in send order.

use std::fmt;

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use super::cell::Observable;
use crate::key::Key;

// ---------------------------------------------------------------------------
// SendError
// ---------------------------------------------------------------------------

/// The receiving side of a remote queue is gone. Hands the value back.
pub struct SendError<T> {
    pub key: Key,
    pub value: T,
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote queue for key {} is closed", self.key)
    }
}

impl<T> std::error::Error for SendError<T> {}

// ---------------------------------------------------------------------------
// RemoteSetter
// ---------------------------------------------------------------------------

/// `Send` handle that queues writes for a cell living on another thread.
pub struct RemoteSetter<T> {
    key: Key,
    tx: UnboundedSender<T>,
}

impl<T> Clone for RemoteSetter<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<T> fmt::Debug for RemoteSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSetter")
            .field("key", &self.key)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<T> RemoteSetter<T> {
    /// Queue `value` for the owning thread.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        self.tx.send(value).map_err(|err| SendError {
            key: self.key.clone(),
            value: err.0,
        })
    }

    /// The key of the target cell.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Whether the applier has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// RemoteApplier
// ---------------------------------------------------------------------------

/// Owning-thread end of a remote queue, bound to one cell.
pub struct RemoteApplier<T: 'static> {
    cell: Observable<T>,
    rx: UnboundedReceiver<T>,
}

impl<T: 'static> fmt::Debug for RemoteApplier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteApplier")
            .field("key", self.cell.key())
            .finish_non_exhaustive()
    }
}

impl<T: 'static> RemoteApplier<T> {
    /// Apply every value queued so far without waiting.
    ///
    /// Returns how many values were applied (posted or not, per the cell's
    /// policy).
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(value) => {
                    self.cell.set(value);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if applied > 0 {
            tracing::debug!(message = "remote.apply", key = %self.cell.key(), applied);
        }
        applied
    }

    /// Wait for the next queued value and apply it.
    ///
    /// Returns `None` once every setter is gone and the queue is empty,
    /// otherwise whether the write posted.
    pub async fn apply_next(&mut self) -> Option<bool> {
        let value = self.rx.recv().await?;
        Some(self.cell.set(value))
    }

    /// The cell values are applied to.
    pub fn cell(&self) -> &Observable<T> {
        &self.cell
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Open a queue through which other threads can write this cell.
    pub fn remote(&self) -> (RemoteSetter<T>, RemoteApplier<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            RemoteSetter {
                key: self.key().clone(),
                tx,
            },
            RemoteApplier {
                cell: self.clone(),
                rx,
            },
        )
    }
}

// ===========================================================================
// Tests
// ===========================================================================
