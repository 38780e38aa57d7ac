use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::{AccessToken, RefreshError};

/// The shared outcome of one refresh cycle
pub type RefreshOutcome = Result<AccessToken, RefreshError>;

/// Callers suspended until the in-flight refresh settles
///
/// The queue does no locking of its own. It lives inside the
/// [`RefreshCoordinator`][crate::RefreshCoordinator]'s state so that the
/// refreshing flag and the queue are always observed together.
#[derive(Debug, Default)]
pub struct PendingRequestQueue {
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

impl PendingRequestQueue {
    /// Constructs an empty queue
    pub const fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    /// Appends a waiter, returning the handle its caller awaits
    pub fn enqueue(&mut self) -> WaitForRefresh {
        let (tx, rx) = oneshot::channel();
        self.waiters.push_back(tx);
        WaitForRefresh { rx }
    }

    /// Fulfils every waiter with `outcome`, in arrival order
    ///
    /// The queue is emptied before any waiter is fulfilled, so a waiter is
    /// never fulfilled twice. Returns the number of waiters that were still
    /// listening.
    pub fn drain(&mut self, outcome: &RefreshOutcome) -> usize {
        let waiters = std::mem::take(&mut self.waiters);
        let total = waiters.len();

        let delivered = waiters
            .into_iter()
            .map(|tx| tx.send(outcome.clone()).is_ok())
            .filter(|&ok| ok)
            .count();

        if delivered < total {
            tracing::trace!(
                dropped = total - delivered,
                "some waiters stopped listening before the refresh settled"
            );
        }

        delivered
    }

    /// The number of suspended callers
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Whether no caller is suspended
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

/// A suspended caller's handle on the in-flight refresh
#[derive(Debug)]
#[must_use = "a waiter does nothing unless its outcome is awaited"]
pub struct WaitForRefresh {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl WaitForRefresh {
    /// Waits until the refresh settles
    ///
    /// If the queue is dropped without being drained, the refresh is
    /// reported as abandoned.
    pub async fn outcome(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }
}
