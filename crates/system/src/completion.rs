//! One-shot bridge from an externally delivered completion to an awaitable
//!
//! The system reports the outcome of a session commit or an uninstall by
//! invoking a callback at some later point, possibly from another process
//! and possibly never. [`CompletionBridge::open`] hands out a cloneable
//! [`CompletionSender`] to register as that callback and a
//! [`CompletionAwaiter`] for the operation waiting on it.
//!
//! Exactly one terminal delivery is accepted per bridge; later deliveries
//! are ignored and reported as rejected. The await is bounded by a timeout
//! and a cancellation token, so a callback that never fires cannot pin the
//! caller forever.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Request for the foreground to show a confirmation the system is waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationIntent {
    pub session_id: Option<i32>,
    /// Opaque action the foreground needs to start (intent URI, activity name)
    pub action: String,
}

/// What the system reports through a [`CompletionSender`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStatus {
    Success,
    Failure { message: Option<String> },
    /// Not terminal: the operation continues once the user confirms
    PendingUserAction(ConfirmationIntent),
}

/// The accepted terminal delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub success: bool,
    pub message: Option<String>,
}

/// How a wait on the bridge ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Delivered(Delivery),
    TimedOut,
    Cancelled,
    /// Every sender was dropped without delivering
    Dropped,
}

type Slot = Arc<Mutex<Option<oneshot::Sender<Delivery>>>>;

/// Callback half of the bridge; safe to clone and invoke from any thread
#[derive(Debug, Clone)]
pub struct CompletionSender {
    slot: Slot,
    confirmations: Option<mpsc::UnboundedSender<ConfirmationIntent>>,
}

impl CompletionSender {
    /// Deliver a status.
    ///
    /// Returns `true` when a terminal status was accepted, or when a pending
    /// user action was forwarded to the confirmation channel.
    pub fn deliver(&self, status: CompletionStatus) -> bool {
        match status {
            CompletionStatus::Success => self.finish(Delivery {
                success: true,
                message: None,
            }),
            CompletionStatus::Failure { message } => self.finish(Delivery {
                success: false,
                message,
            }),
            CompletionStatus::PendingUserAction(intent) => self
                .confirmations
                .as_ref()
                .is_some_and(|tx| tx.send(intent).is_ok()),
        }
    }

    /// Whether a terminal status has already been taken
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn finish(&self, delivery: Delivery) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(tx) => tx.send(delivery).is_ok(),
            None => false,
        }
    }
}

/// Waiting half of the bridge; consumed by [`CompletionAwaiter::wait`]
#[derive(Debug)]
pub struct CompletionAwaiter {
    rx: oneshot::Receiver<Delivery>,
}

impl CompletionAwaiter {
    /// Wait for the terminal delivery, the timeout, or cancellation,
    /// whichever comes first.
    ///
    /// A delivery that already arrived always wins over cancellation.
    pub async fn wait(self, timeout: Duration, cancel: &CancellationToken) -> Completion {
        let mut rx = self.rx;
        match rx.try_recv() {
            Ok(delivery) => return Completion::Delivered(delivery),
            Err(TryRecvError::Closed) => return Completion::Dropped,
            Err(TryRecvError::Empty) => {}
        }
        tokio::select! {
            biased;
            res = tokio::time::timeout(timeout, &mut rx) => match res {
                Ok(Ok(delivery)) => Completion::Delivered(delivery),
                Ok(Err(_)) => Completion::Dropped,
                Err(_) => Completion::TimedOut,
            },
            () = cancel.cancelled() => Completion::Cancelled,
        }
    }
}

/// Constructor namespace for sender/awaiter pairs
pub struct CompletionBridge;

impl CompletionBridge {
    /// Open a bridge whose pending-user-action reports are discarded
    #[must_use]
    pub fn open() -> (CompletionSender, CompletionAwaiter) {
        Self::open_with_confirmations(None)
    }

    /// Open a bridge that forwards pending-user-action reports to `confirmations`
    #[must_use]
    pub fn open_with_confirmations(
        confirmations: Option<mpsc::UnboundedSender<ConfirmationIntent>>,
    ) -> (CompletionSender, CompletionAwaiter) {
        let (tx, rx) = oneshot::channel();
        (
            CompletionSender {
                slot: Arc::new(Mutex::new(Some(tx))),
                confirmations,
            },
            CompletionAwaiter { rx },
        )
    }
}
