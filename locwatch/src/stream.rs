//! Replay-latest status streams.
//!
//! Both public streams — permission status and location status — are
//! broadcast with replay-latest semantics: a new subscriber immediately
//! receives the current value, then every subsequent transition in order.
//! [`Subject`] is the explicit reference-counted subject behind them: it
//! fans each published value out to per-subscriber unbounded channels and
//! remembers the latest value for replay. Dead subscribers are pruned on
//! the next publish.
//!
//! The `Unknown` variants are initial-only machine states and are never
//! published, so they are never observed through a stream.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::acquisition::LocationStatus;
use crate::coordinator::Command;
use crate::permission::PermissionStatus;

/// Broadcast container with replay-latest semantics.
pub(crate) struct Subject<T> {
    inner: Arc<Mutex<SubjectInner<T>>>,
}

struct SubjectInner<T> {
    latest: Option<T>,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Subject<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SubjectInner {
                latest: None,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Publish a value to all live subscribers and remember it for replay.
    pub(crate) fn publish(&self, value: T) {
        let mut inner = self.inner.lock();
        inner.latest = Some(value.clone());
        inner
            .subscribers
            .retain(|tx| tx.send(value.clone()).is_ok());
    }

    /// Subscribe, receiving the latest value (if any) immediately.
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        if let Some(latest) = &inner.latest {
            // Receiver is in hand, the send cannot fail here.
            let _ = tx.send(latest.clone());
        }
        inner.subscribers.push(tx);
        rx
    }

    /// The most recently published value, if any.
    pub(crate) fn latest(&self) -> Option<T> {
        self.inner.lock().latest.clone()
    }
}

/// One observer's registration on the location stream.
///
/// Dropping the guard unsubscribes; destroying the last one deactivates
/// the acquisition machine.
pub(crate) struct SubscriptionGuard {
    id: u64,
    commands: mpsc::UnboundedSender<Command>,
}

impl SubscriptionGuard {
    pub(crate) fn new(id: u64, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { id, commands }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        // After shutdown there is nothing left to unsubscribe from.
        let _ = self.commands.send(Command::Unsubscribe { id: self.id });
    }
}

/// Stream of [`PermissionStatus`] transitions.
///
/// Replay-latest: the current status (if one was ever emitted) is
/// delivered first. Observing this stream does not activate acquisition.
pub struct PermissionUpdates {
    rx: mpsc::UnboundedReceiver<PermissionStatus>,
    subject: Subject<PermissionStatus>,
}

impl PermissionUpdates {
    pub(crate) fn new(subject: Subject<PermissionStatus>) -> Self {
        Self {
            rx: subject.subscribe(),
            subject,
        }
    }

    /// The most recent permission status, or `None` before the first
    /// evaluation.
    pub fn current(&self) -> Option<PermissionStatus> {
        self.subject.latest()
    }

    /// Wait for the next status. Returns `None` once the facade has shut
    /// down and all buffered transitions are drained.
    pub async fn recv(&mut self) -> Option<PermissionStatus> {
        self.rx.recv().await
    }
}

/// Stream of [`LocationStatus`] transitions.
///
/// Holding this stream is what keeps acquisition active: the first live
/// stream activates the machine, and dropping the last one cancels the
/// platform registration.
pub struct LocationUpdates {
    rx: mpsc::UnboundedReceiver<LocationStatus>,
    subject: Subject<LocationStatus>,
    _guard: SubscriptionGuard,
}

impl LocationUpdates {
    pub(crate) fn new(subject: Subject<LocationStatus>, guard: SubscriptionGuard) -> Self {
        Self {
            rx: subject.subscribe(),
            subject,
            _guard: guard,
        }
    }

    /// The most recent location status, or `None` before the first
    /// evaluation.
    pub fn current(&self) -> Option<LocationStatus> {
        self.subject.latest()
    }

    /// Wait for the next status. Returns `None` once the facade has shut
    /// down and all buffered transitions are drained.
    pub async fn recv(&mut self) -> Option<LocationStatus> {
        self.rx.recv().await
    }
}
