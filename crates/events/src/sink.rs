//! Notification delivery (mechanics only).
//!
//! A [`NotificationSink`] is fire-and-forget: delivery failures are the sink's
//! problem and are never reported back to the domain operation that produced
//! the notice.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::notice::{Notice, Severity};

/// Receives user-facing notices.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

impl<S> NotificationSink for Arc<S>
where
    S: NotificationSink + ?Sized,
{
    fn notify(&self, notice: Notice) {
        (**self).notify(notice)
    }
}

/// Discards every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _notice: Notice) {}
}

/// Writes notices to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info => tracing::info!(
                title = %notice.title,
                description = notice.description.as_deref().unwrap_or_default(),
                "notice"
            ),
            Severity::Destructive => tracing::warn!(
                title = %notice.title,
                description = notice.description.as_deref().unwrap_or_default(),
                "notice"
            ),
        }
    }
}

/// A subscription to a [`ChannelSink`].
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<Notice>,
}

impl Subscription {
    /// Try to receive a notice without blocking.
    pub fn try_recv(&self) -> Option<Notice> {
        self.receiver.try_recv().ok()
    }

    /// Block for up to `timeout` waiting for a notice.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Notice> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Everything delivered so far, in delivery order.
    pub fn drain(&self) -> Vec<Notice> {
        self.receiver.try_iter().collect()
    }
}

/// In-process fan-out sink.
///
/// Every subscriber gets a copy of every notice published after it
/// subscribed. Subscribers that were dropped are pruned on the next publish.
#[derive(Debug, Default)]
pub struct ChannelSink {
    subscribers: Mutex<Vec<Sender<Notice>>>,
}

impl ChannelSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock yields a subscription that never receives anything.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription { receiver: rx }
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notice: Notice) {
        let Ok(mut subs) = self.subscribers.lock() else {
            tracing::warn!("notification sink lock poisoned; dropping notice");
            return;
        };
        subs.retain(|tx| tx.send(notice.clone()).is_ok());
    }
}
