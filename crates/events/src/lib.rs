//! Domain events and user-facing notifications.
//!
//! Domain crates emit typed events; the owner of an aggregate turns the
//! interesting ones into [`Notice`]s and hands them to a [`NotificationSink`].
//! Presentation (toasts, alerts, log lines) lives behind the sink.

pub mod event;
pub mod notice;
pub mod sink;

pub use event::Event;
pub use notice::{Notice, Severity};
pub use sink::{ChannelSink, NotificationSink, NullSink, Subscription, TracingSink};
