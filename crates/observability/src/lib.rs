//! Process-wide logging setup shared by every storefront binary and test harness.

pub mod format;
pub mod subscriber;

pub use format::{ENV_LOG_FORMAT, LogFormat};
pub use subscriber::{init, init_with};
