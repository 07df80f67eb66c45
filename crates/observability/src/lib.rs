//! Process-wide tracing setup for the account service.

/// Subscriber configuration (filter, output format).
pub mod subscriber;

pub use subscriber::{LogFormat, LogSettings};

/// Initialize process-wide tracing from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::install(&LogSettings::from_env());
}
