//! Notifier for headless runs. Writes notices to tracing output.

use shopdesk_application::{Notice, NoticeLevel, Notifier};
use tracing::{info, warn};

/// Notifier that logs every notice.
#[derive(Clone)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates a new tracing notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!(level = notice.level.as_str(), "{}", notice.message),
            NoticeLevel::Error => warn!(level = notice.level.as_str(), "{}", notice.message),
        }
    }
}
