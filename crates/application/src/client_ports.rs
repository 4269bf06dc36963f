use shopdesk_core::AppResult;

/// Persistent string key-value store backing the client namespaces.
///
/// Each write replaces a whole value; readers never observe partial writes.
pub trait KeyValueStore: Send + Sync {
    /// Reads the raw value stored under `key`.
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Replaces the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Removes `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> AppResult<()>;
}

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    /// Positive confirmation.
    Success,
    /// Failure or denial.
    Error,
}

impl NoticeLevel {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// User-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Notice severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notice {
    /// Creates a success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Creates an error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Port for surfacing notices to whoever drives the console.
pub trait Notifier: Send + Sync {
    /// Surfaces one notice.
    fn notify(&self, notice: Notice);
}
