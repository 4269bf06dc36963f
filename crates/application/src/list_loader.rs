use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use shopdesk_core::{AppError, AppResult};
use tracing::debug;

/// Result of one sequenced fetch.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    /// The fetch was the latest issued and its value is now current.
    Applied(T),
    /// The fetch was the latest issued and failed; the current value is untouched.
    Failed(AppError),
    /// A newer fetch was issued meanwhile; this result was discarded.
    Superseded,
}

/// Holds the state of one list view and discards stale fetch results.
///
/// Every fetch takes a ticket from a monotonically increasing counter. Only
/// the holder of the newest ticket may apply its result, so a slow earlier
/// fetch never overwrites a faster later one.
pub struct ListLoader<T> {
    issued: AtomicU64,
    current: Mutex<Option<T>>,
}

impl<T: Clone> ListLoader<T> {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    /// Returns the last applied value.
    #[must_use]
    pub fn current(&self) -> Option<T> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs `fetch` and applies its value unless a newer fetch started meanwhile.
    pub async fn load<F>(&self, fetch: F) -> LoadOutcome<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let result = fetch.await;

        let mut current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.issued.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "discarding superseded list result");
            return LoadOutcome::Superseded;
        }

        match result {
            Ok(value) => {
                *current = Some(value.clone());
                LoadOutcome::Applied(value)
            }
            Err(error) => LoadOutcome::Failed(error),
        }
    }
}

impl<T: Clone> Default for ListLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}
