use std::sync::{Mutex, PoisonError};

use shopdesk_core::{AppError, AppResult};
use tokio::sync::oneshot;

type Waiters<T> = Vec<oneshot::Sender<AppResult<T>>>;

/// Coordinates one in-flight operation shared by every concurrent caller.
///
/// The first caller to join becomes the owner and runs the operation; later
/// callers queue until the owner settles. Waiters are released in the order
/// they joined and the slot is cleared in the same critical section, so a
/// caller arriving afterwards starts a new flight.
pub struct SingleFlight<T> {
    slot: Mutex<Option<Waiters<T>>>,
}

/// Role assigned to a caller joining a flight.
pub enum Flight<'a, T> {
    /// Runs the operation and must settle the guard.
    Owner(FlightGuard<'a, T>),
    /// Waits for the owner's outcome.
    Waiter(FlightWaiter<T>),
}

/// Ownership of the current flight.
///
/// Dropping an unsettled guard clears the slot; its waiters then observe an
/// abandoned flight instead of hanging.
pub struct FlightGuard<'a, T> {
    flight: &'a SingleFlight<T>,
    settled: bool,
}

/// Pending outcome of a flight owned by another caller.
pub struct FlightWaiter<T> {
    receiver: oneshot::Receiver<AppResult<T>>,
}

impl<T: Clone> SingleFlight<T> {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Joins the current flight, or starts one when idle.
    pub fn join(&self) -> Flight<'_, T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(waiters) => {
                let (sender, receiver) = oneshot::channel();
                waiters.push(sender);
                Flight::Waiter(FlightWaiter { receiver })
            }
            None => {
                *slot = Some(Vec::new());
                Flight::Owner(FlightGuard {
                    flight: self,
                    settled: false,
                })
            }
        }
    }

    /// Returns whether a flight is running.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn take_waiters(&self) -> Waiters<T> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default()
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FlightGuard<'_, T> {
    /// Publishes the outcome to every waiter and ends the flight.
    pub fn settle(mut self, outcome: AppResult<T>) {
        self.settled = true;
        for waiter in self.flight.take_waiters() {
            // A waiter that stopped listening has nothing to release.
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl<T> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            self.flight
                .slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
        }
    }
}

impl<T> FlightWaiter<T> {
    /// Waits for the owner's outcome.
    pub async fn outcome(self) -> AppResult<T> {
        self.receiver.await.unwrap_or_else(|_| {
            Err(AppError::Unauthorized(
                "token refresh was abandoned".to_owned(),
            ))
        })
    }
}
