//! Single-flight coordination for token refresh.
//!
//! When a burst of requests all come back 401, only the first caller (the
//! leader) talks to `/auth/refresh`. Everyone else parks a oneshot sender in
//! the wait list and receives the leader's outcome, so N concurrent failures
//! cost exactly one refresh.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

/// Why a refresh attempt did not produce a new access token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// No live refresh token was on file.
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// The API refused the refresh token.
    #[error("refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The refresh request failed in transit or returned garbage.
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// The new tokens could not be persisted.
    #[error("could not store refreshed tokens: {0}")]
    Storage(String),

    /// The task performing the refresh was dropped before finishing.
    #[error("refresh was abandoned before completing")]
    Abandoned,
}

pub(crate) type RefreshOutcome = Result<SecretString, RefreshError>;

#[derive(Default)]
struct FlightState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Coalesces concurrent refresh attempts into one in-flight call.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    state: Mutex<FlightState>,
}

impl RefreshCoordinator {
    fn state(&self) -> MutexGuard<'_, FlightState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `refresh` unless one is already in flight, in which case wait for
    /// that one's outcome instead. `refresh` is never polled by waiters.
    pub(crate) async fn run<F>(&self, refresh: F) -> RefreshOutcome
    where
        F: Future<Output = RefreshOutcome>,
    {
        let waiter = {
            let mut state = self.state();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = waiter {
            debug!("refresh already in flight, waiting for its result");
            return rx.await.unwrap_or(Err(RefreshError::Abandoned));
        }

        let mut flight = Flight {
            coordinator: self,
            settled: false,
        };
        let outcome = refresh.await;
        flight.settle(&outcome);
        outcome
    }

    /// Number of callers currently parked behind an in-flight refresh.
    #[cfg(test)]
    pub(crate) fn waiting(&self) -> usize {
        self.state().waiters.len()
    }
}

/// Leader-side handle that always releases the wait list, even when the
/// leader's future is dropped mid-refresh.
struct Flight<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl Flight<'_> {
    fn settle(&mut self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.coordinator.state();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        self.settled = true;

        debug!(waiters = waiters.len(), ok = outcome.is_ok(), "releasing refresh waiters");
        for waiter in waiters {
            // A waiter that gave up has dropped its receiver; nothing to do
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(&Err(RefreshError::Abandoned));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use secrecy::ExposeSecret;

    use super::*;

    async fn slow_refresh(calls: Arc<AtomicUsize>, token: &'static str) -> RefreshOutcome {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(SecretString::from(token))
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let coordinator = Arc::new(RefreshCoordinator::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    coordinator
                        .run(slow_refresh(calls, "fresh-token"))
                        .await
                        .map(|token| token.expose_secret().to_string())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "fresh-token");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.waiting(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_broadcast_to_waiters() {
        let coordinator = Arc::new(RefreshCoordinator::default());

        let leader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .run(async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err(RefreshError::Rejected {
                            status: 401,
                            message: "refresh token revoked".to_string(),
                        })
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let waiter = coordinator
            .run(async { Ok(SecretString::from("never used")) })
            .await;

        assert!(matches!(waiter, Err(RefreshError::Rejected { status: 401, .. })));
        assert!(leader.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_abandoned_leader_releases_waiters() {
        let coordinator = Arc::new(RefreshCoordinator::default());

        let leader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .run(async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(SecretString::from("too late"))
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .run(async { Ok(SecretString::from("unused")) })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        leader.abort();
        let outcome = waiter.await.unwrap();
        assert_eq!(outcome.err(), Some(RefreshError::Abandoned));

        // The coordinator is usable again after the abandoned flight
        let next = coordinator.run(async { Ok(SecretString::from("again")) }).await;
        assert_eq!(next.unwrap().expose_secret(), "again");
    }
}
