//! Single-flight token refresh
//!
//! The first caller to hit an expired token becomes the leader and performs
//! the refresh; everyone arriving while it is in flight is queued and gets
//! the leader's outcome, in arrival order, the moment it settles.
//!
//! The flag and the queue share one lock that is only ever held in
//! synchronous code, never across an await, so a single refresh runs per
//! round on any executor. Waiters are released in arrival order; on a
//! single-threaded executor (wasm, tokio `current_thread`) they also resume
//! in that order. On a multi-threaded runtime the woken callers run in
//! parallel and their replays may interleave.

use crate::client::error::RefreshError;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

type Outcome = Result<String, RefreshError>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<Outcome>>,
}

/// Serializes concurrent refresh attempts behind one network call
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

enum Ticket<'a> {
    Leader(LeaderGuard<'a>),
    Follower(oneshot::Receiver<Outcome>),
}

/// Held by the leader; settles the queue even if the leader is dropped
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self, outcome: &Outcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(&Err(RefreshError::Abandoned));
        }
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `refresh` unless a refresh is already in flight, in which case
    /// wait for that one instead
    ///
    /// Every caller receives the same outcome: the new access token, or the
    /// error the leader's refresh failed with.
    pub async fn run<F, Fut>(&self, refresh: F) -> Result<String, RefreshError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, RefreshError>>,
    {
        match self.enter() {
            Ticket::Leader(guard) => {
                tracing::debug!("Starting token refresh");
                let outcome = refresh().await;
                guard.settle(&outcome);
                outcome
            }
            Ticket::Follower(receiver) => {
                tracing::debug!("Token refresh in flight; queued");
                receiver.await.unwrap_or(Err(RefreshError::Abandoned))
            }
        }
    }

    /// Whether a refresh is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    /// Number of callers waiting on the in-flight refresh
    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    fn enter(&self) -> Ticket<'_> {
        let mut state = self.lock();
        if state.in_flight {
            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            Ticket::Follower(receiver)
        } else {
            state.in_flight = true;
            Ticket::Leader(LeaderGuard {
                coordinator: self,
                settled: false,
            })
        }
    }

    fn settle(&self, outcome: &Outcome) {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        match outcome {
            Ok(_) => tracing::debug!(waiters = waiters.len(), "Token refresh settled"),
            Err(e) => tracing::debug!(waiters = waiters.len(), error = %e, "Token refresh failed"),
        }

        for waiter in waiters {
            // A waiter whose caller went away has nobody left to tell
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("RefreshCoordinator")
            .field("in_flight", &state.in_flight)
            .field("pending", &state.waiters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn single_caller_runs_refresh() {
        let coordinator = RefreshCoordinator::new();
        let token = coordinator.run(|| async { Ok("A2".to_string()) }).await;

        assert_eq!(token.unwrap(), "A2");
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());

        let mut handles = Vec::new();
        for _ in 0..5 {
            let coordinator = coordinator.clone();
            let calls = calls.clone();
            let release = release.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .run(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        release.notified().await;
                        Ok("A2".to_string())
                    })
                    .await
            }));
        }

        while coordinator.pending() < 4 {
            tokio::task::yield_now().await;
        }
        assert!(coordinator.is_refreshing());
        release.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "A2");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test]
    async fn failure_is_delivered_to_every_waiter() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let release = Arc::new(Notify::new());

        let leader = {
            let coordinator = coordinator.clone();
            let release = release.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| async move {
                        release.notified().await;
                        Err(RefreshError::Rejected {
                            status: 401,
                            message: "expired".into(),
                        })
                    })
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }

        let follower = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| async { Err(RefreshError::Abandoned) })
                    .await
            })
        };
        while coordinator.pending() < 1 {
            tokio::task::yield_now().await;
        }
        release.notify_one();

        let expected = RefreshError::Rejected {
            status: 401,
            message: "expired".into(),
        };
        assert_eq!(leader.await.unwrap(), Err(expected.clone()));
        assert_eq!(follower.await.unwrap(), Err(expected));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn dropped_leader_releases_waiters() {
        let coordinator = Arc::new(RefreshCoordinator::new());

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| std::future::pending::<Result<String, RefreshError>>())
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }

        let follower = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.run(|| async { Ok("unused".into()) }).await })
        };
        while coordinator.pending() < 1 {
            tokio::task::yield_now().await;
        }

        leader.abort();
        assert_eq!(follower.await.unwrap(), Err(RefreshError::Abandoned));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn waiters_are_released_in_arrival_order() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let release = Arc::new(Notify::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let leader = {
            let coordinator = coordinator.clone();
            let release = release.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| async move {
                        release.notified().await;
                        Ok("A2".to_string())
                    })
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }

        let mut followers = Vec::new();
        for id in 0..4 {
            let follower_coordinator = coordinator.clone();
            let order = order.clone();
            followers.push(tokio::spawn(async move {
                let token = follower_coordinator.run(|| async { Ok("unused".into()) }).await;
                order.lock().unwrap().push(id);
                token
            }));
            // Each follower must be queued before the next one is spawned
            while coordinator.pending() < id + 1 {
                tokio::task::yield_now().await;
            }
        }

        release.notify_one();
        leader.await.unwrap().unwrap();
        for follower in followers {
            assert_eq!(follower.await.unwrap().unwrap(), "A2");
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }
}
