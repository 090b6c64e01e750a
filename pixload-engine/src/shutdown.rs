//! Run-level stop coordination
//!
//! A [`ShutdownCoordinator`] is shared by the load controller, every worker
//! and whoever listens for an external stop signal. Cancelling it stops new
//! iterations from starting; iterations already running are tracked through
//! [`InFlightGuard`] so the controller knows how many are active.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    in_flight: Arc<AtomicUsize>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop scheduling new iterations
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!(in_flight = self.in_flight(), "Stop requested, letting in-flight iterations finish");
        }
        self.token.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once [`shutdown`](Self::shutdown) has been called
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Mark one iteration as running until the guard is dropped
    pub fn track(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            counter: self.in_flight.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count on drop, including when the task is aborted
#[derive(Debug)]
pub struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
