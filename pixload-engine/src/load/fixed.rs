//! Constant-concurrency driver

use super::{Dispatch, FixedPool};
use tokio::task::JoinSet;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::debug;

/// Spawn the workers and return once the duration elapses or a stop is requested
pub(super) async fn drive(pool: &FixedPool, dispatch: &Dispatch, tasks: &mut JoinSet<()>) {
    let deadline = Instant::now() + pool.duration;

    for worker in 0..pool.workers {
        let dispatch = dispatch.clone();
        let pacing = pool.pacing;
        tasks.spawn(async move {
            let token = dispatch.shutdown.token();
            let mut iterations = 0u64;
            loop {
                if Instant::now() >= deadline || token.is_cancelled() {
                    break;
                }
                dispatch.run_one().await;
                iterations += 1;

                tokio::select! {
                    _ = sleep(pacing) => {}
                    _ = sleep_until(deadline) => break,
                    _ = token.cancelled() => break,
                }
            }
            debug!(worker, iterations, "Worker stopped");
        });
    }

    tokio::select! {
        _ = sleep_until(deadline) => {}
        _ = dispatch.shutdown.cancelled() => {}
    }
}
