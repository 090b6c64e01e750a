//! Arrival-rate driver
//!
//! One scheduling loop wakes every [`TICK`], works out how many iterations
//! should have started by now and hands each one to the pool. An arrival
//! that finds every worker busy is dropped, never queued.

use super::{Dispatch, RampingArrivalRate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const TICK: Duration = Duration::from_millis(10);

pub(super) async fn drive(ramp: &RampingArrivalRate, dispatch: &Dispatch, tasks: &mut JoinSet<()>) {
    let schedule = &ramp.schedule;
    let total = schedule.total_duration();
    let pool = Arc::new(Semaphore::new(ramp.max_workers));
    let token = dispatch.shutdown.token();

    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let start = Instant::now();
    let mut dispatched = 0u64;
    let mut current_stage = None;
    let mut beyond_pre_allocated = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = token.cancelled() => break,
        }

        let elapsed = start.elapsed().min(total);

        let stage = schedule.stage_at(elapsed);
        if stage != current_stage {
            if let Some(index) = stage {
                info!(
                    stage = index + 1,
                    of = schedule.stages().len(),
                    target = schedule.stages()[index].target,
                    "Entering ramp stage"
                );
            }
            current_stage = stage;
        }

        // Epsilon keeps whole counts like 374.99999... from losing an arrival
        let due = (schedule.cumulative_arrivals(elapsed) + 1e-9).floor() as u64;
        while dispatched < due {
            dispatched += 1;
            match pool.clone().try_acquire_owned() {
                Ok(permit) => {
                    let dispatch = dispatch.clone();
                    tasks.spawn(async move {
                        let _slot = permit;
                        dispatch.run_one().await;
                    });

                    let busy = ramp.max_workers - pool.available_permits();
                    if busy > ramp.pre_allocated && !beyond_pre_allocated {
                        beyond_pre_allocated = true;
                        info!(
                            busy,
                            pre_allocated = ramp.pre_allocated,
                            "Pool grew beyond its pre-allocated workers"
                        );
                    }
                }
                Err(_) => {
                    dispatch.record_drop();
                    debug!(elapsed = ?elapsed, "Pool saturated, dropped arrival");
                }
            }
        }

        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                if e.is_panic() {
                    warn!("Iteration task panicked: {}", e);
                }
            }
        }

        if elapsed >= total {
            break;
        }
    }
}
