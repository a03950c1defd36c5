//! Expiry sweeper: removes sessions nobody has touched for a while.
//!
//! Runs on its own interval, independent of request handling. It works from
//! a snapshot and deletes through [`SessionStore::delete_if_idle`], so it
//! never waits on a per-session lock held by an in-flight request.

use chrono::{DateTime, Utc};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::sessions::SessionStore;

/// Delete every session idle for longer than `timeout` as of `now`.
///
/// Returns the number of sessions removed.
pub fn sweep_once(store: &SessionStore, timeout: Duration, now: DateTime<Utc>) -> usize {
    let timeout = chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::days(365));
    let cutoff = now - timeout;

    store
        .snapshot()
        .into_iter()
        .filter(|session| session.last_activity_at < cutoff)
        .filter(|session| store.delete_if_idle(&session.session_id, cutoff))
        .inspect(|session| {
            debug!(
                session_id = %session.session_id,
                stage = %session.stage,
                idle_ms = session.idle_ms(now),
                "Session expired"
            );
        })
        .count()
}

/// Start the sweeper background loop.
///
/// The first sweep happens one `period` after start. A failing tick is
/// logged and the loop carries on.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    period: Duration,
    timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(
        period_secs = period.as_secs(),
        timeout_secs = timeout.as_secs(),
        "Session sweeper started"
    );
    spawn_ticks(store, period, move |store| sweep_once(store, timeout, Utc::now()))
}

/// Run `sweep` every `period`, isolating each tick from panics.
fn spawn_ticks<F>(store: Arc<SessionStore>, period: Duration, mut sweep: F) -> tokio::task::JoinHandle<()>
where
    F: FnMut(&SessionStore) -> usize + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; skip that one
        interval.tick().await;

        loop {
            interval.tick().await;

            let tick = std::panic::catch_unwind(AssertUnwindSafe(|| {
                let removed = sweep(store.as_ref());
                let pruned = store.prune_idle_locks();
                (removed, pruned)
            }));

            match tick {
                Ok((0, pruned)) => {
                    debug!(live = store.len(), pruned_locks = pruned, "Sweep found nothing to expire");
                }
                Ok((removed, pruned)) => {
                    info!(removed, live = store.len(), pruned_locks = pruned, "Expired idle sessions");
                }
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".into());
                    error!(reason = %reason, "Session sweep failed");
                }
            }
        }
    })
}
