//! Background expiry sweep
//!
//! Expiry is lazy unless something calls [`CacheStore::sweep_expired`]. This
//! module provides the opt-in loop that does so on a fixed interval:
//!
//! ```ignore
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let handle = tokio::spawn(expiry_sweep_task(store.clone(), Duration::from_secs(60), shutdown_rx));
//!
//! // Later
//! let _ = shutdown_tx.send(true);
//! let metrics = handle.await?;
//! ```

use crate::store::CacheStore;
use courier_core::{now_millis, CacheConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

// ============================================================================
// METRICS
// ============================================================================

/// Counters kept by the sweep loop.
#[derive(Debug, Default)]
pub struct SweepMetrics {
    /// Sweep cycles completed
    pub cycles: AtomicU64,

    /// Expired values removed since startup
    pub values_removed: AtomicU64,
}

impl SweepMetrics {
    pub fn snapshot(&self) -> SweepSnapshot {
        SweepSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            values_removed: self.values_removed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSnapshot {
    pub cycles: u64,
    pub values_removed: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Sweep expired values out of `store` every `period` until `shutdown_rx`
/// observes `true` or its sender is dropped.
///
/// The first sweep runs immediately. A zero `period` never sweeps.
pub async fn expiry_sweep_task(
    store: Arc<CacheStore>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<SweepMetrics> {
    let metrics = Arc::new(SweepMetrics::default());
    if period.is_zero() {
        tracing::warn!("Cache expiry sweep interval is zero, not sweeping");
        return metrics;
    }

    let mut sweep_interval = interval(period);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(interval = ?period, "Cache expiry sweep started");

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Cache expiry sweep shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                sweep_once(&store, &metrics);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        cycles = snapshot.cycles,
        values_removed = snapshot.values_removed,
        "Cache expiry sweep completed"
    );

    metrics
}

/// Spawn [`expiry_sweep_task`] when `config.sweep_interval` is set.
///
/// Returns `None`, and spawns nothing, while expiry is left lazy or the
/// interval is zero.
pub fn spawn_expiry_sweep(
    store: Arc<CacheStore>,
    config: &CacheConfig,
    shutdown_rx: watch::Receiver<bool>,
) -> Option<JoinHandle<Arc<SweepMetrics>>> {
    let period = config.sweep_interval?;
    if period.is_zero() {
        tracing::warn!("Cache expiry sweep interval is zero, leaving expiry lazy");
        return None;
    }
    Some(tokio::spawn(expiry_sweep_task(store, period, shutdown_rx)))
}

fn sweep_once(store: &CacheStore, metrics: &SweepMetrics) {
    metrics.cycles.fetch_add(1, Ordering::Relaxed);
    let removed = store.sweep_expired(now_millis());
    if removed > 0 {
        metrics
            .values_removed
            .fetch_add(u64::try_from(removed).unwrap_or(u64::MAX), Ordering::Relaxed);
        tracing::info!(removed, remaining_keys = store.size(), "Cache expiry sweep cycle completed");
    } else {
        tracing::trace!("Cache expiry sweep cycle found nothing to remove");
    }
}
