//! Background save and eviction passes.
//!
//! Records are never saved from a destructor. Instead a task spawned by
//! [`spawn_maintenance`] saves dirty records on one interval and sweeps
//! unreferenced clean records on another, then performs a last save pass
//! when asked to shut down.

use std::sync::Arc;
use std::time::Duration;

use parcel_registry::{FlushReport, OwnerStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cell_cache::CellStore;
use crate::config::RegistryConfig;
use crate::service::ClaimService;

/// Shortest period accepted for either pass.
const MIN_PERIOD: Duration = Duration::from_millis(10);

/// Spawn the periodic save and sweep task.
///
/// The task runs until `shutdown` is set to `true` or its sender is
/// dropped. It then flushes once more and returns that final report.
pub fn spawn_maintenance<O: OwnerStore, C: CellStore>(
    service: Arc<ClaimService<O, C>>,
    config: &RegistryConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<FlushReport> {
    let flush_period = config.flush_interval().max(MIN_PERIOD);
    let sweep_period = config.sweep_interval().max(MIN_PERIOD);

    tokio::spawn(async move {
        let mut flush = tokio::time::interval(flush_period);
        let mut sweep = tokio::time::interval(sweep_period);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Both intervals fire immediately; nothing is dirty yet.
        flush.tick().await;
        sweep.tick().await;

        info!(
            flush_ms = flush_period.as_millis(),
            sweep_ms = sweep_period.as_millis(),
            "Maintenance task started"
        );

        loop {
            tokio::select! {
                _ = flush.tick() => {
                    let report = service.flush().await;
                    if report.failed > 0 {
                        warn!(failed = report.failed, saved = report.saved, "Save pass incomplete");
                    }
                }
                _ = sweep.tick() => {
                    let report = service.sweep().await;
                    debug!(
                        saved = report.saved,
                        failed = report.failed,
                        evicted = report.evicted,
                        "Sweep pass finished"
                    );
                    service.registry().log_stats();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let report = service.flush().await;
        info!(
            saved = report.saved,
            failed = report.failed,
            "Maintenance task stopped after final save"
        );
        report
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parcel_registry::MemoryOwnerStore;
    use parcel_types::{ActorId, ClaimantKey};

    use super::*;
    use crate::cell_cache::MemoryCellStore;
    use crate::config::ParcelConfig;

    fn service() -> (
        Arc<ClaimService<MemoryOwnerStore, MemoryCellStore>>,
        Arc<MemoryOwnerStore>,
    ) {
        let owners = Arc::new(MemoryOwnerStore::new());
        let service = ClaimService::new(
            Arc::clone(&owners),
            Arc::new(MemoryCellStore::new()),
            ParcelConfig::default(),
        );
        (Arc::new(service), owners)
    }

    #[tokio::test]
    async fn periodic_pass_saves_dirty_records() {
        let (service, owners) = service();
        let config = RegistryConfig {
            flush_interval_ms: 10,
            sweep_interval_ms: 60_000,
        };
        let (tx, rx) = watch::channel(false);
        let handle = spawn_maintenance(Arc::clone(&service), &config, rx);

        let actor = ActorId::new();
        service.registry().actor(actor).await.unwrap().set_name("Quill");

        let key = ClaimantKey::actor(actor);
        for _ in 0..100 {
            if owners.contains(key) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(owners.get(key).map(|p| p.name), Some(String::from("Quill")));

        tx.send(true).unwrap();
        let report = handle.await.unwrap();
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn shutdown_flushes_pending_edits() {
        let (service, owners) = service();
        let config = RegistryConfig {
            flush_interval_ms: 3_600_000,
            sweep_interval_ms: 3_600_000,
        };
        let (tx, rx) = watch::channel(false);
        let handle = spawn_maintenance(Arc::clone(&service), &config, rx);

        let actor = ActorId::new();
        service.registry().actor(actor).await.unwrap().set_name("Last");
        drop(tx);

        let report = handle.await.unwrap();
        assert_eq!(report.saved, 1);
        assert!(owners.contains(ClaimantKey::actor(actor)));
    }
}
