//! Active-queue projection.
//!
//! The live display shows only patients younger than the configured
//! window. Nothing is deleted: a record leaves the active set exactly
//! once, when its age crosses the window, and the underlying store is
//! untouched. The tick loop republishes only when the active set's
//! composition changes (same length and same head record means no
//! publish — a render-saving heuristic, not part of the correctness
//! contract, which is solely the window predicate).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::queue::PatientQueueStore;
use crate::db::PatientStore;
use crate::models::PatientRecord;

/// Recompute cadence of the projection loop.
pub const TICK_INTERVAL: StdDuration = StdDuration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ActiveQueueProjection {
    window: Duration,
}

impl ActiveQueueProjection {
    pub fn new(window: StdDuration) -> Self {
        Self {
            window: Duration::milliseconds(window.as_millis() as i64),
        }
    }

    /// The subset of `records` still inside the window at `now`, in the
    /// order given. A record created exactly one window ago is already
    /// inactive.
    pub fn active(&self, records: &[PatientRecord], now: DateTime<Utc>) -> Vec<PatientRecord> {
        records
            .iter()
            .filter(|r| now.signed_duration_since(r.created_at) < self.window)
            .cloned()
            .collect()
    }

    fn composition_changed(current: &[PatientRecord], next: &[PatientRecord]) -> bool {
        current.len() != next.len()
            || current.first().map(|r| r.id.as_str()) != next.first().map(|r| r.id.as_str())
    }

    /// Run the projection on its tick, publishing active sets on a watch
    /// channel. The task ends when every receiver is dropped.
    pub fn spawn<S>(
        self,
        queue: Arc<PatientQueueStore<S>>,
    ) -> (watch::Receiver<Vec<PatientRecord>>, JoinHandle<()>)
    where
        S: PatientStore + 'static,
    {
        let (tx, rx) = watch::channel(Vec::new());
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(TICK_INTERVAL);
            let mut current: Vec<PatientRecord> = Vec::new();
            loop {
                tick.tick().await;
                let snapshot = queue.snapshot().await;
                let next = self.active(&snapshot, Utc::now());
                if Self::composition_changed(&current, &next) {
                    debug!(active = next.len(), "active queue changed");
                    current = next.clone();
                    if tx.send(next).is_err() {
                        break;
                    }
                }
            }
        });
        (rx, handle)
    }
}
