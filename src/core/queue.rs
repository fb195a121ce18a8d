//! The live patient queue.
//!
//! Owns the in-memory, risk-sorted list of patient records and is its
//! only writer. Writes go through the optimistic-insert protocol: a
//! provisional record with a client-generated temp id appears immediately,
//! then is replaced in place by the store-confirmed record — or removed
//! entirely if the write fails. Inserts pushed by other writers arrive on
//! the store's subscription channel and are merged unless the optimistic
//! path already produced the same id.
//!
//! Ordering is a total order: risk severity first (HIGH before MEDIUM
//! before LOW before unassessed), most recent first within a severity.
//! Re-sorting an already sorted queue is a no-op.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::db::{PatientStore, StoreError};
use crate::models::{severity_rank, PatientDraft, PatientRecord};

/// A queue slot: provisional until the store confirms it.
///
/// For a `Pending` entry the record's id is the client-generated temp id;
/// it never leaves the process and is only ever matched against other
/// `Pending` entries, so a pushed remote insert cannot be mistaken for a
/// provisional record.
#[derive(Debug, Clone)]
pub enum QueueEntry {
    Pending(PatientRecord),
    Confirmed(PatientRecord),
}

impl QueueEntry {
    pub fn record(&self) -> &PatientRecord {
        match self {
            QueueEntry::Pending(r) | QueueEntry::Confirmed(r) => r,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, QueueEntry::Pending(_))
    }
}

fn sort_entries(entries: &mut [QueueEntry]) {
    entries.sort_by(|a, b| {
        severity_rank(a.record().risk_label)
            .cmp(&severity_rank(b.record().risk_label))
            .then_with(|| b.record().created_at.cmp(&a.record().created_at))
    });
}

pub struct PatientQueueStore<S: PatientStore> {
    store: Arc<S>,
    entries: RwLock<Vec<QueueEntry>>,
}

impl<S: PatientStore> PatientQueueStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Replace local state with the store's full record set.
    ///
    /// On failure local state is left exactly as it was; the caller may
    /// retry.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<usize, StoreError> {
        let records = self.store.fetch_patients().await?;
        let mut fresh: Vec<QueueEntry> = records.into_iter().map(QueueEntry::Confirmed).collect();
        sort_entries(&mut fresh);
        let count = fresh.len();
        *self.entries.write().await = fresh;
        info!(count, "queue loaded from store");
        Ok(count)
    }

    /// Optimistic insert: the draft is visible in the queue immediately
    /// under a temp id, then reconciled with the store's answer.
    ///
    /// On store failure the provisional entry is removed and the error is
    /// returned; the queue is exactly as it was before the call.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn insert(&self, draft: PatientDraft) -> Result<PatientRecord, StoreError> {
        let temp_id = Uuid::new_v4().to_string();
        let provisional = draft.clone().into_record(temp_id.clone(), Utc::now());
        {
            let mut entries = self.entries.write().await;
            entries.push(QueueEntry::Pending(provisional));
            sort_entries(&mut entries);
        }

        match self.store.insert_patient(&draft).await {
            Ok(confirmed) => {
                self.confirm(&temp_id, confirmed.clone()).await;
                Ok(confirmed)
            }
            Err(err) => {
                let mut entries = self.entries.write().await;
                entries.retain(|e| !(e.is_pending() && e.record().id == temp_id));
                warn!(%err, "insert failed, provisional record rolled back");
                Err(err)
            }
        }
    }

    /// Swap the confirmed record into the provisional entry's slot.
    /// The slot only moves if the confirmation changed the risk fields;
    /// a server-adjusted timestamp alone does not reorder the queue.
    async fn confirm(&self, temp_id: &str, confirmed: PatientRecord) {
        let mut entries = self.entries.write().await;
        let pos = entries
            .iter()
            .position(|e| e.is_pending() && e.record().id == temp_id);
        match pos {
            Some(pos) => {
                let risk_changed = {
                    let provisional = entries[pos].record();
                    provisional.risk_label != confirmed.risk_label
                        || provisional.risk_score != confirmed.risk_score
                };
                debug!(id = %confirmed.id, risk_changed, "provisional record confirmed");
                entries[pos] = QueueEntry::Confirmed(confirmed);
                if risk_changed {
                    sort_entries(&mut entries);
                }
            }
            None => {
                // The provisional entry is gone (a reload raced the
                // confirmation). Merge like a pushed insert.
                if !entries.iter().any(|e| e.record().id == confirmed.id) {
                    entries.push(QueueEntry::Confirmed(confirmed));
                    sort_entries(&mut entries);
                }
            }
        }
    }

    /// Merge an insert pushed by another writer. A record id the queue
    /// already holds is ignored — the optimistic path got there first.
    pub async fn apply_remote_insert(&self, record: PatientRecord) {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.record().id == record.id) {
            debug!(id = %record.id, "duplicate insert notification ignored");
            return;
        }
        entries.push(QueueEntry::Confirmed(record));
        sort_entries(&mut entries);
    }

    /// The queue in display order.
    pub async fn snapshot(&self) -> Vec<PatientRecord> {
        self.entries
            .read()
            .await
            .iter()
            .map(|e| e.record().clone())
            .collect()
    }

    /// Drain the store's insert notifications into the queue until the
    /// channel closes.
    pub fn spawn_subscription(self: Arc<Self>) -> JoinHandle<()>
    where
        S: 'static,
    {
        let queue = self;
        let mut rx = queue.store.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(record) => queue.apply_remote_insert(record).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "insert notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    use crate::models::{AssignmentEvent, Department, Doctor, PatientVitals, RiskLabel, TriageResult};

    struct MockStore {
        fail_writes: AtomicBool,
        inserted: Mutex<Vec<PatientRecord>>,
        events: broadcast::Sender<PatientRecord>,
    }

    impl MockStore {
        fn new() -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                fail_writes: AtomicBool::new(false),
                inserted: Mutex::new(Vec::new()),
                events,
            })
        }

        fn fail_next_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PatientStore for MockStore {
        async fn fetch_patients(&self) -> Result<Vec<PatientRecord>, StoreError> {
            Ok(self.inserted.lock().await.clone())
        }

        async fn insert_patient(&self, draft: &PatientDraft) -> Result<PatientRecord, StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Write(sqlx::Error::PoolClosed));
            }
            let record = draft
                .clone()
                .into_record(Uuid::new_v4().to_string(), Utc::now());
            self.inserted.lock().await.push(record.clone());
            let _ = self.events.send(record.clone());
            Ok(record)
        }

        fn subscribe(&self) -> broadcast::Receiver<PatientRecord> {
            self.events.subscribe()
        }

        async fn fetch_assignments(&self) -> Result<Vec<AssignmentEvent>, StoreError> {
            Ok(Vec::new())
        }

        async fn record_assignment(
            &self,
            _patient: &PatientRecord,
            _department: Department,
        ) -> Result<AssignmentEvent, StoreError> {
            Err(StoreError::Write(sqlx::Error::PoolClosed))
        }

        async fn department_roster(
            &self,
            _department: Department,
        ) -> Result<Vec<Doctor>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn draft(name: &str, label: Option<RiskLabel>) -> PatientDraft {
        let vitals = PatientVitals::default();
        let result = TriageResult {
            risk_score: 0.5,
            risk_label: label.unwrap_or(RiskLabel::Low),
            details: String::new(),
            referral: None,
        };
        let mut d = PatientDraft::from_assessment(name, &vitals, &result);
        d.risk_label = label;
        if label.is_none() {
            d.risk_score = None;
        }
        d
    }

    fn record(name: &str, label: Option<RiskLabel>, age_secs: i64) -> PatientRecord {
        draft(name, label).into_record(
            Uuid::new_v4().to_string(),
            Utc::now() - Duration::seconds(age_secs),
        )
    }

    #[test]
    fn sort_is_idempotent_total_order() {
        let mut entries: Vec<QueueEntry> = vec![
            record("low-old", Some(RiskLabel::Low), 300),
            record("unset", None, 10),
            record("high-old", Some(RiskLabel::High), 200),
            record("medium", Some(RiskLabel::Medium), 50),
            record("high-new", Some(RiskLabel::High), 5),
        ]
        .into_iter()
        .map(QueueEntry::Confirmed)
        .collect();

        sort_entries(&mut entries);
        let first: Vec<String> = entries.iter().map(|e| e.record().name.clone()).collect();
        assert_eq!(first, ["high-new", "high-old", "medium", "low-old", "unset"]);

        // Sorting an already sorted queue changes nothing.
        sort_entries(&mut entries);
        let second: Vec<String> = entries.iter().map(|e| e.record().name.clone()).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn optimistic_insert_confirms_in_place() {
        let store = MockStore::new();
        let queue = PatientQueueStore::new(store.clone());

        let confirmed = queue
            .insert(draft("A. Chen", Some(RiskLabel::High)))
            .await
            .unwrap();

        let snapshot = queue.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, confirmed.id);
        assert!(!queue.entries.read().await[0].is_pending());
    }

    #[tokio::test]
    async fn failed_insert_rolls_back_to_prior_state() {
        let store = MockStore::new();
        let queue = PatientQueueStore::new(store.clone());
        queue
            .insert(draft("K. Williams", Some(RiskLabel::Medium)))
            .await
            .unwrap();
        let before = queue.snapshot().await;

        store.fail_next_writes(true);
        let err = queue
            .insert(draft("S. Johnson", Some(RiskLabel::High)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));

        let after = queue.snapshot().await;
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].id, after[0].id);
    }

    #[tokio::test]
    async fn duplicate_notification_is_ignored() {
        let store = MockStore::new();
        let queue = PatientQueueStore::new(store.clone());

        let confirmed = queue
            .insert(draft("M. Garcia", Some(RiskLabel::Low)))
            .await
            .unwrap();

        // The store's own notification for the optimistic insert arrives
        // after confirmation; the queue must not duplicate the record.
        queue.apply_remote_insert(confirmed.clone()).await;
        assert_eq!(queue.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn remote_insert_merges_at_sorted_position() {
        let store = MockStore::new();
        let queue = PatientQueueStore::new(store.clone());
        queue
            .insert(draft("low", Some(RiskLabel::Low)))
            .await
            .unwrap();

        queue
            .apply_remote_insert(record("pushed-high", Some(RiskLabel::High), 0))
            .await;

        let snapshot = queue.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].name, "pushed-high");
    }

    #[tokio::test]
    async fn load_failure_leaves_state_unchanged() {
        struct FailingLoad;
        #[async_trait]
        impl PatientStore for FailingLoad {
            async fn fetch_patients(&self) -> Result<Vec<PatientRecord>, StoreError> {
                Err(StoreError::Read(sqlx::Error::PoolClosed))
            }
            async fn insert_patient(
                &self,
                _draft: &PatientDraft,
            ) -> Result<PatientRecord, StoreError> {
                Err(StoreError::Write(sqlx::Error::PoolClosed))
            }
            fn subscribe(&self) -> broadcast::Receiver<PatientRecord> {
                broadcast::channel(1).0.subscribe()
            }
            async fn fetch_assignments(&self) -> Result<Vec<AssignmentEvent>, StoreError> {
                Ok(Vec::new())
            }
            async fn record_assignment(
                &self,
                _patient: &PatientRecord,
                _department: Department,
            ) -> Result<AssignmentEvent, StoreError> {
                Err(StoreError::Write(sqlx::Error::PoolClosed))
            }
            async fn department_roster(
                &self,
                _department: Department,
            ) -> Result<Vec<Doctor>, StoreError> {
                Ok(Vec::new())
            }
        }

        let queue = PatientQueueStore::new(Arc::new(FailingLoad));
        queue
            .apply_remote_insert(record("existing", Some(RiskLabel::Low), 5))
            .await;

        assert!(queue.load().await.is_err());
        assert_eq!(queue.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn subscription_pump_applies_store_events() {
        let store = MockStore::new();
        let queue = Arc::new(PatientQueueStore::new(store.clone()));
        let _pump = queue.clone().spawn_subscription();

        // Another writer inserts directly against the store.
        let pushed = store
            .insert_patient(&draft("other-client", Some(RiskLabel::High)))
            .await
            .unwrap();

        for _ in 0..40 {
            if !queue.snapshot().await.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
        let snapshot = queue.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, pushed.id);
    }
}
