//! The patient store collaborator.
//!
//! The queue, analytics and referral layers talk to the store through the
//! [`PatientStore`] trait: query-all, insert-one returning the confirmed
//! record, a live channel of insert notifications, the assignment log and
//! the per-department doctor roster. The SQLite implementation lives in
//! [`sqlite`].

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::{AssignmentEvent, Department, Doctor, PatientDraft, PatientRecord};

pub mod sqlite;

pub use sqlite::SqlitePatientStore;

/// Store failures, distinguishable by operation so callers can recover
/// appropriately: reads leave local state untouched, failed writes roll
/// back their optimistic record.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("store read failed: {0}")]
    Read(#[source] sqlx::Error),
    #[error("store write failed: {0}")]
    Write(#[source] sqlx::Error),
}

#[async_trait]
pub trait PatientStore: Send + Sync {
    /// All patient records, most recently created first.
    async fn fetch_patients(&self) -> Result<Vec<PatientRecord>, StoreError>;

    /// Persist a draft; the store assigns id and creation timestamp and
    /// returns the confirmed record.
    async fn insert_patient(&self, draft: &PatientDraft) -> Result<PatientRecord, StoreError>;

    /// Live insert notifications for the patient table, including this
    /// process's own writes.
    fn subscribe(&self) -> broadcast::Receiver<PatientRecord>;

    /// The assignment log, oldest first.
    async fn fetch_assignments(&self) -> Result<Vec<AssignmentEvent>, StoreError>;

    /// Append a routing event to the assignment log.
    async fn record_assignment(
        &self,
        patient: &PatientRecord,
        department: Department,
    ) -> Result<AssignmentEvent, StoreError>;

    /// Doctor roster for one department.
    async fn department_roster(&self, department: Department) -> Result<Vec<Doctor>, StoreError>;
}
