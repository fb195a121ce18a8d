//! Referral resolution: route a triage to a department and attach its
//! doctor roster from the store directory.

use tracing::warn;

use crate::db::PatientStore;
use crate::models::{Department, ReferralData};

/// Resolve a referral for a completed triage.
///
/// Routing prefers the stated chief complaint; when there is none, the
/// assessment details are used as the routing text, so a flagged
/// "Elevated heart rate" still lands somewhere sensible. A roster lookup
/// failure degrades to an empty doctor list rather than failing the
/// referral.
pub async fn resolve<S: PatientStore>(
    store: &S,
    chief_complaint: Option<&str>,
    details: &str,
) -> ReferralData {
    let reason = chief_complaint
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(details);
    let department = Department::from_complaint(reason);

    let doctors = match store.department_roster(department).await {
        Ok(doctors) => doctors,
        Err(err) => {
            warn!(%err, department = department.canonical_name(), "roster lookup failed");
            Vec::new()
        }
    };

    ReferralData {
        department: department.canonical_name().to_string(),
        doctors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::broadcast;

    use crate::db::StoreError;
    use crate::models::{AssignmentEvent, Doctor, PatientDraft, PatientRecord};

    struct RosterOnly;

    #[async_trait]
    impl PatientStore for RosterOnly {
        async fn fetch_patients(&self) -> Result<Vec<PatientRecord>, StoreError> {
            Ok(Vec::new())
        }
        async fn insert_patient(&self, _d: &PatientDraft) -> Result<PatientRecord, StoreError> {
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
            _p: &PatientRecord,
            _d: Department,
        ) -> Result<AssignmentEvent, StoreError> {
            Err(StoreError::Write(sqlx::Error::PoolClosed))
        }
        async fn department_roster(
            &self,
            department: Department,
        ) -> Result<Vec<Doctor>, StoreError> {
            if department == Department::Cardiology {
                Ok(vec![Doctor {
                    name: "Dr. Ibarra".to_string(),
                    experience: 14,
                    available: true,
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn routes_complaint_and_attaches_roster() {
        let referral = resolve(&RosterOnly, Some("crushing chest pain"), "").await;
        assert_eq!(referral.department, "Cardiology");
        assert_eq!(referral.doctors.len(), 1);
    }

    #[tokio::test]
    async fn empty_complaint_falls_back_to_details() {
        let referral = resolve(&RosterOnly, Some("   "), "Elevated heart rate.").await;
        assert_eq!(referral.department, "Cardiology");
    }

    #[tokio::test]
    async fn unrouted_reason_lands_in_general_medicine() {
        let referral = resolve(&RosterOnly, Some("just feeling off"), "").await;
        assert_eq!(referral.department, "General_Medicine");
        assert!(referral.doctors.is_empty());
    }
}
