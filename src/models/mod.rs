//! Data models for the triage engine.

pub mod department;
pub mod patient;
pub mod triage;

pub use department::{Department, ALL_DEPARTMENTS};
pub use patient::{
    severity_rank, ArrivalMode, AssignmentEvent, PatientDraft, PatientRecord, PatientVitals,
    RiskLabel,
};
pub use triage::{Doctor, ReferralData, TriageResult};
