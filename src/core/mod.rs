//! Core triage logic: scoring, assessment orchestration, the live queue,
//! the active-window projection and dashboard analytics.

pub mod analytics;
pub mod projection;
pub mod queue;
pub mod referral;
pub mod scoring;
pub mod triage;

pub use analytics::{aggregate, DashboardStats};
pub use projection::ActiveQueueProjection;
pub use queue::{PatientQueueStore, QueueEntry};
pub use triage::{AssessState, ScoringError, TriageClient};
