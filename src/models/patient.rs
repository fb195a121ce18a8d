use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::department::Department;
use super::triage::TriageResult;

/// Triage risk bucket, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLabel {
    High,
    Medium,
    Low,
}

impl RiskLabel {
    /// Sort rank: HIGH sorts first. Records with no label rank after LOW.
    pub fn severity_rank(self) -> u8 {
        match self {
            RiskLabel::High => 0,
            RiskLabel::Medium => 1,
            RiskLabel::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLabel::High => "HIGH",
            RiskLabel::Medium => "MEDIUM",
            RiskLabel::Low => "LOW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HIGH" => Some(RiskLabel::High),
            "MEDIUM" => Some(RiskLabel::Medium),
            "LOW" => Some(RiskLabel::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort rank for an optional label; unassessed records rank last.
pub fn severity_rank(label: Option<RiskLabel>) -> u8 {
    label.map(RiskLabel::severity_rank).unwrap_or(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrivalMode {
    #[serde(rename = "Walk-in")]
    WalkIn,
    Ambulance,
}

impl ArrivalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ArrivalMode::WalkIn => "Walk-in",
            ArrivalMode::Ambulance => "Ambulance",
        }
    }

    /// Lenient parse for stored text; anything unrecognized reads as walk-in.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("ambulance") {
            ArrivalMode::Ambulance
        } else {
            ArrivalMode::WalkIn
        }
    }
}

impl std::fmt::Display for ArrivalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring input: demographics, measured vitals and history for one patient.
///
/// Out-of-range values are not rejected here; intake validation is the
/// caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientVitals {
    pub age: u32,
    pub gender: String,
    pub heart_rate: i32,
    pub systolic_bp: i32,
    pub diastolic_bp: i32,
    pub o2_saturation: i32,
    pub temperature: f64,
    pub respiratory_rate: i32,
    pub pain_score: i32,
    pub gcs_score: i32,
    pub arrival_mode: ArrivalMode,
    pub diabetes: bool,
    pub hypertension: bool,
    pub heart_disease: bool,
    pub chief_complaint: Option<String>,
}

impl Default for PatientVitals {
    /// Nominal adult vitals, matching the intake form defaults.
    fn default() -> Self {
        Self {
            age: 30,
            gender: "Male".to_string(),
            heart_rate: 75,
            systolic_bp: 120,
            diastolic_bp: 80,
            o2_saturation: 98,
            temperature: 37.0,
            respiratory_rate: 16,
            pain_score: 0,
            gcs_score: 15,
            arrival_mode: ArrivalMode::WalkIn,
            diabetes: false,
            hypertension: false,
            heart_disease: false,
            chief_complaint: None,
        }
    }
}

/// One triage event as held in the patient store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub heart_rate: i32,
    pub systolic_bp: i32,
    pub diastolic_bp: i32,
    pub o2_saturation: i32,
    pub temperature: f64,
    pub respiratory_rate: i32,
    pub pain_score: i32,
    pub gcs_score: i32,
    pub arrival_mode: ArrivalMode,
    pub diabetes: bool,
    pub hypertension: bool,
    pub heart_disease: bool,
    pub chief_complaint: Option<String>,
    pub risk_score: Option<f64>,
    pub risk_label: Option<RiskLabel>,
    pub explanation: Option<String>,
    pub department: Option<Department>,
    pub created_at: DateTime<Utc>,
}

/// A patient record before the store has assigned it an id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDraft {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub heart_rate: i32,
    pub systolic_bp: i32,
    pub diastolic_bp: i32,
    pub o2_saturation: i32,
    pub temperature: f64,
    pub respiratory_rate: i32,
    pub pain_score: i32,
    pub gcs_score: i32,
    pub arrival_mode: ArrivalMode,
    pub diabetes: bool,
    pub hypertension: bool,
    pub heart_disease: bool,
    pub chief_complaint: Option<String>,
    pub risk_score: Option<f64>,
    pub risk_label: Option<RiskLabel>,
    pub explanation: Option<String>,
    pub department: Option<Department>,
}

impl PatientDraft {
    /// Build a draft from an assessment: the scalar risk fields of the
    /// result are copied onto the record and the referral department (if
    /// any) becomes the recommended department.
    pub fn from_assessment(
        name: impl Into<String>,
        vitals: &PatientVitals,
        result: &TriageResult,
    ) -> Self {
        Self {
            name: name.into(),
            age: vitals.age,
            gender: vitals.gender.clone(),
            heart_rate: vitals.heart_rate,
            systolic_bp: vitals.systolic_bp,
            diastolic_bp: vitals.diastolic_bp,
            o2_saturation: vitals.o2_saturation,
            temperature: vitals.temperature,
            respiratory_rate: vitals.respiratory_rate,
            pain_score: vitals.pain_score,
            gcs_score: vitals.gcs_score,
            arrival_mode: vitals.arrival_mode,
            diabetes: vitals.diabetes,
            hypertension: vitals.hypertension,
            heart_disease: vitals.heart_disease,
            chief_complaint: vitals.chief_complaint.clone(),
            risk_score: Some(result.risk_score),
            risk_label: Some(result.risk_label),
            explanation: Some(result.details.clone()),
            department: result
                .referral
                .as_ref()
                .map(|r| Department::canonicalize(&r.department)),
        }
    }

    /// Materialize the draft into a record with the given identity.
    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> PatientRecord {
        PatientRecord {
            id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            heart_rate: self.heart_rate,
            systolic_bp: self.systolic_bp,
            diastolic_bp: self.diastolic_bp,
            o2_saturation: self.o2_saturation,
            temperature: self.temperature,
            respiratory_rate: self.respiratory_rate,
            pain_score: self.pain_score,
            gcs_score: self.gcs_score,
            arrival_mode: self.arrival_mode,
            diabetes: self.diabetes,
            hypertension: self.hypertension,
            heart_disease: self.heart_disease,
            chief_complaint: self.chief_complaint,
            risk_score: self.risk_score,
            risk_label: self.risk_label,
            explanation: self.explanation,
            department: self.department,
            created_at,
        }
    }
}

/// One routing event from the assignment log.
///
/// `patient_id` is a weak reference into the patient table; `patient_name`
/// is denormalized so the event stays displayable when the reference no
/// longer resolves. `department` is kept as the raw string it was written
/// with and canonicalized at aggregation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentEvent {
    pub id: i64,
    pub patient_id: String,
    pub patient_name: String,
    pub department: String,
    pub assigned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_rank_orders_high_first() {
        assert!(severity_rank(Some(RiskLabel::High)) < severity_rank(Some(RiskLabel::Medium)));
        assert!(severity_rank(Some(RiskLabel::Medium)) < severity_rank(Some(RiskLabel::Low)));
        assert!(severity_rank(Some(RiskLabel::Low)) < severity_rank(None));
    }

    #[test]
    fn risk_label_round_trips_store_text() {
        for label in [RiskLabel::High, RiskLabel::Medium, RiskLabel::Low] {
            assert_eq!(RiskLabel::parse(label.as_str()), Some(label));
        }
        assert_eq!(RiskLabel::parse("urgent"), None);
    }

    #[test]
    fn arrival_mode_parse_is_lenient() {
        assert_eq!(ArrivalMode::parse("Ambulance"), ArrivalMode::Ambulance);
        assert_eq!(ArrivalMode::parse("ambulance"), ArrivalMode::Ambulance);
        assert_eq!(ArrivalMode::parse("Walk-in"), ArrivalMode::WalkIn);
        assert_eq!(ArrivalMode::parse("gurney"), ArrivalMode::WalkIn);
    }
}
