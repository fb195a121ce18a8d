use serde::{Deserialize, Serialize};

use super::patient::RiskLabel;

/// A doctor entry from the referral directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub name: String,
    pub experience: i32,
    pub available: bool,
}

/// Recommended department with its candidate specialists.
///
/// The department is a plain string on the wire; it is canonicalized
/// against the closed department set when copied onto a patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralData {
    pub department: String,
    pub doctors: Vec<Doctor>,
}

/// Output of one risk assessment, remote or local.
///
/// Transient: only the scalar fields are persisted, copied onto the
/// patient record at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub risk_score: f64,
    pub risk_label: RiskLabel,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral: Option<ReferralData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_scoring_service_response() {
        let body = r#"{
            "risk_score": 0.82,
            "risk_label": "HIGH",
            "details": "Elevated heart rate. Low oxygen saturation.",
            "referral": {
                "department": "Pulmonology",
                "doctors": [{"name": "Dr. Osei", "experience": 12, "available": true}]
            }
        }"#;
        let result: TriageResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.risk_label, RiskLabel::High);
        assert_eq!(result.referral.unwrap().doctors.len(), 1);
    }

    #[test]
    fn referral_is_optional() {
        let body = r#"{"risk_score": 0.1, "risk_label": "LOW", "details": "ok"}"#;
        let result: TriageResult = serde_json::from_str(body).unwrap();
        assert!(result.referral.is_none());
    }
}
