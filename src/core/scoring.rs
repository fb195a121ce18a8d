//! Rule-based risk scoring.
//!
//! This is the offline ruleset the remote scoring service approximates.
//! It is total over well-formed input and never fails, which is what makes
//! it usable as the fallback when the service is down: critical thresholds
//! short-circuit everything else, otherwise independent weighted
//! contributions accumulate and are bucketed into a risk label.

use crate::models::{ArrivalMode, Department, PatientVitals, ReferralData, RiskLabel, TriageResult};

/// Risk label thresholds on the final (rounded) score.
pub fn bucket(score: f64) -> RiskLabel {
    if score >= 0.66 {
        RiskLabel::High
    } else if score >= 0.33 {
        RiskLabel::Medium
    } else {
        RiskLabel::Low
    }
}

/// Score a patient with the local ruleset. Deterministic and infallible.
pub fn score(v: &PatientVitals) -> TriageResult {
    // Critical vitals dominate: any one of these ends scoring immediately.
    if v.heart_rate > 180 || v.systolic_bp < 70 || v.o2_saturation < 85 {
        let mut reasons: Vec<&str> = Vec::new();
        if v.heart_rate > 180 {
            reasons.push("Severe tachycardia");
        }
        if v.systolic_bp < 70 {
            reasons.push("Hypotension detected");
        }
        if v.o2_saturation < 85 {
            reasons.push("Dangerous hypoxemia");
        }
        return TriageResult {
            risk_score: 0.99,
            risk_label: RiskLabel::High,
            details: format!("Critical vitals detected: {}.", reasons.join(". ")),
            referral: Some(default_referral()),
        };
    }

    let mut score: f64 = 0.0;

    if v.age > 70 {
        score += 0.15;
    } else if v.age > 50 {
        score += 0.08;
    }

    if v.heart_rate > 120 {
        score += 0.15;
    } else if v.heart_rate > 100 {
        score += 0.08;
    } else if v.heart_rate < 50 {
        score += 0.12;
    }

    if v.systolic_bp < 90 {
        score += 0.15;
    } else if v.systolic_bp > 180 {
        score += 0.12;
    }

    if v.o2_saturation < 90 {
        score += 0.20;
    } else if v.o2_saturation < 94 {
        score += 0.10;
    }

    if v.temperature > 39.5 {
        score += 0.10;
    } else if v.temperature < 35.0 {
        score += 0.12;
    }

    if v.gcs_score <= 8 {
        score += 0.25;
    } else if v.gcs_score <= 12 {
        score += 0.12;
    }

    if v.pain_score >= 8 {
        score += 0.10;
    }

    if v.respiratory_rate > 30 {
        score += 0.12;
    } else if v.respiratory_rate < 10 {
        score += 0.15;
    }

    if v.diabetes {
        score += 0.05;
    }
    if v.hypertension {
        score += 0.05;
    }
    if v.heart_disease {
        score += 0.08;
    }

    if v.arrival_mode == ArrivalMode::Ambulance {
        score += 0.08;
    }

    // Round before bucketing so the emitted score and label stay
    // threshold-consistent.
    let score = (score.min(0.99) * 100.0).round() / 100.0;
    let label = bucket(score);

    let mut flags: Vec<&str> = Vec::new();
    if v.heart_rate > 120 {
        flags.push("Elevated heart rate");
    }
    if v.systolic_bp < 90 {
        flags.push("Low blood pressure");
    }
    if v.o2_saturation < 94 {
        flags.push("Low oxygen saturation");
    }
    if v.gcs_score <= 12 {
        flags.push("Reduced consciousness");
    }
    if v.temperature > 39.5 {
        flags.push("High fever");
    }
    if v.pain_score >= 8 {
        flags.push("Severe pain");
    }
    if flags.is_empty() {
        flags.push("Vitals within acceptable range");
    }

    TriageResult {
        risk_score: score,
        risk_label: label,
        details: format!("{}.", flags.join(". ")),
        referral: Some(default_referral()),
    }
}

// No live directory offline, so the default department ships with an
// empty roster.
fn default_referral() -> ReferralData {
    ReferralData {
        department: Department::DEFAULT.display_name().to_string(),
        doctors: Vec::new(),
    }
}
