//! The closed set of hospital departments and the two ways a free string
//! becomes one of them: canonicalization of stored department names and
//! keyword routing of chief complaints.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    Cardiology,
    Neurology,
    Gastroenterology,
    Pulmonology,
    Orthopedics,
    #[serde(rename = "Emergency_Trauma")]
    EmergencyTrauma,
    #[serde(rename = "General_Medicine")]
    GeneralMedicine,
    Dermatology,
    #[serde(rename = "ENT")]
    Ent,
    #[serde(rename = "Urology_Nephrology")]
    UrologyNephrology,
    Psychiatry,
    Toxicology,
}

/// Dashboard display order. Aggregation emits every department in this
/// order so zero-volume departments still appear.
pub const ALL_DEPARTMENTS: [Department; 12] = [
    Department::Cardiology,
    Department::Neurology,
    Department::Gastroenterology,
    Department::Pulmonology,
    Department::Orthopedics,
    Department::EmergencyTrauma,
    Department::GeneralMedicine,
    Department::Dermatology,
    Department::Ent,
    Department::UrologyNephrology,
    Department::Psychiatry,
    Department::Toxicology,
];

/// Complaint keyword table, first match wins. The order is part of the
/// routing contract: "chest pain with shortness of breath" routes to
/// Cardiology, not Pulmonology.
const KEYWORD_ROUTES: &[(Department, &[&str])] = &[
    (
        Department::Cardiology,
        &[
            "chest pain",
            "angina",
            "heart attack",
            "heart failure",
            "arrhythmia",
            "chest tightness",
            "palpitations",
            "heart",
        ],
    ),
    (
        Department::Neurology,
        &[
            "stroke",
            "migraine",
            "vertigo",
            "confusion",
            "syncope",
            "dizziness",
            "unresponsive",
            "headache",
            "blurry vision",
            "faint",
        ],
    ),
    (
        Department::Gastroenterology,
        &[
            "gastric",
            "indigestion",
            "abdominal",
            "nausea",
            "vomiting",
            "appetite",
            "stomach",
            "belly",
        ],
    ),
    (
        Department::Pulmonology,
        &[
            "pneumonia",
            "breath",
            "cough",
            "respiratory",
            "asthma",
            "chest heaviness",
            "lung",
        ],
    ),
    (
        Department::Orthopedics,
        &[
            "sprain", "fracture", "bone", "joint", "back pain", "leg pain", "shoulder", "knee",
            "arm",
        ],
    ),
    (
        Department::EmergencyTrauma,
        &[
            "crash", "trauma", "fall", "injury", "severe", "shock", "overdose", "accident",
            "bleed",
        ],
    ),
    (
        Department::GeneralMedicine,
        &[
            "fever",
            "flu",
            "fatigue",
            "weakness",
            "checkup",
            "edema",
            "dehydration",
            "cold",
        ],
    ),
    (Department::Dermatology, &["rash", "skin", "itch", "redness"]),
    (Department::Ent, &["ear", "throat", "nose", "sinus"]),
    (
        Department::UrologyNephrology,
        &["kidney", "urine", "urinary", "bladder", "stone"],
    ),
    (
        Department::Psychiatry,
        &["anxiety", "depression", "suicide", "hallucination", "panic"],
    ),
    (
        Department::Toxicology,
        &["poison", "drug", "pill", "chemical"],
    ),
];

impl Department {
    pub const DEFAULT: Department = Department::GeneralMedicine;

    /// Stable table/storage name, underscores for spaces.
    pub fn canonical_name(self) -> &'static str {
        match self {
            Department::Cardiology => "Cardiology",
            Department::Neurology => "Neurology",
            Department::Gastroenterology => "Gastroenterology",
            Department::Pulmonology => "Pulmonology",
            Department::Orthopedics => "Orthopedics",
            Department::EmergencyTrauma => "Emergency_Trauma",
            Department::GeneralMedicine => "General_Medicine",
            Department::Dermatology => "Dermatology",
            Department::Ent => "ENT",
            Department::UrologyNephrology => "Urology_Nephrology",
            Department::Psychiatry => "Psychiatry",
            Department::Toxicology => "Toxicology",
        }
    }

    /// Human-readable name for dashboards.
    pub fn display_name(self) -> &'static str {
        match self {
            Department::EmergencyTrauma => "Emergency Trauma",
            Department::GeneralMedicine => "General Medicine",
            Department::UrologyNephrology => "Urology Nephrology",
            other => other.canonical_name(),
        }
    }

    /// Map an arbitrary department string onto the closed set.
    ///
    /// Matching ignores case, whitespace and underscores; anything that
    /// does not resolve falls back to the default department. Records are
    /// never dropped for carrying an unknown department.
    pub fn canonicalize(raw: &str) -> Department {
        static FOLDED: Lazy<Vec<(String, Department)>> = Lazy::new(|| {
            ALL_DEPARTMENTS
                .into_iter()
                .map(|d| (fold(d.canonical_name()), d))
                .collect()
        });

        let folded = fold(raw);
        if folded.is_empty() {
            return Department::DEFAULT;
        }
        FOLDED
            .iter()
            .find(|(name, _)| *name == folded)
            .map(|(_, d)| *d)
            .unwrap_or(Department::DEFAULT)
    }

    /// Route a free-text complaint to a department by keyword.
    pub fn from_complaint(complaint: &str) -> Department {
        let complaint = complaint.to_lowercase();
        for (department, keywords) in KEYWORD_ROUTES {
            if keywords.iter().any(|k| complaint.contains(k)) {
                return *department;
            }
        }
        Department::DEFAULT
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_ignores_case_spaces_and_underscores() {
        assert_eq!(
            Department::canonicalize("emergency trauma"),
            Department::EmergencyTrauma
        );
        assert_eq!(
            Department::canonicalize("EMERGENCY_TRAUMA"),
            Department::EmergencyTrauma
        );
        assert_eq!(Department::canonicalize(" cardiology "), Department::Cardiology);
        assert_eq!(Department::canonicalize("ent"), Department::Ent);
    }

    #[test]
    fn canonicalize_falls_back_to_default() {
        assert_eq!(Department::canonicalize("Radiology"), Department::DEFAULT);
        assert_eq!(Department::canonicalize(""), Department::DEFAULT);
    }

    #[test]
    fn complaint_routing_first_match_wins() {
        assert_eq!(
            Department::from_complaint("Chest pain and shortness of breath"),
            Department::Cardiology
        );
        assert_eq!(
            Department::from_complaint("persistent cough"),
            Department::Pulmonology
        );
        assert_eq!(
            Department::from_complaint("knee sprain after football"),
            Department::Orthopedics
        );
        assert_eq!(
            Department::from_complaint("leg injury from a fall"),
            Department::EmergencyTrauma
        );
        assert_eq!(
            Department::from_complaint("feeling fine, annual checkup"),
            Department::GeneralMedicine
        );
        assert_eq!(Department::from_complaint(""), Department::DEFAULT);
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&Department::EmergencyTrauma).unwrap();
        assert_eq!(json, "\"Emergency_Trauma\"");
        let back: Department = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Department::EmergencyTrauma);
    }
}
