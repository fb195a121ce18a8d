//! Dashboard statistics.
//!
//! Pure aggregation over the full patient set and the assignment log,
//! recomputed whenever either input changes. Department volume is driven
//! by the assignment log (the system of record for "which department"),
//! while risk distribution, vitals averages and demographics come from
//! the patient records themselves. An assignment's risk contribution is
//! resolved through its patient_id, falling back to a name match, and
//! counts as LOW when neither resolves — analytics never drop a record.

use serde::Serialize;

use crate::models::{
    AssignmentEvent, Department, PatientRecord, RiskLabel, ALL_DEPARTMENTS,
};

/// Placeholder until wait-time tracking lands in the store schema.
const AVG_WAIT_PLACEHOLDER: &str = "12m";

const AGE_RANGES: [&str; 5] = ["0-18", "19-35", "36-50", "51-65", "65+"];

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentLoad {
    pub department: Department,
    pub total: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub patient_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskSlice {
    pub label: RiskLabel,
    pub count: u32,
}

/// Average vitals per risk label, rounded; zero when no labeled samples.
#[derive(Debug, Clone, Serialize)]
pub struct VitalsAverages {
    pub label: RiskLabel,
    pub heart_rate: u32,
    pub systolic_bp: u32,
    pub o2_saturation: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgeBucket {
    pub range: &'static str,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrivalPoint {
    pub seq: u32,
    pub cumulative: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct KpiSummary {
    pub total_patients: u32,
    pub critical_cases: u32,
    pub active_departments: u32,
    pub avg_wait: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub departments: Vec<DepartmentLoad>,
    pub risk_breakdown: Vec<RiskSlice>,
    pub vitals_by_risk: Vec<VitalsAverages>,
    pub age_histogram: Vec<AgeBucket>,
    pub arrival_trend: Vec<ArrivalPoint>,
    pub kpi: KpiSummary,
}

#[derive(Default)]
struct VitalsAcc {
    heart_rate: i64,
    systolic_bp: i64,
    o2_saturation: i64,
    count: u32,
}

impl VitalsAcc {
    fn averages(&self, label: RiskLabel) -> VitalsAverages {
        let avg = |sum: i64| {
            if self.count == 0 {
                0
            } else {
                (sum as f64 / self.count as f64).round() as u32
            }
        };
        VitalsAverages {
            label,
            heart_rate: avg(self.heart_rate),
            systolic_bp: avg(self.systolic_bp),
            o2_saturation: avg(self.o2_saturation),
        }
    }
}

/// Aggregate dashboard statistics from the two sources of truth.
pub fn aggregate(patients: &[PatientRecord], assignments: &[AssignmentEvent]) -> DashboardStats {
    // Every known department appears, zero volume included.
    let mut departments: Vec<DepartmentLoad> = ALL_DEPARTMENTS
        .into_iter()
        .map(|department| DepartmentLoad {
            department,
            total: 0,
            high: 0,
            medium: 0,
            low: 0,
            patient_names: Vec::new(),
        })
        .collect();

    for assignment in assignments {
        let department = Department::canonicalize(&assignment.department);
        let resolved = patients
            .iter()
            .find(|p| p.id == assignment.patient_id)
            .or_else(|| patients.iter().find(|p| p.name == assignment.patient_name));
        let label = resolved.and_then(|p| p.risk_label).unwrap_or(RiskLabel::Low);

        // canonicalize always lands on a known bucket.
        if let Some(load) = departments.iter_mut().find(|l| l.department == department) {
            load.total += 1;
            load.patient_names.push(assignment.patient_name.clone());
            match label {
                RiskLabel::High => load.high += 1,
                RiskLabel::Medium => load.medium += 1,
                RiskLabel::Low => load.low += 1,
            }
        }
    }

    let mut high = 0u32;
    let mut medium = 0u32;
    let mut low = 0u32;
    let mut high_vitals = VitalsAcc::default();
    let mut medium_vitals = VitalsAcc::default();
    let mut low_vitals = VitalsAcc::default();
    let mut ages = [0u32; 5];

    for patient in patients {
        // Unassessed records count as LOW in the distribution but carry
        // no weight in the vitals averages.
        match patient.risk_label.unwrap_or(RiskLabel::Low) {
            RiskLabel::High => high += 1,
            RiskLabel::Medium => medium += 1,
            RiskLabel::Low => low += 1,
        }
        if let Some(label) = patient.risk_label {
            let acc = match label {
                RiskLabel::High => &mut high_vitals,
                RiskLabel::Medium => &mut medium_vitals,
                RiskLabel::Low => &mut low_vitals,
            };
            acc.heart_rate += patient.heart_rate as i64;
            acc.systolic_bp += patient.systolic_bp as i64;
            acc.o2_saturation += patient.o2_saturation as i64;
            acc.count += 1;
        }

        let bucket = match patient.age {
            0..=18 => 0,
            19..=35 => 1,
            36..=50 => 2,
            51..=65 => 3,
            _ => 4,
        };
        ages[bucket] += 1;
    }

    let risk_breakdown = [
        (RiskLabel::High, high),
        (RiskLabel::Medium, medium),
        (RiskLabel::Low, low),
    ]
    .into_iter()
    .filter(|(_, count)| *count > 0)
    .map(|(label, count)| RiskSlice { label, count })
    .collect();

    let vitals_by_risk = vec![
        low_vitals.averages(RiskLabel::Low),
        medium_vitals.averages(RiskLabel::Medium),
        high_vitals.averages(RiskLabel::High),
    ];

    let age_histogram = AGE_RANGES
        .into_iter()
        .zip(ages)
        .map(|(range, count)| AgeBucket { range, count })
        .collect();

    // Cumulative arrivals, one point per patient in chronological order.
    let arrival_trend = (1..=patients.len() as u32)
        .map(|i| ArrivalPoint {
            seq: i,
            cumulative: i,
        })
        .collect();

    let kpi = KpiSummary {
        total_patients: patients.len() as u32,
        critical_cases: high,
        active_departments: departments.iter().filter(|l| l.total > 0).count() as u32,
        avg_wait: AVG_WAIT_PLACEHOLDER,
    };

    DashboardStats {
        departments,
        risk_breakdown,
        vitals_by_risk,
        age_histogram,
        arrival_trend,
        kpi,
    }
}
