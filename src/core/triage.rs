//! Remote risk assessment with a guaranteed local answer.
//!
//! One call per submission: POST the vitals to the scoring service and
//! adopt its result; on any failure (unreachable, non-2xx, malformed or
//! out-of-range body) score locally instead. Callers always get a usable
//! [`TriageResult`] back, never an error — the failure reason is recorded
//! on the client state for advisory display.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::scoring;
use crate::models::{PatientVitals, TriageResult};

/// Why the remote scoring service could not be used for a request.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scoring service unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("scoring service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed scoring response: {0}")]
    Malformed(#[source] reqwest::Error),
    #[error("scoring response out of range: risk_score={0}")]
    OutOfRange(f64),
}

/// Request body for `POST /predict`, field names fixed by the service.
#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    #[serde(rename = "Age")]
    age: u32,
    #[serde(rename = "Gender")]
    gender: &'a str,
    #[serde(rename = "Heart_Rate")]
    heart_rate: i32,
    #[serde(rename = "Systolic_BP")]
    systolic_bp: i32,
    #[serde(rename = "Diastolic_BP")]
    diastolic_bp: i32,
    #[serde(rename = "O2_Saturation")]
    o2_saturation: i32,
    #[serde(rename = "Temperature")]
    temperature: f64,
    #[serde(rename = "Respiratory_Rate")]
    respiratory_rate: i32,
    #[serde(rename = "Pain_Score")]
    pain_score: i32,
    #[serde(rename = "GCS_Score")]
    gcs_score: i32,
    #[serde(rename = "Arrival_Mode")]
    arrival_mode: &'static str,
    #[serde(rename = "Diabetes")]
    diabetes: bool,
    #[serde(rename = "Hypertension")]
    hypertension: bool,
    #[serde(rename = "Heart_Disease")]
    heart_disease: bool,
    #[serde(rename = "Chief_Complaint", skip_serializing_if = "Option::is_none")]
    chief_complaint: Option<&'a str>,
}

impl<'a> PredictRequest<'a> {
    fn from_vitals(v: &'a PatientVitals) -> Self {
        Self {
            age: v.age,
            gender: &v.gender,
            heart_rate: v.heart_rate,
            systolic_bp: v.systolic_bp,
            diastolic_bp: v.diastolic_bp,
            o2_saturation: v.o2_saturation,
            temperature: v.temperature,
            respiratory_rate: v.respiratory_rate,
            pain_score: v.pain_score,
            gcs_score: v.gcs_score,
            arrival_mode: v.arrival_mode.as_str(),
            diabetes: v.diabetes,
            hypertension: v.hypertension,
            heart_disease: v.heart_disease,
            chief_complaint: v.chief_complaint.as_deref(),
        }
    }
}

/// Observable assessment state.
///
/// `loading` is true only while a remote call is outstanding; `error`
/// holds the last remote failure reason and is cleared on each new
/// attempt; `last_result` is whatever the most recently resolved call
/// produced — concurrent calls are independent and the last to resolve
/// wins.
#[derive(Debug, Clone, Default)]
pub struct AssessState {
    pub loading: bool,
    pub error: Option<String>,
    pub last_result: Option<TriageResult>,
}

pub struct TriageClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    state: Mutex<AssessState>,
}

impl TriageClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
            state: Mutex::new(AssessState::default()),
        }
    }

    /// Assess one patient. Always produces a result: the remote answer
    /// when the service cooperates, the local ruleset otherwise.
    pub async fn assess(&self, vitals: &PatientVitals) -> TriageResult {
        {
            let mut state = self.state.lock().await;
            state.loading = true;
            state.error = None;
        }

        let (result, error) = match self.remote_predict(vitals).await {
            Ok(result) => {
                debug!(risk_label = %result.risk_label, "remote scoring succeeded");
                (result, None)
            }
            Err(err) => {
                warn!(%err, "remote scoring failed, using local ruleset");
                (scoring::score(vitals), Some(err.to_string()))
            }
        };

        let mut state = self.state.lock().await;
        state.loading = false;
        state.error = error;
        state.last_result = Some(result.clone());
        result
    }

    async fn remote_predict(&self, vitals: &PatientVitals) -> Result<TriageResult, ScoringError> {
        let url = format!("{}/predict", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&PredictRequest::from_vitals(vitals))
            .send()
            .await
            .map_err(ScoringError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::Status(status));
        }

        let result: TriageResult = response.json().await.map_err(ScoringError::Malformed)?;
        if !(0.0..=1.0).contains(&result.risk_score) {
            return Err(ScoringError::OutOfRange(result.risk_score));
        }
        Ok(result)
    }

    /// Snapshot of the observable state.
    pub async fn state(&self) -> AssessState {
        self.state.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_request_uses_service_field_names() {
        let vitals = PatientVitals::default();
        let body = serde_json::to_value(PredictRequest::from_vitals(&vitals)).unwrap();
        assert_eq!(body["Heart_Rate"], 75);
        assert_eq!(body["Systolic_BP"], 120);
        assert_eq!(body["O2_Saturation"], 98);
        assert_eq!(body["GCS_Score"], 15);
        assert_eq!(body["Arrival_Mode"], "Walk-in");
        // Optional complaint is omitted entirely when absent.
        assert!(body.get("Chief_Complaint").is_none());
    }

    #[tokio::test]
    async fn unreachable_service_falls_back_to_local_ruleset() {
        // Port 9 is the discard service; nothing listens there.
        let client = TriageClient::new("http://127.0.0.1:9", Duration::from_millis(500));
        let vitals = PatientVitals {
            heart_rate: 190,
            ..PatientVitals::default()
        };

        let result = client.assess(&vitals).await;
        assert_eq!(result, scoring::score(&vitals));

        let state = client.state().await;
        assert!(!state.loading);
        assert!(state.error.is_some());
        assert_eq!(state.last_result, Some(result));
    }

    #[tokio::test]
    async fn error_is_cleared_on_each_attempt() {
        let client = TriageClient::new("http://127.0.0.1:9", Duration::from_millis(500));
        let vitals = PatientVitals::default();
        client.assess(&vitals).await;
        assert!(client.state().await.error.is_some());
        // A second failed attempt records its own reason, not a stale one.
        client.assess(&vitals).await;
        let state = client.state().await;
        assert!(state.error.is_some());
        assert!(state.last_result.is_some());
    }
}
