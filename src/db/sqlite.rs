//! SQLite-backed patient store.
//!
//! Holds the `patients` table, the append-only `patient_assignments` log
//! and the `doctors` referral directory. Inserts are fanned out to
//! subscribers on a broadcast channel, standing in for the remote store's
//! realtime feed. Timestamps are stored as integer unix milliseconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{PatientStore, StoreError};
use crate::models::{
    ArrivalMode, AssignmentEvent, Department, Doctor, PatientDraft, PatientRecord, RiskLabel,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct SqlitePatientStore {
    pool: SqlitePool,
    events: broadcast::Sender<PatientRecord>,
    roster_cache: DashMap<Department, Vec<Doctor>>,
}

impl SqlitePatientStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(StoreError::Connect)?;
        Self::init_schema(&pool).await?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(url, "patient store ready");
        Ok(Self {
            pool,
            events,
            roster_cache: DashMap::new(),
        })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS patients (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                age INTEGER NOT NULL,
                gender TEXT NOT NULL,
                heart_rate INTEGER NOT NULL,
                systolic_bp INTEGER NOT NULL,
                diastolic_bp INTEGER NOT NULL,
                o2_saturation INTEGER NOT NULL,
                temperature REAL NOT NULL,
                respiratory_rate INTEGER NOT NULL,
                pain_score INTEGER NOT NULL,
                gcs_score INTEGER NOT NULL,
                arrival_mode TEXT NOT NULL,
                diabetes INTEGER NOT NULL,
                hypertension INTEGER NOT NULL,
                heart_disease INTEGER NOT NULL,
                chief_complaint TEXT,
                risk_score REAL,
                risk_label TEXT,
                explanation TEXT,
                department TEXT,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await
        .map_err(StoreError::Connect)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS patient_assignments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                patient_id TEXT NOT NULL,
                patient_name TEXT NOT NULL,
                department TEXT NOT NULL,
                assigned_at INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await
        .map_err(StoreError::Connect)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS doctors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                department TEXT NOT NULL,
                doc_name TEXT NOT NULL,
                experience_years INTEGER NOT NULL,
                is_available INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await
        .map_err(StoreError::Connect)?;

        Ok(())
    }

    /// Add a doctor to the referral directory.
    #[instrument(skip(self), fields(department = department.canonical_name()))]
    pub async fn insert_doctor(
        &self,
        department: Department,
        name: &str,
        experience_years: i32,
        available: bool,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO doctors (department, doc_name, experience_years, is_available)
             VALUES (?, ?, ?, ?)",
        )
        .bind(department.canonical_name())
        .bind(name)
        .bind(experience_years)
        .bind(available)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Write)?;
        self.roster_cache.remove(&department);
        Ok(())
    }

    fn patient_from_row(row: &SqliteRow) -> Result<PatientRecord, sqlx::Error> {
        let arrival_mode: String = row.try_get("arrival_mode")?;
        let risk_label: Option<String> = row.try_get("risk_label")?;
        let department: Option<String> = row.try_get("department")?;
        let created_ms: i64 = row.try_get("created_at")?;
        Ok(PatientRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            age: row.try_get::<i64, _>("age")? as u32,
            gender: row.try_get("gender")?,
            heart_rate: row.try_get("heart_rate")?,
            systolic_bp: row.try_get("systolic_bp")?,
            diastolic_bp: row.try_get("diastolic_bp")?,
            o2_saturation: row.try_get("o2_saturation")?,
            temperature: row.try_get("temperature")?,
            respiratory_rate: row.try_get("respiratory_rate")?,
            pain_score: row.try_get("pain_score")?,
            gcs_score: row.try_get("gcs_score")?,
            arrival_mode: ArrivalMode::parse(&arrival_mode),
            diabetes: row.try_get("diabetes")?,
            hypertension: row.try_get("hypertension")?,
            heart_disease: row.try_get("heart_disease")?,
            chief_complaint: row.try_get("chief_complaint")?,
            risk_score: row.try_get("risk_score")?,
            risk_label: risk_label.as_deref().and_then(RiskLabel::parse),
            explanation: row.try_get("explanation")?,
            department: department.as_deref().map(Department::canonicalize),
            created_at: DateTime::<Utc>::from_timestamp_millis(created_ms).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl PatientStore for SqlitePatientStore {
    #[instrument(skip(self))]
    async fn fetch_patients(&self) -> Result<Vec<PatientRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM patients ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Read)?;
        rows.iter()
            .map(|row| Self::patient_from_row(row).map_err(StoreError::Read))
            .collect()
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn insert_patient(&self, draft: &PatientDraft) -> Result<PatientRecord, StoreError> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        sqlx::query(
            "INSERT INTO patients (
                id, name, age, gender, heart_rate, systolic_bp, diastolic_bp,
                o2_saturation, temperature, respiratory_rate, pain_score,
                gcs_score, arrival_mode, diabetes, hypertension, heart_disease,
                chief_complaint, risk_score, risk_label, explanation,
                department, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&draft.name)
        .bind(draft.age as i64)
        .bind(&draft.gender)
        .bind(draft.heart_rate)
        .bind(draft.systolic_bp)
        .bind(draft.diastolic_bp)
        .bind(draft.o2_saturation)
        .bind(draft.temperature)
        .bind(draft.respiratory_rate)
        .bind(draft.pain_score)
        .bind(draft.gcs_score)
        .bind(draft.arrival_mode.as_str())
        .bind(draft.diabetes)
        .bind(draft.hypertension)
        .bind(draft.heart_disease)
        .bind(&draft.chief_complaint)
        .bind(draft.risk_score)
        .bind(draft.risk_label.map(RiskLabel::as_str))
        .bind(&draft.explanation)
        .bind(draft.department.map(Department::canonical_name))
        .bind(created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(StoreError::Write)?;

        let record = draft.clone().into_record(id, created_at);
        // Nobody listening is fine; the queue subscribes when it wants
        // the live feed.
        let _ = self.events.send(record.clone());
        Ok(record)
    }

    fn subscribe(&self) -> broadcast::Receiver<PatientRecord> {
        self.events.subscribe()
    }

    #[instrument(skip(self))]
    async fn fetch_assignments(&self) -> Result<Vec<AssignmentEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, patient_id, patient_name, department, assigned_at
             FROM patient_assignments ORDER BY assigned_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Read)?;

        rows.iter()
            .map(|row| {
                let assigned_ms: i64 = row.try_get("assigned_at").map_err(StoreError::Read)?;
                Ok(AssignmentEvent {
                    id: row.try_get("id").map_err(StoreError::Read)?,
                    patient_id: row.try_get("patient_id").map_err(StoreError::Read)?,
                    patient_name: row.try_get("patient_name").map_err(StoreError::Read)?,
                    department: row.try_get("department").map_err(StoreError::Read)?,
                    assigned_at: DateTime::<Utc>::from_timestamp_millis(assigned_ms)
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    #[instrument(skip(self, patient), fields(patient_id = %patient.id, department = department.canonical_name()))]
    async fn record_assignment(
        &self,
        patient: &PatientRecord,
        department: Department,
    ) -> Result<AssignmentEvent, StoreError> {
        let assigned_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO patient_assignments (patient_id, patient_name, department, assigned_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&patient.id)
        .bind(&patient.name)
        .bind(department.canonical_name())
        .bind(assigned_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(StoreError::Write)?;

        Ok(AssignmentEvent {
            id: result.last_insert_rowid(),
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            department: department.canonical_name().to_string(),
            assigned_at,
        })
    }

    async fn department_roster(&self, department: Department) -> Result<Vec<Doctor>, StoreError> {
        if let Some(cached) = self.roster_cache.get(&department) {
            return Ok(cached.value().clone());
        }

        let rows = sqlx::query(
            "SELECT doc_name, experience_years, is_available
             FROM doctors WHERE department = ?",
        )
        .bind(department.canonical_name())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Read)?;

        let doctors: Vec<Doctor> = rows
            .iter()
            .map(|row| {
                Ok(Doctor {
                    name: row.try_get("doc_name").map_err(StoreError::Read)?,
                    experience: row.try_get("experience_years").map_err(StoreError::Read)?,
                    available: row.try_get("is_available").map_err(StoreError::Read)?,
                })
            })
            .collect::<Result<_, StoreError>>()?;

        if doctors.is_empty() {
            warn!(
                department = department.canonical_name(),
                "no doctors on file for department"
            );
        }
        self.roster_cache.insert(department, doctors.clone());
        Ok(doctors)
    }
}
