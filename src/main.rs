//! PARS command line: one-shot assessment, the live intake simulator and
//! dashboard statistics.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pars::config::Config;
use pars::core::{aggregate, referral, scoring, ActiveQueueProjection, PatientQueueStore, TriageClient};
use pars::db::{PatientStore, SqlitePatientStore};
use pars::models::{ArrivalMode, Department, PatientDraft, PatientVitals};

const RANDOM_NAMES: [&str; 10] = [
    "J. Smith",
    "M. Garcia",
    "A. Chen",
    "R. Patel",
    "K. Williams",
    "S. Johnson",
    "D. Brown",
    "L. Martinez",
    "T. Anderson",
    "N. Taylor",
];

#[derive(Parser)]
#[command(name = "pars", about = "Patient Acuity & Risk System triage engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess one patient and print the triage result
    Assess {
        #[arg(long, default_value_t = 30)]
        age: u32,
        #[arg(long, default_value = "Male")]
        gender: String,
        #[arg(long, default_value_t = 75)]
        heart_rate: i32,
        #[arg(long, default_value_t = 120)]
        systolic_bp: i32,
        #[arg(long, default_value_t = 80)]
        diastolic_bp: i32,
        #[arg(long, default_value_t = 98)]
        o2_saturation: i32,
        #[arg(long, default_value_t = 37.0)]
        temperature: f64,
        #[arg(long, default_value_t = 16)]
        respiratory_rate: i32,
        #[arg(long, default_value_t = 0)]
        pain_score: i32,
        #[arg(long, default_value_t = 15)]
        gcs_score: i32,
        #[arg(long, default_value = "Walk-in")]
        arrival_mode: String,
        #[arg(long)]
        diabetes: bool,
        #[arg(long)]
        hypertension: bool,
        #[arg(long)]
        heart_disease: bool,
        #[arg(long)]
        chief_complaint: Option<String>,
        /// Skip the remote service and score with the local ruleset
        #[arg(long)]
        offline: bool,
    },
    /// Feed randomized intakes through the full triage pipeline
    Simulate {
        /// Number of patients to submit
        #[arg(long, default_value_t = 10)]
        count: u32,
        /// Milliseconds between submissions
        #[arg(long, default_value_t = 5000)]
        interval_ms: u64,
    },
    /// Print dashboard statistics for the current store contents
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Assess {
            age,
            gender,
            heart_rate,
            systolic_bp,
            diastolic_bp,
            o2_saturation,
            temperature,
            respiratory_rate,
            pain_score,
            gcs_score,
            arrival_mode,
            diabetes,
            hypertension,
            heart_disease,
            chief_complaint,
            offline,
        } => {
            let vitals = PatientVitals {
                age,
                gender,
                heart_rate,
                systolic_bp,
                diastolic_bp,
                o2_saturation,
                temperature,
                respiratory_rate,
                pain_score,
                gcs_score,
                arrival_mode: ArrivalMode::parse(&arrival_mode),
                diabetes,
                hypertension,
                heart_disease,
                chief_complaint,
            };
            run_assess(&config, &vitals, offline).await?;
        }
        Commands::Simulate { count, interval_ms } => {
            run_simulate(&config, count, Duration::from_millis(interval_ms)).await?;
        }
        Commands::Stats => {
            run_stats(&config).await?;
        }
    }
    Ok(())
}

async fn run_assess(config: &Config, vitals: &PatientVitals, offline: bool) -> Result<()> {
    let result = if offline {
        scoring::score(vitals)
    } else {
        let client = TriageClient::new(config.scoring_url.clone(), config.scoring_timeout);
        let result = client.assess(vitals).await;
        if let Some(reason) = client.state().await.error {
            warn!(%reason, "remote scoring unavailable, served local fallback");
        }
        result
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_simulate(config: &Config, count: u32, interval: Duration) -> Result<()> {
    let store = Arc::new(SqlitePatientStore::connect(&config.database_url).await?);
    seed_roster(&store).await?;

    let queue = Arc::new(PatientQueueStore::new(store.clone()));
    queue.load().await?;
    let _subscription = queue.clone().spawn_subscription();

    let projection = ActiveQueueProjection::new(config.active_window);
    let (mut active_rx, _projection_task) = projection.spawn(queue.clone());
    tokio::spawn(async move {
        while active_rx.changed().await.is_ok() {
            let active = active_rx.borrow().clone();
            let head = active.first().map(|p| p.name.clone()).unwrap_or_default();
            info!(active = active.len(), %head, "active queue");
        }
    });

    let client = TriageClient::new(config.scoring_url.clone(), config.scoring_timeout);
    let mut rng = rand::thread_rng();

    for n in 0..count {
        let name = RANDOM_NAMES[rng.gen_range(0..RANDOM_NAMES.len())];
        let vitals = random_vitals(&mut rng);
        let result = client.assess(&vitals).await;

        let referral = match &result.referral {
            Some(referral) => referral.clone(),
            None => referral::resolve(&*store, vitals.chief_complaint.as_deref(), &result.details)
                .await,
        };
        let department = Department::canonicalize(&referral.department);

        let draft = PatientDraft::from_assessment(name, &vitals, &result);
        match queue.insert(draft).await {
            Ok(record) => {
                store.record_assignment(&record, department).await?;
                info!(
                    n = n + 1,
                    name,
                    risk = %result.risk_label,
                    department = department.canonical_name(),
                    "patient triaged"
                );
            }
            Err(err) => warn!(%err, name, "submission failed, intake rolled back"),
        }

        if n + 1 < count {
            tokio::time::sleep(interval).await;
        }
    }

    let patients = store.fetch_patients().await?;
    let assignments = store.fetch_assignments().await?;
    let stats = aggregate(&patients, &assignments);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn run_stats(config: &Config) -> Result<()> {
    let store = SqlitePatientStore::connect(&config.database_url).await?;
    let patients = store.fetch_patients().await?;
    let assignments = store.fetch_assignments().await?;
    let stats = aggregate(&patients, &assignments);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn seed_roster(store: &SqlitePatientStore) -> Result<()> {
    if !store
        .department_roster(Department::GeneralMedicine)
        .await?
        .is_empty()
    {
        return Ok(());
    }
    let seed = [
        (Department::Cardiology, "Dr. Ibarra", 14, true),
        (Department::Cardiology, "Dr. Nkemelu", 6, false),
        (Department::Pulmonology, "Dr. Osei", 12, true),
        (Department::EmergencyTrauma, "Dr. Sandoval", 9, true),
        (Department::GeneralMedicine, "Dr. Whitfield", 21, true),
    ];
    for (department, name, years, available) in seed {
        store.insert_doctor(department, name, years, available).await?;
    }
    Ok(())
}

fn random_vitals(rng: &mut impl Rng) -> PatientVitals {
    PatientVitals {
        age: rng.gen_range(18..88),
        gender: if rng.gen_bool(0.5) { "Male" } else { "Female" }.to_string(),
        heart_rate: rng.gen_range(50..150),
        systolic_bp: rng.gen_range(80..180),
        diastolic_bp: rng.gen_range(50..100),
        o2_saturation: rng.gen_range(85..100),
        temperature: (rng.gen_range(350..400) as f64) / 10.0,
        respiratory_rate: rng.gen_range(8..33),
        pain_score: rng.gen_range(0..=10),
        gcs_score: rng.gen_range(3..=15),
        arrival_mode: if rng.gen_bool(0.3) {
            ArrivalMode::Ambulance
        } else {
            ArrivalMode::WalkIn
        },
        diabetes: rng.gen_bool(0.2),
        hypertension: rng.gen_bool(0.3),
        heart_disease: rng.gen_bool(0.15),
        chief_complaint: None,
    }
}
