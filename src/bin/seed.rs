use std::env;
use std::error::Error;
use std::path::PathBuf;

use cctv_incidents::config::load_config;
use cctv_incidents::db::models::{IncidentType, NewCamera, NewIncident, DEFAULT_THUMBNAIL_URL};
use cctv_incidents::db::repositories::cameras::CamerasRepository;
use cctv_incidents::db::repositories::incidents::IncidentsRepository;
use cctv_incidents::db::repositories::{CameraStore, IncidentStore};
use cctv_incidents::db::DatabaseService;
use cctv_incidents::security::SecurityService;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// (camera index, type, hours ago, duration in minutes)
const SCRIPTED: [(usize, IncidentType, f64, i64); 16] = [
    (0, IncidentType::UnauthorisedAccess, 2.5, 2),
    (0, IncidentType::GunThreat, 6.0, 5),
    (0, IncidentType::FaceRecognised, 8.5, 1),
    (0, IncidentType::UnauthorisedAccess, 12.0, 3),
    (0, IncidentType::FaceRecognised, 15.5, 2),
    (1, IncidentType::UnauthorisedAccess, 1.0, 4),
    (1, IncidentType::GunThreat, 4.5, 3),
    (1, IncidentType::FaceRecognised, 9.0, 1),
    (1, IncidentType::UnauthorisedAccess, 14.0, 2),
    (1, IncidentType::GunThreat, 18.5, 6),
    (2, IncidentType::FaceRecognised, 0.5, 1),
    (2, IncidentType::UnauthorisedAccess, 3.0, 2),
    (2, IncidentType::GunThreat, 7.5, 4),
    (2, IncidentType::FaceRecognised, 11.0, 1),
    (2, IncidentType::UnauthorisedAccess, 16.5, 3),
    (2, IncidentType::GunThreat, 20.0, 5),
];

const OLDER_INCIDENTS: usize = 10;

fn incident(
    camera_id: i32,
    incident_type: IncidentType,
    now: DateTime<Utc>,
    hours_ago: f64,
    duration_minutes: i64,
    rng: &mut impl Rng,
) -> NewIncident {
    let ts_start = now - Duration::seconds((hours_ago * 3600.0) as i64);
    NewIncident {
        camera_id,
        incident_type,
        ts_start,
        ts_end: ts_start + Duration::minutes(duration_minutes),
        thumbnail_url: DEFAULT_THUMBNAIL_URL.to_string(),
        // Roughly a third already handled
        resolved: rng.gen_bool(0.3),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Same config file argument as the server; DATABASE_URL still wins
    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;

    info!("Seeding database at {}", config.database.url);

    let database = DatabaseService::new(&config.database).await?;
    if !config.database.auto_migrate {
        database.run_migrations().await?;
    }

    sqlx::query("TRUNCATE incidents, cameras RESTART IDENTITY")
        .execute(&*database.pool)
        .await?;
    info!("Cleared existing cameras and incidents");

    let cameras_repo = CamerasRepository::new(database.pool.clone());
    let incidents_repo = IncidentsRepository::new(database.pool.clone());

    let mut cameras = Vec::new();
    for (name, location) in [("Shop Floor A", "Shop"), ("Vault", "Backroom"), ("Entrance", "Front")] {
        let camera = cameras_repo
            .create(&NewCamera {
                name: name.to_string(),
                location: location.to_string(),
            })
            .await?;
        cameras.push(camera);
    }
    info!("Created {} cameras", cameras.len());

    let now = Utc::now();
    let mut rng = rand::thread_rng();
    let mut batch = Vec::with_capacity(SCRIPTED.len() + OLDER_INCIDENTS);

    for (camera, incident_type, hours_ago, minutes) in SCRIPTED {
        batch.push(incident(cameras[camera].id, incident_type, now, hours_ago, minutes, &mut rng));
    }

    // Older history, 24 to 72 hours back
    for _ in 0..OLDER_INCIDENTS {
        let camera_id = cameras[rng.gen_range(0..cameras.len())].id;
        let incident_type = IncidentType::ALL[rng.gen_range(0..IncidentType::ALL.len())];
        let hours_ago = rng.gen_range(24.0..72.0);
        let minutes = rng.gen_range(1..=5);
        batch.push(incident(camera_id, incident_type, now, hours_ago, minutes, &mut rng));
    }

    for new_incident in &batch {
        incidents_repo.create(new_incident).await?;
    }
    info!("Created {} incidents", batch.len());

    let stats = incidents_repo.stats().await?;
    info!("Database summary:");
    info!("  Cameras: {}", stats.total_cameras);
    info!("  Total incidents: {}", stats.total_incidents);
    info!("  Unresolved incidents: {}", stats.unresolved_incidents);
    for (incident_type, count) in &stats.incidents_by_type {
        info!("  {}: {}", incident_type, count);
    }

    let token = SecurityService::new(config.security.clone()).generate_token(
        "seed",
        "Development Operator",
        "operator",
    )?;
    info!(
        "Development bearer token (expires in {}s):",
        token.expires_in
    );
    println!("{}", token.access_token);

    Ok(())
}
