use std::env;

use library::Catalog;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let data_dir = env::args()
        .nth(1)
        .or_else(|| env::var("TRACKHUB_DATA_DIR").ok())
        .unwrap_or_else(|| "data".to_string());

    let catalog = Catalog::open(&data_dir)?;
    info!("Migrating catalog at {:?}", catalog.root());
    let report = catalog.migrate_all()?;
    if report.tracks_failed > 0 {
        warn!("{} track documents could not be migrated", report.tracks_failed);
    }

    println!(
        "Tracks: {} migrated, {} already current, {} failed; genres {}",
        report.tracks_migrated,
        report.tracks_current,
        report.tracks_failed,
        if report.genres_migrated { "migrated" } else { "current" }
    );

    Ok(())
}
