//! coldstore-batch - DICOM study cold-store archiver
//!
//! Daily batch job: archives every study whose metadata was last updated on
//! the run date (today), moving its files from the hot working area into a
//! per-patient ZIP under the cold-store root, and records the archive in the
//! provenance store.

use anyhow::Result;
use coldstore_batch::Orchestrator;
use coldstore_common::{db::init_index_db, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting coldstore-batch v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::resolve()?;
    info!("Source store: {}", config.source_db.display());
    info!("Hot area root: {}", config.root_dir.display());
    info!("Archive root: {}", config.output_dir.display());

    let index_pool = init_index_db(&config.index_db).await?;

    let orchestrator = Orchestrator::new(config, index_pool);
    let summary = orchestrator.run_today().await;

    // Per-row failures are visible in the log stream only; the process exits
    // normally either way.
    info!(
        processed = summary.processed,
        failed = summary.failed,
        skipped = summary.skipped,
        "run complete"
    );

    Ok(())
}
