//! DocVerify review daemon.
//!
//! Serves the review API over HTTP/JSON. Records live in SurrealDB
//! (`mem://` by default) and are loaded into the in-memory repository on
//! startup.

mod api;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};

use docverify_core::{
    init_tracing, ExtractionRepository, NewExtraction, ReviewConfig, SurrealHandle,
    VerificationService, VerifyError, METRICS,
};
use docverify_state::SurrealExtractionStore;

const SEED_ACTOR: &str = "seed";

#[derive(Parser)]
#[command(name = "docverifyd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "DocVerify extraction review daemon", long_about = None)]
struct Args {
    /// Address to listen on (overrides DOCVERIFY_BIND)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// SurrealDB URL, e.g. mem:// or surrealkv://data/docverify (overrides DOCVERIFY_DB_URL)
    #[arg(long)]
    db: Option<String>,

    /// JSON array of extraction hand-offs to import at startup (overrides DOCVERIFY_SEED)
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json_logs: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(args.json_logs, level);

    let mut config = ReviewConfig::from_env().context("Invalid DOCVERIFY_* configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(db) = args.db {
        config.db_url = db;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    let handle = SurrealHandle::setup_from_env(&config.db_url)
        .await
        .context("Failed to connect to DocVerify database")?;
    let store = Arc::new(SurrealExtractionStore::new(&handle));
    let repo = ExtractionRepository::open(store)
        .await
        .context("Failed to load extraction records")?;
    let service =
        Arc::new(VerificationService::new(Arc::new(repo)).with_retry_policy(config.retry));

    if let Some(path) = config.seed.as_deref() {
        seed(&service, path).await?;
    }

    let app = api::review_router(api::AppState::new(service.clone()));
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    info!(
        bind = %config.bind,
        db = %config.db_url,
        records = service.repository().len()?,
        "docverifyd listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    METRICS.flush();
    info!("docverifyd stopped");
    Ok(())
}

/// Import seed hand-offs; records already present are left untouched.
async fn seed(service: &VerificationService, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let handoffs: Vec<NewExtraction> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse seed file {}", path.display()))?;

    let mut imported = 0;
    for new in handoffs {
        match service.import(new, SEED_ACTOR).await {
            Ok(_) => imported += 1,
            Err(VerifyError::AlreadyExists(id)) => {
                warn!(extraction_id = %id, "seed record already present, skipping");
            }
            Err(e) => return Err(e).context("Failed to import seed record"),
        }
    }
    info!(imported, path = %path.display(), "seed import complete");
    Ok(imported)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use docverify_core::ExtractionId;

    #[tokio::test]
    async fn seed_skips_existing_records() {
        let service = VerificationService::new(Arc::new(ExtractionRepository::in_memory()));
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("seed.json");
        std::fs::write(
            &path,
            r#"[
                {
                    "id": "seed-1",
                    "document_id": "doc-1",
                    "document_title": "采购合同.pdf",
                    "extracted_at": "2024-01-15T14:30:00Z",
                    "confidence": 0.95,
                    "fields": [
                        {"id": "f1", "name": "合同编号", "value": "HT-2024-001"}
                    ]
                }
            ]"#,
        )
        .expect("write seed");

        assert_eq!(seed(&service, &path).await.expect("first seed"), 1);
        assert_eq!(seed(&service, &path).await.expect("second seed"), 0);

        let record = service
            .get(&ExtractionId::new("seed-1"))
            .expect("seeded record");
        assert_eq!(record.fields().len(), 1);
    }

    #[tokio::test]
    async fn seed_rejects_malformed_file() {
        let service = VerificationService::new(Arc::new(ExtractionRepository::in_memory()));
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("seed.json");
        std::fs::write(&path, "{not json").expect("write seed");

        assert!(seed(&service, &path).await.is_err());
    }
}
