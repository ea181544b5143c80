//! DocVerify CLI - extraction review from the terminal
//!
//! The `docverify` command works against the same store as `docverifyd`.
//!
//! ## Commands
//!
//! - `import`: Load extraction hand-offs from a JSON file
//! - `list`: Filtered listing, newest first
//! - `show`: One record with its fields
//! - `edit`: Correct and/or verify one field
//! - `fail` / `reopen`: Status overrides
//! - `export`: JSON or CSV snapshot
//! - `stats`: Review progress summary
//! - `history`: Audit trail of one record

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Instrument, Level};

use docverify_core::{
    init_tracing, record_span, ExportFormat, ExtractionFilter, ExtractionId, ExtractionRecord,
    ExtractionRepository, ExtractionStatus, FieldId, FieldPatch, NewExtraction, RecordSpan,
    ReviewEvent, ReviewStats, SurrealHandle, VerificationService, VerifyError, METRICS,
};
use docverify_state::SurrealExtractionStore;

const DEFAULT_CLI_DB: &str = "surrealkv://.docverify/store";

#[derive(Parser)]
#[command(name = "docverify")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "DocVerify extraction review", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON: log lines on stderr, command output on stdout
    #[arg(long, global = true)]
    json: bool,

    /// SurrealDB URL
    #[arg(long, global = true, env = "DOCVERIFY_DB_URL", default_value = DEFAULT_CLI_DB)]
    db: String,

    /// Operator recorded in the audit trail
    #[arg(long, global = true, env = "DOCVERIFY_OPERATOR", default_value = "cli")]
    operator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import extraction hand-offs (one JSON object or an array)
    Import {
        /// Path to the hand-off file
        file: PathBuf,
    },

    /// List records, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show one record
    Show {
        /// Extraction ID
        id: String,
    },

    /// Edit one field
    Edit {
        /// Extraction ID
        id: String,

        /// Field ID
        field: String,

        /// Corrected value
        #[arg(long)]
        value: Option<String>,

        /// Mark the field verified
        #[arg(long, conflicts_with = "unverify")]
        verify: bool,

        /// Clear the verified flag
        #[arg(long)]
        unverify: bool,

        /// Note kept in the audit trail
        #[arg(short = 'm', long)]
        comment: Option<String>,
    },

    /// Mark a record as failed verification
    Fail {
        /// Extraction ID
        id: String,

        /// Why the record failed
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Return a failed record to review
    Reopen {
        /// Extraction ID
        id: String,
    },

    /// Export a snapshot of the matching records
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output format (json or csv)
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show review progress
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show the audit trail of one record
    History {
        /// Extraction ID
        id: String,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Case-insensitive substring of the document title
    #[arg(long)]
    text: Option<String>,

    /// Status (pending_verification, verified, verification_failed, or 待验证/已验证/验证失败)
    #[arg(long)]
    status: Option<ExtractionStatus>,

    /// Exact source document ID
    #[arg(long)]
    document_id: Option<String>,

    /// Minimum record confidence
    #[arg(long)]
    min_confidence: Option<f64>,
}

impl From<FilterArgs> for ExtractionFilter {
    fn from(args: FilterArgs) -> Self {
        ExtractionFilter {
            text: args.text.filter(|t| !t.trim().is_empty()),
            status: args.status,
            document_id: args.document_id.filter(|d| !d.trim().is_empty()),
            min_confidence: args.min_confidence,
        }
    }
}

/// Hand-off file contents: one record or many.
#[derive(Deserialize)]
#[serde(untagged)]
enum HandoffFile {
    Many(Vec<NewExtraction>),
    One(Box<NewExtraction>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    init_tracing(cli.json, level);

    let service = open_service(&cli.db).await?;
    let operator = cli.operator.as_str();
    let json = cli.json;

    let result = match cli.command {
        Commands::Import { file } => cmd_import(&service, &file, operator).await.map(|n| {
            println!("Imported {} record(s)", n);
        }),
        Commands::List { filter } => cmd_list(&service, filter.into(), json),
        Commands::Show { id } => cmd_show(&service, &id, json),
        Commands::Edit {
            id,
            field,
            value,
            verify,
            unverify,
            comment,
        } => {
            let verified = match (verify, unverify) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            cmd_edit(
                &service,
                &id,
                &field,
                FieldPatch {
                    value,
                    verified,
                    comment,
                },
                operator,
                json,
            )
            .await
        }
        Commands::Fail { id, reason } => cmd_fail(&service, &id, reason, operator, json).await,
        Commands::Reopen { id } => cmd_reopen(&service, &id, operator, json).await,
        Commands::Export {
            filter,
            format,
            output,
        } => cmd_export(&service, filter.into(), format, output.as_deref()),
        Commands::Stats { filter } => cmd_stats(&service, filter.into(), json),
        Commands::History { id } => cmd_history(&service, &id, json).await,
    };

    METRICS.flush();
    result
}

async fn open_service(db_url: &str) -> Result<VerificationService> {
    let handle = SurrealHandle::setup_from_env(db_url)
        .await
        .context("Failed to connect to DocVerify database")?;
    let store = Arc::new(SurrealExtractionStore::new(&handle));
    let repo = ExtractionRepository::open(store)
        .await
        .context("Failed to load extraction records")?;
    Ok(VerificationService::new(Arc::new(repo)))
}

/// Import hand-offs; records already present are skipped.
async fn cmd_import(service: &VerificationService, path: &Path, operator: &str) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let handoffs = match serde_json::from_str::<HandoffFile>(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?
    {
        HandoffFile::Many(list) => list,
        HandoffFile::One(one) => vec![*one],
    };

    let mut imported = 0;
    for new in handoffs {
        match service.import(new, operator).await {
            Ok(record) => {
                info!(extraction_id = %record.id(), "imported");
                imported += 1;
            }
            Err(VerifyError::AlreadyExists(id)) => {
                eprintln!("Skipping {}: already imported", id);
            }
            Err(e) => return Err(e).context("Import failed"),
        }
    }
    Ok(imported)
}

fn cmd_list(service: &VerificationService, filter: ExtractionFilter, json: bool) -> Result<()> {
    let records = service.list(&filter)?;
    if json {
        let items: Vec<&ExtractionRecord> = records.iter().map(|r| r.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No records match");
        return Ok(());
    }
    for record in &records {
        println!("{}", render_summary_line(record));
    }
    Ok(())
}

fn cmd_show(service: &VerificationService, id: &str, json: bool) -> Result<()> {
    let _span = RecordSpan::enter(id);
    let record = service.get(&ExtractionId::new(id))?;
    print_record(&record, json)
}

async fn cmd_edit(
    service: &VerificationService,
    id: &str,
    field: &str,
    patch: FieldPatch,
    operator: &str,
    json: bool,
) -> Result<()> {
    let record = service
        .edit_field(&ExtractionId::new(id), &FieldId::new(field), &patch, operator)
        .instrument(record_span(id))
        .await?;
    print_record(&record, json)
}

async fn cmd_fail(
    service: &VerificationService,
    id: &str,
    reason: Option<String>,
    operator: &str,
    json: bool,
) -> Result<()> {
    let record = service
        .mark_failed(&ExtractionId::new(id), reason, operator)
        .instrument(record_span(id))
        .await?;
    print_record(&record, json)
}

async fn cmd_reopen(
    service: &VerificationService,
    id: &str,
    operator: &str,
    json: bool,
) -> Result<()> {
    let record = service
        .reopen(&ExtractionId::new(id), operator)
        .instrument(record_span(id))
        .await?;
    print_record(&record, json)
}

fn cmd_export(
    service: &VerificationService,
    filter: ExtractionFilter,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let snapshot = service.export(&filter)?;
    let body = snapshot.render(format)?;
    match output {
        Some(path) => {
            std::fs::write(path, &body)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Exported {} row(s) from {} record(s) to {} (sha256 {})",
                snapshot.row_count,
                snapshot.record_count,
                path.display(),
                snapshot.digest
            );
        }
        None => print!("{}", body),
    }
    Ok(())
}

fn cmd_stats(service: &VerificationService, filter: ExtractionFilter, json: bool) -> Result<()> {
    let stats = service.stats(&filter)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", render_stats(&stats));
    }
    Ok(())
}

async fn cmd_history(service: &VerificationService, id: &str, json: bool) -> Result<()> {
    let events = service
        .history(&ExtractionId::new(id))
        .instrument(record_span(id))
        .await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }
    if events.is_empty() {
        println!("No history for '{}'", id);
    }
    for event in &events {
        println!("{}", render_event_line(event));
    }
    Ok(())
}

fn print_record(record: &ExtractionRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        print!("{}", render_record(record));
    }
    Ok(())
}

fn render_summary_line(record: &ExtractionRecord) -> String {
    format!(
        "{}  {}  {}  {:.0}% ({})  {}/{} verified  {}",
        record.id(),
        record.extracted_at().format("%Y-%m-%d %H:%M"),
        record.status().label(),
        record.confidence() * 100.0,
        record.confidence_band(),
        record.verified_count(),
        record.fields().len(),
        record.document_title()
    )
}

fn render_record(record: &ExtractionRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("extraction {}\n", record.id()));
    out.push_str(&format!(
        "Document: {} ({})\n",
        record.document_title(),
        record.document_id()
    ));
    out.push_str(&format!(
        "Status:   {} [{}] v{}\n",
        record.status().label(),
        record.status(),
        record.version()
    ));
    if let Some(reason) = record.failure_reason() {
        out.push_str(&format!("Reason:   {}\n", reason));
    }
    out.push_str(&format!(
        "Confidence: {:.2} ({})\n\n",
        record.confidence(),
        record.confidence_band()
    ));
    for field in record.fields() {
        let mark = if field.is_verified() { "x" } else { " " };
        out.push_str(&format!(
            "  [{}] {} {}: {}",
            mark,
            field.id(),
            field.name(),
            field.value()
        ));
        if field.is_corrected() {
            out.push_str(&format!(" (was: {})", field.original_value()));
        }
        out.push('\n');
    }
    out
}

fn render_stats(stats: &ReviewStats) -> String {
    format!(
        "Records: {} ({} pending, {} verified, {} failed)\n\
         Fields:  {} ({} verified, {} unverified, {} corrected)\n\
         Verification rate: {:.1}%\n",
        stats.total_records,
        stats.pending_records,
        stats.verified_records,
        stats.failed_records,
        stats.total_fields,
        stats.verified_fields,
        stats.unverified_fields,
        stats.corrected_fields,
        stats.verification_rate * 100.0
    )
}

fn render_event_line(event: &ReviewEvent) -> String {
    format!(
        "{}  v{}  {:<13} {} -> {}  by {}",
        event.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        event.version,
        event.action.kind(),
        event.status_before,
        event.status_after,
        event.actor
    )
}
