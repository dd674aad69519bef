//! Scanbase Ingest - bulk import and enrichment tool

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use scanbase_common::logging::{init_logging, LogConfig, LogLevel};
use scanbase_ingest::enrich::{run_enrich, EnrichOptions};
use scanbase_ingest::import::{run_import, ImportOptions};
use scanbase_ingest::parallel::ENRICH_FLUSH_THRESHOLD;
use scanbase_ingest::store::{MemoryStore, RecordStore};
use scanbase_ingest::writer::DEFAULT_BATCH_SIZE;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "scanbase-ingest")]
#[command(author, version, about = "Scanbase bulk import and enrichment tool")]
struct Cli {
    #[command(subcommand)]
    flow: Flow,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Flow {
    /// Import scan records, skipping barcodes that already exist
    Import {
        /// Input spreadsheet (.xlsx/.xls) or CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Empty the store before importing (full reload)
        #[arg(long)]
        replace: bool,

        /// Worker count (default: host parallelism, capped at 8)
        #[arg(long)]
        workers: Option<usize>,

        /// Rows per grouped store write
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Actually write; without this flag the run is a dry run
        #[arg(long)]
        apply: bool,
    },

    /// Enrich existing records from an asset spreadsheet (user/model/type)
    Enrich {
        /// Input spreadsheet (.xlsx/.xls) or CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Worker count (default: host parallelism, capped at 8)
        #[arg(long)]
        workers: Option<usize>,

        /// Buffered updates per grouped store write
        #[arg(long, default_value_t = ENRICH_FLUSH_THRESHOLD)]
        batch_size: usize,

        /// Stamp this asset type onto every enriched record
        #[arg(long)]
        asset_type: Option<String>,

        /// Actually write; without this flag the run is a dry run
        #[arg(long)]
        apply: bool,
    },
}

/// Open the record store: Postgres when built with the `database` feature
/// and `DATABASE_URL` is set, the in-memory store otherwise (useful for
/// dry runs against a file only).
async fn open_store() -> Result<Arc<dyn RecordStore>> {
    #[cfg(feature = "database")]
    if let Ok(url) = std::env::var("DATABASE_URL") {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await?;
        let store = scanbase_ingest::store::PgStore::new(pool);
        store.ensure_schema().await?;
        info!("connected to database");
        return Ok(Arc::new(store));
    }

    warn!("DATABASE_URL not set, using in-memory store (writes are discarded on exit)");
    Ok(Arc::new(MemoryStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().with_file_prefix("scanbase-ingest");
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }
    init_logging(&log_config)?;

    let store = open_store().await?;

    let report = match cli.flow {
        Flow::Import {
            file,
            replace,
            workers,
            batch_size,
            apply,
        } => {
            info!("starting import");
            let options = ImportOptions {
                apply,
                replace,
                workers,
                batch_size,
            };
            run_import(store, &file, &options).await?
        },
        Flow::Enrich {
            file,
            workers,
            batch_size,
            asset_type,
            apply,
        } => {
            info!("starting enrichment");
            let options = EnrichOptions {
                apply,
                workers,
                batch_size,
                asset_type,
            };
            run_enrich(store, &file, &options).await?
        },
    };

    if report.dry_run {
        info!("dry run complete, re-run with --apply to write");
    }
    info!("done");
    Ok(())
}
