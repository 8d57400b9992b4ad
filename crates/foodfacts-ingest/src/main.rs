//! Foodfacts ingest - main entry point

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use foodfacts_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use foodfacts_ingest::catalog::ProductCatalog;
use foodfacts_ingest::config::IngestConfig;
use foodfacts_ingest::index::{ElasticsearchIndex, SearchIndex};
use foodfacts_ingest::models::{ProductStatus, ProductUpdate};
use foodfacts_ingest::pipeline::{ImportCoordinator, ImportService, RunOutcome};
use foodfacts_ingest::scheduler::ImportScheduler;
use foodfacts_ingest::store::{PgProductStore, ProductStore};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "foodfacts-ingest", version, about = "Import the food products dataset")]
struct Cli {
    /// Debug-level console logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one import now
    Run,

    /// Run the import every day at the configured time until interrupted
    Schedule,

    /// Change the name and/or status of a stored product
    Update {
        #[arg(long)]
        code: String,

        #[arg(long)]
        name: Option<String>,

        /// draft, published or trash
        #[arg(long)]
        status: Option<ProductStatus>,
    },

    /// Move a product to the trash and drop it from the search index
    Trash {
        #[arg(long)]
        code: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("foodfacts-ingest")
        .build();

    // Environment variables take precedence over flags
    let _guard = match log_config.merge_env().and_then(|config| init_logging(&config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {:#}", e);
            process::exit(2);
        },
    };

    if let Err(e) = execute_command(cli.command).await {
        let message = format!("{:#}", e);
        error!(error = %message, "Command failed");
        process::exit(1);
    }
}

struct Backends {
    store: Arc<dyn ProductStore>,
    index: Arc<dyn SearchIndex>,
}

async fn connect(config: &IngestConfig) -> Result<Backends> {
    let store = PgProductStore::connect(&config.database)
        .await
        .context("Failed to connect to the primary store")?;
    store.migrate().await?;

    let search_client = reqwest::Client::builder()
        .connect_timeout(config.source.connect_timeout())
        .build()
        .context("Failed to build search index client")?;

    Ok(Backends {
        store: Arc::new(store),
        index: Arc::new(ElasticsearchIndex::new(search_client, &config.search)),
    })
}

async fn execute_command(command: Commands) -> Result<()> {
    let config = IngestConfig::from_env().context("Invalid ingest configuration")?;
    let backends = connect(&config).await?;

    match command {
        Commands::Run => {
            let service = ImportService::new(ImportCoordinator::from_config(
                &config,
                backends.store,
                backends.index,
            )?);
            match service.trigger().await? {
                RunOutcome::Finished(report) => info!(
                    run_id = %report.run_id,
                    source_file = ?report.source_file,
                    accepted = report.accepted,
                    skipped = report.skipped(),
                    failed = report.failed,
                    elapsed_ms = report.elapsed_ms(),
                    "Import finished"
                ),
                RunOutcome::AlreadyRunning => info!("Import already running"),
            }
        },
        Commands::Schedule => {
            let service = ImportService::new(ImportCoordinator::from_config(
                &config,
                backends.store,
                backends.index,
            )?);
            let scheduler = ImportScheduler::start(service, &config.schedule).await?;

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
            scheduler.shutdown().await?;
        },
        Commands::Update { code, name, status } => {
            let update = ProductUpdate { name, status };
            if update.is_empty() {
                bail!("Nothing to update, pass --name and/or --status");
            }
            let catalog = ProductCatalog::new(backends.store, backends.index);
            match catalog.update(&code, update).await? {
                Some(product) => info!(
                    code = %product.code(),
                    name = %product.product.name,
                    status = %product.product.status,
                    "Product updated"
                ),
                None => bail!("No product with code '{}'", code),
            }
        },
        Commands::Trash { code } => {
            let catalog = ProductCatalog::new(backends.store, backends.index);
            if catalog.trash(&code).await?.is_none() {
                bail!("No product with code '{}'", code);
            }
        },
    }

    Ok(())
}
