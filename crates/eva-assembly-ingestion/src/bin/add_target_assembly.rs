//! add_target_assembly - move a taxonomy onto a new target assembly

use std::process;
use std::sync::Arc;

use clap::Parser;
use eva_assembly_ingestion::cli::AddTargetAssemblyCli;
use eva_assembly_ingestion::contig_alias::ContigAliasClient;
use eva_assembly_ingestion::db::{create_pool, health_check, DbConfig};
use eva_assembly_ingestion::metadata::PgMetadataStore;
use eva_assembly_ingestion::pipeline::NextflowRunner;
use eva_assembly_ingestion::properties::SpringPropertiesGenerator;
use eva_assembly_ingestion::taxonomy::EnsemblTaxonomyClient;
use eva_assembly_ingestion::tracker::PgTrackerStore;
use eva_assembly_ingestion::{AssemblyConfig, AssemblyIngestionJob, JobServices};
use eva_common::logging::{init_logging, LogConfig, LogLevel};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = AddTargetAssemblyCli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .log_file_prefix("add_target_assembly")
        .build()
        .merge_env_or_keep();
    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {e:#}");
            None
        },
    };

    if let Err(e) = run(cli).await {
        error!(error = %e, "add_target_assembly failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: AddTargetAssemblyCli) -> anyhow::Result<()> {
    let config = AssemblyConfig::load(cli.config.as_deref())?;
    let profile = config.maven_profile()?;

    let pool = create_pool(&DbConfig::from_assembly_config(&config, &profile)?).await?;
    health_check(&pool).await?;
    let services = JobServices {
        tracker: Arc::new(PgTrackerStore::new(pool.clone())),
        metadata: Arc::new(PgMetadataStore::new(pool)),
        pipeline: Arc::new(NextflowRunner::new(
            config.nextflow_executable()?,
            config.remapping.pipeline.clone(),
        )),
        registry: Arc::new(ContigAliasClient::new(&profile.contig_alias_credentials()?)?),
        taxonomy: Arc::new(EnsemblTaxonomyClient::new()?),
    };
    let properties = SpringPropertiesGenerator::from_profile(&profile)?;

    info!(
        taxonomy = cli.taxonomy,
        target_assembly = %cli.target_assembly,
        release_version = cli.release_version,
        tasks = ?cli.tasks,
        "Starting assembly ingestion"
    );

    let job = AssemblyIngestionJob::new(
        config,
        services,
        properties,
        cli.taxonomy,
        cli.target_assembly,
        cli.release_version,
    );
    job.run_all(&cli.tasks, cli.instance, &cli.source_of_assembly, cli.resume)
        .await?;
    Ok(())
}
