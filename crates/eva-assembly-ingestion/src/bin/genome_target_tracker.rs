//! genome_target_tracker - report species whose supported assembly is out of date

use std::process;

use clap::Parser;
use eva_assembly_ingestion::cli::GenomeTargetTrackerCli;
use eva_assembly_ingestion::db::{create_pool, DbConfig};
use eva_assembly_ingestion::metadata::PgMetadataStore;
use eva_assembly_ingestion::target_tracker::check_supported_target_assembly;
use eva_assembly_ingestion::taxonomy::EnsemblTaxonomyClient;
use eva_common::logging::{init_logging, LogConfig, LogLevel};
use eva_common::maven::MavenSettings;
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = GenomeTargetTrackerCli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .log_file_prefix("genome_target_tracker")
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
        error!(error = %e, "genome_target_tracker failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: GenomeTargetTrackerCli) -> anyhow::Result<()> {
    let profile = MavenSettings::from_file(&cli.private_config_xml_file)?.profile(&cli.profile)?;
    let url = profile.metadata_db_credentials()?.connection_url()?;
    let pool = create_pool(&DbConfig::from_url(url)).await?;

    let metadata = PgMetadataStore::new(pool);
    let lookup = EnsemblTaxonomyClient::new()?;
    let report = check_supported_target_assembly(&metadata, &lookup).await?;

    if !report.mismatched.is_empty() {
        print!("{}", report.format_mismatches());
    }
    Ok(())
}
