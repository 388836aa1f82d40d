//! Assembly ingestion job
//!
//! Moves every variant of a group of taxonomies onto a new target assembly:
//!
//! 1. `load_tracker` - create one Pending tracker row per source assembly and variant source
//! 2. `remap_cluster` - run the remap/cluster pipeline once per source assembly not yet Completed
//! 3. `update_dbs` - once everything is Completed, make the target the supported assembly
//!
//! Each task can be re-run. `load_tracker` does nothing when rows already exist
//! and `remap_cluster` skips assemblies whose rows are all Completed, so an
//! interrupted job is resumed by running it again.

pub mod layout;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::config::AssemblyConfig;
use crate::contig_alias::AssemblyRegistry;
use crate::counts::{count_variants_extracted, count_variants_ingested, count_variants_remapped};
use crate::error::Result;
use crate::metadata::{add_to_supported_assemblies, MetadataStore};
use crate::pipeline::{PipelineInvocation, PipelineRunner};
use crate::properties::{rs_report_file_name, RemapClusterConfig, SpringPropertiesGenerator};
use crate::report::print_tracker_rows;
use crate::taxonomy::{MemoizedScientificNames, TaxonomyLookup};
use crate::tracker::{CountUpdate, RemappingStatus, TrackerKey, TrackerRow, TrackerStore, VariantSource};

pub use layout::AssemblyLayout;

/// Steps of the job, in the order they always run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum Task {
    #[value(name = "load_tracker")]
    LoadTracker,
    #[value(name = "remap_cluster")]
    RemapCluster,
    #[value(name = "update_dbs")]
    UpdateDbs,
}

impl Task {
    pub const ALL: [Task; 3] = [Task::LoadTracker, Task::RemapCluster, Task::UpdateDbs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::LoadTracker => "load_tracker",
            Task::RemapCluster => "remap_cluster",
            Task::UpdateDbs => "update_dbs",
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remapping is only needed when the variants are not already on the target
pub fn check_remapping_required(source_assembly: &str, target_assembly: &str) -> bool {
    source_assembly != target_assembly
}

/// External services the job talks to
#[derive(Clone)]
pub struct JobServices {
    pub tracker: Arc<dyn TrackerStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub pipeline: Arc<dyn PipelineRunner>,
    pub registry: Arc<dyn AssemblyRegistry>,
    pub taxonomy: Arc<dyn TaxonomyLookup>,
}

pub struct AssemblyIngestionJob {
    config: AssemblyConfig,
    services: JobServices,
    properties: SpringPropertiesGenerator,
    scientific_names: MemoizedScientificNames,
    source_taxonomy: i32,
    target_assembly: String,
    release_version: i32,
    taxonomies: OnceCell<Vec<i32>>,
}

impl AssemblyIngestionJob {
    pub fn new(
        config: AssemblyConfig,
        services: JobServices,
        properties: SpringPropertiesGenerator,
        taxonomy: i32,
        target_assembly: impl Into<String>,
        release_version: i32,
    ) -> Self {
        let scientific_names = MemoizedScientificNames::new(services.taxonomy.clone());
        Self {
            config,
            services,
            properties,
            scientific_names,
            source_taxonomy: taxonomy,
            target_assembly: target_assembly.into(),
            release_version,
            taxonomies: OnceCell::new(),
        }
    }

    /// Every taxonomy currently on the same supported assembly as the source
    /// taxonomy. Falls back to the source taxonomy alone.
    pub async fn taxonomies(&self) -> Result<&[i32]> {
        let taxonomies = self
            .taxonomies
            .get_or_try_init(|| async {
                let mut taxonomies = self
                    .services
                    .metadata
                    .taxonomies_sharing_current_assembly(self.source_taxonomy)
                    .await?;
                if taxonomies.is_empty() {
                    taxonomies.push(self.source_taxonomy);
                }
                taxonomies.sort_unstable();
                taxonomies.dedup();
                info!(source_taxonomy = self.source_taxonomy, ?taxonomies, "Taxonomies in this job");
                Ok::<_, crate::error::IngestError>(taxonomies)
            })
            .await?;
        Ok(taxonomies.as_slice())
    }

    /// Run the selected tasks in their fixed order
    pub async fn run_all(
        &self,
        tasks: &[Task],
        instance: u32,
        source_of_assembly: &str,
        resume: bool,
    ) -> Result<()> {
        for task in Task::ALL.into_iter().filter(|t| tasks.contains(t)) {
            info!(task = %task, target_assembly = %self.target_assembly, "Running task");
            match task {
                Task::LoadTracker => {
                    self.load_tracker().await?;
                },
                Task::RemapCluster => self.remap_cluster(instance, resume).await?,
                Task::UpdateDbs => {
                    self.update_dbs(source_of_assembly).await?;
                },
            }
        }
        Ok(())
    }

    async fn tracker_rows(&self) -> Result<Vec<TrackerRow>> {
        let taxonomies = self.taxonomies().await?;
        self.services
            .tracker
            .load(taxonomies, &self.target_assembly, self.release_version)
            .await
    }

    // ========================================================================
    // load_tracker
    // ========================================================================

    /// Create the tracker rows of this job. Returns the number of rows inserted.
    ///
    /// Nothing is loaded when any row already exists for these taxonomies,
    /// target assembly and release.
    pub async fn load_tracker(&self) -> Result<u64> {
        let existing = self.tracker_rows().await?;
        if !existing.is_empty() {
            warn!(
                taxonomies = ?self.taxonomies().await?,
                target_assembly = %self.target_assembly,
                "Jobs already exist, not loading anything new"
            );
            print_tracker_rows(&existing);
            return Ok(0);
        }

        let rows = self.pending_rows().await?;
        if rows.is_empty() {
            warn!(
                taxonomies = ?self.taxonomies().await?,
                target_assembly = %self.target_assembly,
                "Nothing to process"
            );
            return Ok(0);
        }

        let inserted = self.services.tracker.insert_pending(&rows).await?;
        info!(inserted, "Tracker loaded");
        print_tracker_rows(&rows);
        Ok(inserted)
    }

    async fn pending_rows(&self) -> Result<Vec<TrackerRow>> {
        let taxonomies = self.taxonomies().await?;
        let mut rows = Vec::new();

        // 1. EVA: reference assemblies of public projects
        for source in self
            .services
            .metadata
            .source_assemblies_and_projects(taxonomies)
            .await?
        {
            rows.push(TrackerRow::pending(
                VariantSource::Eva,
                source.taxonomy,
                self.scientific_names.get(source.taxonomy).await?,
                source.assembly_accession,
                self.target_assembly.clone(),
                self.release_version,
                i32::try_from(source.project_accessions.len()).unwrap_or(i32::MAX),
            ));
        }

        // 2. dbSNP: not in metadata, taken from the reference release of the tracker
        for source in self
            .services
            .tracker
            .dbsnp_source_assemblies(taxonomies, self.config.tracker.dbsnp_reference_release)
            .await?
        {
            rows.push(TrackerRow::pending(
                VariantSource::Dbsnp,
                source.taxonomy,
                self.scientific_names.get(source.taxonomy).await?,
                source.origin_assembly_accession,
                self.target_assembly.clone(),
                self.release_version,
                source.num_studies,
            ));
        }

        Ok(rows)
    }

    // ========================================================================
    // remap_cluster
    // ========================================================================

    /// Source assemblies with at least one row not Completed, with the
    /// taxonomies tracked against each
    pub async fn incomplete_assemblies(&self) -> Result<BTreeMap<String, Vec<i32>>> {
        let mut by_assembly: BTreeMap<String, (bool, Vec<i32>)> = BTreeMap::new();
        for row in self.tracker_rows().await? {
            let entry = by_assembly
                .entry(row.origin_assembly_accession.clone())
                .or_insert_with(|| (false, Vec::new()));
            entry.0 |= !row.is_completed();
            if !entry.1.contains(&row.taxonomy) {
                entry.1.push(row.taxonomy);
            }
        }

        Ok(by_assembly
            .into_iter()
            .filter(|(_, (incomplete, _))| *incomplete)
            .map(|(assembly, (_, mut taxonomies))| {
                taxonomies.sort_unstable();
                (assembly, taxonomies)
            })
            .collect())
    }

    /// Remap and cluster every incomplete source assembly, one after another.
    ///
    /// Failed and Started assemblies are run again; with `resume` Nextflow
    /// picks up from its work directory. The first pipeline failure stops the
    /// loop.
    pub async fn remap_cluster(&self, instance: u32, resume: bool) -> Result<()> {
        let incomplete = self.incomplete_assemblies().await?;
        if incomplete.is_empty() {
            info!(target_assembly = %self.target_assembly, "All source assemblies are already Completed");
            return Ok(());
        }

        for (source_assembly, taxonomies) in &incomplete {
            info!(
                source_assembly = %source_assembly,
                ?taxonomies,
                "Running remapping and clustering"
            );
            self.process_one_assembly(source_assembly, taxonomies, instance, resume)
                .await?;
        }
        Ok(())
    }

    async fn process_one_assembly(
        &self,
        source_assembly: &str,
        taxonomies: &[i32],
        instance: u32,
        resume: bool,
    ) -> Result<()> {
        self.set_status(source_assembly, taxonomies, RemappingStatus::Started)
            .await?;

        let layout = AssemblyLayout::new(&self.config.remapping.base_directory, taxonomies, source_assembly);
        tokio::fs::create_dir_all(layout.work_dir()).await?;
        let remapping_required = check_remapping_required(source_assembly, &self.target_assembly);
        self.write_run_files(&layout, source_assembly, taxonomies, instance, remapping_required)
            .await?;

        let invocation = PipelineInvocation {
            source_assembly: source_assembly.to_string(),
            assembly_directory: layout.root().to_path_buf(),
            params_file: layout.remap_cluster_config(),
            work_dir: layout.work_dir(),
            log_file: layout.process_log(),
            resume,
        };
        if let Err(e) = self.services.pipeline.run(&invocation).await {
            error!(source_assembly, error = %e, "Nextflow remapping pipeline failed");
            if let Err(status_error) = self
                .set_status(source_assembly, taxonomies, RemappingStatus::Failed)
                .await
            {
                error!(source_assembly, error = %status_error, "Could not mark source assembly as Failed");
            }
            return Err(e);
        }

        self.set_status(source_assembly, taxonomies, RemappingStatus::Completed)
            .await?;

        if remapping_required {
            self.count_variants_from_logs(&layout, source_assembly, taxonomies)
                .await?;
        } else {
            info!(source_assembly, "No remapping required. Skipping variant counts from logs");
        }
        Ok(())
    }

    async fn write_run_files(
        &self,
        layout: &AssemblyLayout,
        source_assembly: &str,
        taxonomies: &[i32],
        instance: u32,
        remapping_required: bool,
    ) -> Result<()> {
        let extraction = self
            .properties
            .remapping_extraction_properties(taxonomies, source_assembly, ".");
        tokio::fs::write(layout.extraction_properties(), extraction).await?;

        let ingestion = self
            .properties
            .remapping_ingestion_properties(source_assembly, &self.target_assembly);
        tokio::fs::write(layout.ingestion_properties(), ingestion).await?;

        let clustering = self.properties.clustering_properties(
            instance,
            source_assembly,
            &self.target_assembly,
            &rs_report_file_name(source_assembly, &self.target_assembly),
        );
        tokio::fs::write(layout.clustering_properties(), clustering).await?;

        let run_config = RemapClusterConfig {
            taxonomy_list: taxonomies.to_vec(),
            source_assembly_accession: source_assembly.to_string(),
            target_assembly_accession: self.target_assembly.clone(),
            species_name: self.scientific_names.get(self.source_taxonomy).await?,
            output_dir: layout.root().to_path_buf(),
            genome_assembly_dir: self.config.genome_downloader.output_directory.clone(),
            extraction_properties: layout.extraction_properties(),
            ingestion_properties: layout.ingestion_properties(),
            clustering_properties: layout.clustering_properties(),
            clustering_instance: instance,
            remapping_config: self.config.source_file.clone(),
            remapping_required,
            executable: self.config.executable.clone(),
            nextflow: self.config.nextflow.clone(),
            jar: self.config.jar.clone(),
        };
        run_config.write_to(&layout.remap_cluster_config()).await
    }

    async fn set_status(
        &self,
        source_assembly: &str,
        taxonomies: &[i32],
        status: RemappingStatus,
    ) -> Result<()> {
        let now = now();
        for &taxonomy in taxonomies {
            self.services
                .tracker
                .set_status(&self.key(source_assembly, taxonomy), status, now)
                .await?;
        }
        Ok(())
    }

    fn key(&self, source_assembly: &str, taxonomy: i32) -> TrackerKey {
        TrackerKey {
            release_version: self.release_version,
            taxonomy,
            origin_assembly_accession: source_assembly.to_string(),
            assembly_accession: self.target_assembly.clone(),
        }
    }

    /// Read the counts written by the pipeline and record them on the EVA and
    /// dbSNP rows of every taxonomy in the group
    pub async fn count_variants_from_logs(
        &self,
        layout: &AssemblyLayout,
        source_assembly: &str,
        taxonomies: &[i32],
    ) -> Result<()> {
        let extracted = count_variants_extracted(&layout.extraction_log()).await?;

        for source in [VariantSource::Eva, VariantSource::Dbsnp] {
            let remapped = count_variants_remapped(&layout.remapped_counts(source)).await?;
            // Items read rather than ingested, so that variants written by an
            // earlier attempt are still counted
            let ingested = count_variants_ingested(&layout.ingestion_log(source)).await?;
            let (read, written) = match source {
                VariantSource::Eva => (extracted.eva_read, extracted.eva_written),
                VariantSource::Dbsnp => (extracted.dbsnp_read, extracted.dbsnp_written),
            };

            let update = CountUpdate {
                extracted: to_db_count(written),
                remapped: to_db_count(Some(remapped.remapped)),
                ingested: to_db_count(ingested.read),
            };
            for &taxonomy in taxonomies {
                self.services
                    .tracker
                    .set_counts(&self.key(source_assembly, taxonomy), source, &update)
                    .await?;
            }

            info!(
                source_assembly,
                source = %source,
                read = ?read,
                written = ?written,
                attempted = ?remapped.candidate,
                remapped = remapped.remapped,
                unmapped = remapped.unmapped,
                ingested = ?ingested.ingested,
                duplicates = ?ingested.duplicates,
                "Variant counts"
            );
        }
        Ok(())
    }

    // ========================================================================
    // update_dbs
    // ========================================================================

    /// Point the downstream stores at the target assembly. Returns false
    /// without changing anything while any source assembly is incomplete.
    pub async fn update_dbs(&self, source_of_assembly: &str) -> Result<bool> {
        if self.tracker_rows().await?.is_empty() {
            warn!(
                target_assembly = %self.target_assembly,
                release_version = self.release_version,
                "No tracker rows for this job, updating databases without any remapping"
            );
        }
        let incomplete = self.incomplete_assemblies().await?;
        if !incomplete.is_empty() {
            warn!(
                incomplete = ?incomplete.keys().collect::<Vec<_>>(),
                "Processing for these source assemblies is not yet complete. Not updating databases."
            );
            return Ok(false);
        }

        let taxonomies = self.taxonomies().await?;
        let today = Local::now().date_naive();

        // 1. Supported assembly history
        for &taxonomy in taxonomies {
            add_to_supported_assemblies(
                self.services.metadata.as_ref(),
                taxonomy,
                source_of_assembly,
                &self.target_assembly,
                today,
            )
            .await?;
        }

        // 2. General metadata
        for &taxonomy in taxonomies {
            let scientific_name = self.scientific_names.get(taxonomy).await?;
            self.services
                .metadata
                .insert_assembly_and_taxonomy(&self.target_assembly, taxonomy, scientific_name.as_deref())
                .await?;
        }

        // 3. Contig alias
        self.services
            .registry
            .insert_assembly(&self.target_assembly)
            .await?;

        info!(target_assembly = %self.target_assembly, "Metadata database updates complete");
        Ok(true)
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn to_db_count(count: Option<u64>) -> Option<i64> {
    count.and_then(|c| i64::try_from(c).ok())
}
