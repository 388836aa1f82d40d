//! In-memory stand-ins for the job's external services
//!
//! Each fake records the calls made to it so tests can assert on both the
//! resulting state and what was (not) touched.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use eva_assembly_ingestion::contig_alias::AssemblyRegistry;
use eva_assembly_ingestion::error::{IngestError, Result};
use eva_assembly_ingestion::metadata::{MetadataStore, SourceAssemblyProjects, SupportedAssembly};
use eva_assembly_ingestion::pipeline::{PipelineInvocation, PipelineRunner};
use eva_assembly_ingestion::properties::SpringPropertiesGenerator;
use eva_assembly_ingestion::taxonomy::TaxonomyLookup;
use eva_assembly_ingestion::tracker::{
    CountUpdate, DbsnpSourceAssembly, RemappingStatus, TrackerKey, TrackerRow, TrackerStore,
    VariantSource,
};
use eva_assembly_ingestion::{AssemblyConfig, AssemblyIngestionJob, JobServices};
use eva_common::maven::{MongoCredentials, PgCredentials, ServiceCredentials};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const TARGET: &str = "GCA_002263795.2";
pub const RELEASE: i32 = 5;

// ============================================================================
// Tracker
// ============================================================================

#[derive(Default)]
pub struct FakeTracker {
    pub rows: Mutex<Vec<TrackerRow>>,
    pub insert_calls: Mutex<usize>,
    /// Status updates to this status fail with a database error
    pub failing_status: Option<RemappingStatus>,
}

impl FakeTracker {
    pub fn with_rows(rows: Vec<TrackerRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            insert_calls: Mutex::new(0),
            failing_status: None,
        }
    }

    pub fn snapshot(&self) -> Vec<TrackerRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn status_of(&self, origin: &str, source: VariantSource) -> Vec<Option<RemappingStatus>> {
        self.snapshot()
            .into_iter()
            .filter(|r| r.origin_assembly_accession == origin && r.source == source)
            .map(|r| r.remapping_status)
            .collect()
    }
}

fn matches_key(row: &TrackerRow, key: &TrackerKey) -> bool {
    row.release_version == key.release_version
        && row.taxonomy == key.taxonomy
        && row.origin_assembly_accession == key.origin_assembly_accession
        && row.assembly_accession == key.assembly_accession
}

#[async_trait]
impl TrackerStore for FakeTracker {
    async fn load(&self, taxonomies: &[i32], target_assembly: &str, release_version: i32) -> Result<Vec<TrackerRow>> {
        let mut rows: Vec<TrackerRow> = self
            .snapshot()
            .into_iter()
            .filter(|r| {
                taxonomies.contains(&r.taxonomy)
                    && r.assembly_accession == target_assembly
                    && r.release_version == release_version
            })
            .collect();
        rows.sort_by(|a, b| {
            (&a.origin_assembly_accession, a.taxonomy, a.source)
                .cmp(&(&b.origin_assembly_accession, b.taxonomy, b.source))
        });
        Ok(rows)
    }

    async fn dbsnp_source_assemblies(&self, taxonomies: &[i32], reference_release: i32) -> Result<Vec<DbsnpSourceAssembly>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|r| {
                r.source == VariantSource::Dbsnp
                    && r.release_version == reference_release
                    && taxonomies.contains(&r.taxonomy)
            })
            .map(|r| DbsnpSourceAssembly {
                origin_assembly_accession: r.origin_assembly_accession,
                taxonomy: r.taxonomy,
                num_studies: r.num_studies,
            })
            .collect())
    }

    async fn insert_pending(&self, rows: &[TrackerRow]) -> Result<u64> {
        *self.insert_calls.lock().unwrap() += 1;
        let mut stored = self.rows.lock().unwrap();
        let mut inserted = 0;
        for row in rows {
            let exists = stored
                .iter()
                .any(|r| matches_key(r, &row.key()) && r.source == row.source);
            if !exists {
                stored.push(row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn set_status(&self, key: &TrackerKey, status: RemappingStatus, at: NaiveDateTime) -> Result<bool> {
        if self.failing_status == Some(status) {
            return Err(IngestError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut stored = self.rows.lock().unwrap();
        let mut found = false;
        for row in stored.iter_mut().filter(|r| matches_key(r, key)) {
            found = true;
            row.remapping_status = Some(status);
            match status {
                RemappingStatus::Started => row.remapping_start = Some(at),
                RemappingStatus::Completed => row.remapping_end = Some(at),
                _ => {},
            }
        }
        Ok(found)
    }

    async fn set_counts(&self, key: &TrackerKey, source: VariantSource, counts: &CountUpdate) -> Result<bool> {
        let mut stored = self.rows.lock().unwrap();
        let mut found = false;
        for row in stored
            .iter_mut()
            .filter(|r| matches_key(r, key) && r.source == source)
        {
            found = true;
            if counts.extracted.is_some() {
                row.num_ss_extracted = counts.extracted;
            }
            if counts.remapped.is_some() {
                row.num_ss_remapped = counts.remapped;
            }
            if counts.ingested.is_some() {
                row.num_ss_ingested = counts.ingested;
            }
        }
        Ok(found)
    }
}

// ============================================================================
// Metadata
// ============================================================================

#[derive(Default)]
pub struct FakeMetadata {
    pub sharing: Vec<i32>,
    pub projects: Vec<SourceAssemblyProjects>,
    pub current: Mutex<BTreeMap<i32, String>>,
    pub replaced: Mutex<Vec<(i32, String, String, NaiveDate)>>,
    pub inserted_assemblies: Mutex<Vec<(String, i32, Option<String>)>>,
}

#[async_trait]
impl MetadataStore for FakeMetadata {
    async fn taxonomies_sharing_current_assembly(&self, _taxonomy: i32) -> Result<Vec<i32>> {
        Ok(self.sharing.clone())
    }

    async fn source_assemblies_and_projects(&self, taxonomies: &[i32]) -> Result<Vec<SourceAssemblyProjects>> {
        Ok(self
            .projects
            .iter()
            .filter(|p| taxonomies.contains(&p.taxonomy))
            .cloned()
            .collect())
    }

    async fn current_supported_assembly(&self, taxonomy: i32) -> Result<Option<String>> {
        Ok(self.current.lock().unwrap().get(&taxonomy).cloned())
    }

    async fn replace_current_supported_assembly(
        &self,
        taxonomy: i32,
        source_of_assembly: &str,
        target_assembly: &str,
        today: NaiveDate,
    ) -> Result<()> {
        self.current
            .lock()
            .unwrap()
            .insert(taxonomy, target_assembly.to_string());
        self.replaced.lock().unwrap().push((
            taxonomy,
            source_of_assembly.to_string(),
            target_assembly.to_string(),
            today,
        ));
        Ok(())
    }

    async fn insert_assembly_and_taxonomy(
        &self,
        assembly_accession: &str,
        taxonomy: i32,
        scientific_name: Option<&str>,
    ) -> Result<()> {
        self.inserted_assemblies.lock().unwrap().push((
            assembly_accession.to_string(),
            taxonomy,
            scientific_name.map(str::to_string),
        ));
        Ok(())
    }

    async fn all_taxonomies(&self) -> Result<Vec<i32>> {
        Ok(self.sharing.clone())
    }

    async fn current_supported_assemblies(&self) -> Result<Vec<SupportedAssembly>> {
        Ok(self
            .current
            .lock()
            .unwrap()
            .iter()
            .map(|(taxonomy, assembly)| SupportedAssembly {
                taxonomy_id: *taxonomy,
                source: "Ensembl".to_string(),
                assembly_id: assembly.clone(),
            })
            .collect())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Records invocations. On success writes the count files the real pipeline
/// would leave behind.
#[derive(Default)]
pub struct FakePipeline {
    pub fail_for: HashSet<String>,
    pub invocations: Mutex<Vec<PipelineInvocation>>,
}

impl FakePipeline {
    pub fn failing_for(assembly: &str) -> Self {
        Self {
            fail_for: HashSet::from([assembly.to_string()]),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invoked_assemblies(&self) -> Vec<String> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.source_assembly.clone())
            .collect()
    }
}

fn resource(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("resources")
        .join(name)
}

fn copy_resource(name: &str, dest: &Path) {
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
    std::fs::copy(resource(name), dest).unwrap();
}

#[async_trait]
impl PipelineRunner for FakePipeline {
    async fn run(&self, invocation: &PipelineInvocation) -> Result<()> {
        self.invocations.lock().unwrap().push(invocation.clone());
        if self.fail_for.contains(&invocation.source_assembly) {
            return Err(IngestError::PipelineFailed {
                assembly: invocation.source_assembly.clone(),
                status: "exit status: 1".to_string(),
            });
        }

        let root = &invocation.assembly_directory;
        let src = &invocation.source_assembly;
        copy_resource("vcf_extractor.log", &root.join("logs").join(format!("{src}_vcf_extractor.log")));
        copy_resource("remapped_counts.yml", &root.join("eva").join(format!("{src}_eva_remapped_counts.yml")));
        copy_resource(
            "remapped_counts.yml",
            &root.join("dbsnp").join(format!("{src}_dbsnp_remapped_counts.yml")),
        );
        copy_resource(
            "vcf_ingestion.log",
            &root.join("logs").join(format!("{src}_eva_remapped.vcf_ingestion.log")),
        );
        copy_resource(
            "vcf_ingestion.log",
            &root.join("logs").join(format!("{src}_dbsnp_remapped.vcf_ingestion.log")),
        );
        Ok(())
    }
}

// ============================================================================
// Contig alias and taxonomy
// ============================================================================

#[derive(Default)]
pub struct FakeRegistry {
    pub inserted: Mutex<Vec<String>>,
}

#[async_trait]
impl AssemblyRegistry for FakeRegistry {
    async fn insert_assembly(&self, accession: &str) -> Result<bool> {
        self.inserted.lock().unwrap().push(accession.to_string());
        Ok(true)
    }
}

pub struct FakeTaxonomy;

#[async_trait]
impl TaxonomyLookup for FakeTaxonomy {
    async fn scientific_name(&self, taxonomy: i32) -> Result<Option<String>> {
        Ok(match taxonomy {
            9913 => Some("Bos taurus".to_string()),
            9915 => Some("Bos indicus".to_string()),
            _ => None,
        })
    }

    async fn ensembl_species_name(&self, taxonomy: i32) -> Result<Option<String>> {
        Ok(self
            .scientific_name(taxonomy)
            .await?
            .map(|n| n.to_lowercase().replace(' ', "_")))
    }

    async fn ensembl_assembly(&self, _species_name: &str) -> Result<Option<String>> {
        Ok(Some(TARGET.to_string()))
    }
}

// ============================================================================
// Job construction
// ============================================================================

pub struct Harness {
    pub tracker: Arc<FakeTracker>,
    pub metadata: Arc<FakeMetadata>,
    pub pipeline: Arc<FakePipeline>,
    pub registry: Arc<FakeRegistry>,
    pub base_directory: tempfile::TempDir,
}

impl Harness {
    pub fn new(tracker: FakeTracker, metadata: FakeMetadata, pipeline: FakePipeline) -> Self {
        Self {
            tracker: Arc::new(tracker),
            metadata: Arc::new(metadata),
            pipeline: Arc::new(pipeline),
            registry: Arc::new(FakeRegistry::default()),
            base_directory: tempfile::tempdir().unwrap(),
        }
    }

    pub fn job(&self, taxonomy: i32) -> AssemblyIngestionJob {
        let config = AssemblyConfig::from_yaml(&format!(
            r#"
maven:
  environment: development
  settings_file: /secrets/settings.xml
remapping:
  base_directory: {}
  pipeline: /pipelines/remap_cluster.nf
genome_downloader:
  output_directory: /genomes
executable:
  nextflow: /usr/bin/nextflow
"#,
            self.base_directory.path().display()
        ))
        .unwrap();

        let services = JobServices {
            tracker: self.tracker.clone(),
            metadata: self.metadata.clone(),
            pipeline: self.pipeline.clone(),
            registry: self.registry.clone(),
            taxonomy: Arc::new(FakeTaxonomy),
        };
        AssemblyIngestionJob::new(config, services, properties(), taxonomy, TARGET, RELEASE)
    }
}

pub fn properties() -> SpringPropertiesGenerator {
    SpringPropertiesGenerator::new(
        PgCredentials {
            jdbc_url: "jdbc:postgresql://pg.example:5432/accession".to_string(),
            user: "acc".to_string(),
            password: "acc".to_string(),
        },
        MongoCredentials {
            host: "mongo.example".to_string(),
            user: "mongo".to_string(),
            password: "mongo".to_string(),
        },
        ServiceCredentials {
            url: "https://counts.example".to_string(),
            user: "counts".to_string(),
            password: "counts".to_string(),
        },
    )
}

/// Tracker row of this job's target and release with the given status
pub fn row(source: VariantSource, taxonomy: i32, origin: &str, status: RemappingStatus) -> TrackerRow {
    let mut row = TrackerRow::pending(source, taxonomy, None, origin, TARGET, RELEASE, 1);
    row.remapping_status = Some(status);
    row
}
