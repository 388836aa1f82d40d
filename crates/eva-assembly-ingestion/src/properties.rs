//! Spring properties and pipeline parameter files
//!
//! The Java remapping, ingestion and clustering jobs read their settings from
//! `.properties` files. All three share the accessioning datasource and Mongo
//! block; each adds its own job parameters.

use crate::error::Result;
use eva_common::maven::{MavenProfile, MongoCredentials, PgCredentials, ServiceCredentials};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const EXTRACTION_JOB: &str = "EXPORT_SUBMITTED_VARIANTS_JOB";
pub const INGESTION_JOB: &str = "INGEST_REMAPPED_VARIANTS_FROM_VCF_JOB";
pub const ACCESSIONING_MONGO_DATABASE: &str = "eva_accession_sharded";

const SS_BLOCK_START: u64 = 5_000_000_000;
const RS_BLOCK_START: u64 = 3_000_000_000;
const BLOCK_SIZE: u64 = 100_000;
const NEXT_BLOCK_INTERVAL: u64 = 1_000_000_000;

/// Ordered `key=value` lines with blank-line separated sections
#[derive(Debug, Default)]
struct Properties {
    lines: Vec<String>,
}

impl Properties {
    fn set(&mut self, key: &str, value: impl std::fmt::Display) -> &mut Self {
        self.lines.push(format!("{key}={value}"));
        self
    }

    fn section(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// Renders the properties files of the remapping and clustering jobs
#[derive(Debug, Clone)]
pub struct SpringPropertiesGenerator {
    accession_db: PgCredentials,
    mongo: MongoCredentials,
    count_stats: ServiceCredentials,
}

impl SpringPropertiesGenerator {
    pub fn new(
        accession_db: PgCredentials,
        mongo: MongoCredentials,
        count_stats: ServiceCredentials,
    ) -> Self {
        Self {
            accession_db,
            mongo,
            count_stats,
        }
    }

    pub fn from_profile(profile: &MavenProfile) -> Result<Self> {
        Ok(Self::new(
            profile.accession_db_credentials()?,
            profile.mongo_credentials()?,
            profile.count_stats_credentials()?,
        ))
    }

    fn common_properties(&self) -> Properties {
        let mut props = Properties::default();
        props
            .set("spring.datasource.driver-class-name", "org.postgresql.Driver")
            .set("spring.datasource.url", &self.accession_db.jdbc_url)
            .set("spring.datasource.username", &self.accession_db.user)
            .set("spring.datasource.password", &self.accession_db.password)
            .set("spring.datasource.tomcat.max-active", 3)
            .section()
            .set("spring.jpa.generate-ddl", true)
            .section()
            .set("spring.data.mongodb.host", &self.mongo.host)
            .set("spring.data.mongodb.port", 27017)
            .set("spring.data.mongodb.database", ACCESSIONING_MONGO_DATABASE)
            .set("spring.data.mongodb.username", &self.mongo.user)
            .set("spring.data.mongodb.password", &self.mongo.password)
            .set("spring.data.mongodb.authentication-database", "admin")
            .set("mongodb.read-preference", "secondaryPreferred")
            .section()
            .set("spring.main.web-application-type", "none")
            .set("spring.main.allow-bean-definition-overriding", true)
            .set("spring.jpa.properties.hibernate.jdbc.lob.non_contextual_creation", true)
            .set("logging.level.uk.ac.ebi.eva.accession.remapping", "INFO")
            .set("parameters.chunkSize", 1000)
            .section();
        props
    }

    pub fn remapping_extraction_properties(
        &self,
        taxonomies: &[i32],
        source_assembly: &str,
        output_folder: &str,
    ) -> String {
        let mut props = self.common_properties();
        props
            .set("spring.batch.job.names", EXTRACTION_JOB)
            .set("parameters.taxonomy", join_taxonomies(taxonomies))
            .set("parameters.assemblyAccession", source_assembly)
            .set("parameters.projects", "")
            .set("parameters.outputFolder", output_folder);
        props.render()
    }

    pub fn remapping_ingestion_properties(&self, source_assembly: &str, target_assembly: &str) -> String {
        let mut props = self.common_properties();
        props
            .set("spring.batch.job.names", INGESTION_JOB)
            .set("parameters.assemblyAccession", target_assembly)
            .set("parameters.remappedFrom", source_assembly)
            .set("parameters.loadTo", "EVA")
            .set("parameters.vcf", "")
            .set("parameters.assemblyReportUrl", "");
        props.render()
    }

    pub fn clustering_properties(
        &self,
        instance: u32,
        source_assembly: &str,
        target_assembly: &str,
        rs_report_path: &str,
    ) -> String {
        let mut props = self.common_properties();
        props
            .set("accessioning.instanceId", format!("instance-{instance}"))
            .set("accessioning.submitted.categoryId", "ss")
            .set("accessioning.clustered.categoryId", "rs")
            .section()
            .set("accessioning.monotonic.ss.blockSize", BLOCK_SIZE)
            .set("accessioning.monotonic.ss.blockStartValue", SS_BLOCK_START)
            .set("accessioning.monotonic.ss.nextBlockInterval", NEXT_BLOCK_INTERVAL)
            .set("accessioning.monotonic.rs.blockSize", BLOCK_SIZE)
            .set("accessioning.monotonic.rs.blockStartValue", RS_BLOCK_START)
            .set("accessioning.monotonic.rs.nextBlockInterval", NEXT_BLOCK_INTERVAL)
            .section()
            .set("parameters.assemblyAccession", target_assembly)
            .set("parameters.remappedFrom", source_assembly)
            .set("parameters.rsReportPath", rs_report_path)
            .section()
            .set("eva.count-stats.url", &self.count_stats.url)
            .set("eva.count-stats.username", &self.count_stats.user)
            .set("eva.count-stats.password", &self.count_stats.password);
        props.render()
    }
}

/// Name of the RS report written by clustering
pub fn rs_report_file_name(source_assembly: &str, target_assembly: &str) -> String {
    format!("{source_assembly}_to_{target_assembly}_rs_report.txt")
}

pub fn join_taxonomies(taxonomies: &[i32]) -> String {
    taxonomies
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parameters file handed to `remap_cluster.nf`
#[derive(Debug, Clone, Serialize)]
pub struct RemapClusterConfig {
    pub taxonomy_list: Vec<i32>,
    pub source_assembly_accession: String,
    pub target_assembly_accession: String,
    pub species_name: Option<String>,
    pub output_dir: PathBuf,
    pub genome_assembly_dir: PathBuf,
    pub extraction_properties: PathBuf,
    pub ingestion_properties: PathBuf,
    pub clustering_properties: PathBuf,
    pub clustering_instance: u32,
    pub remapping_config: Option<PathBuf>,
    pub remapping_required: bool,
    pub executable: BTreeMap<String, serde_yaml::Value>,
    pub nextflow: BTreeMap<String, serde_yaml::Value>,
    pub jar: BTreeMap<String, serde_yaml::Value>,
}

impl RemapClusterConfig {
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn generator() -> SpringPropertiesGenerator {
        SpringPropertiesGenerator::new(
            PgCredentials {
                jdbc_url: "jdbc:postgresql://pg.example:5432/accession".to_string(),
                user: "acc_user".to_string(),
                password: "acc_pass".to_string(),
            },
            MongoCredentials {
                host: "mongo-1.example".to_string(),
                user: "mongo_user".to_string(),
                password: "mongo_pass".to_string(),
            },
            ServiceCredentials {
                url: "https://counts.example/v1".to_string(),
                user: "counts_user".to_string(),
                password: "counts_pass".to_string(),
            },
        )
    }

    #[test]
    fn test_extraction_properties() {
        let props = generator().remapping_extraction_properties(&[9606, 10090], "GCA_000001405.1", ".");
        assert!(props.contains("spring.batch.job.names=EXPORT_SUBMITTED_VARIANTS_JOB\n"));
        assert!(props.contains("parameters.taxonomy=9606,10090\n"));
        assert!(props.contains("parameters.assemblyAccession=GCA_000001405.1\n"));
        assert!(props.contains("parameters.outputFolder=.\n"));
        assert!(props.contains("spring.datasource.url=jdbc:postgresql://pg.example:5432/accession\n"));
        assert!(props.contains("spring.data.mongodb.database=eva_accession_sharded\n"));
        assert!(!props.contains("eva.count-stats"));
    }

    #[test]
    fn test_ingestion_properties() {
        let props = generator().remapping_ingestion_properties("GCA_1.1", "GCA_2.1");
        assert!(props.contains("spring.batch.job.names=INGEST_REMAPPED_VARIANTS_FROM_VCF_JOB\n"));
        assert!(props.contains("parameters.assemblyAccession=GCA_2.1\n"));
        assert!(props.contains("parameters.remappedFrom=GCA_1.1\n"));
    }

    #[test]
    fn test_clustering_properties() {
        let report = rs_report_file_name("GCA_1.1", "GCA_2.1");
        assert_eq!(report, "GCA_1.1_to_GCA_2.1_rs_report.txt");
        let props = generator().clustering_properties(3, "GCA_1.1", "GCA_2.1", &report);
        assert!(props.contains("accessioning.instanceId=instance-3\n"));
        assert!(props.contains("accessioning.monotonic.ss.blockStartValue=5000000000\n"));
        assert!(props.contains("accessioning.monotonic.rs.blockStartValue=3000000000\n"));
        assert!(props.contains("parameters.rsReportPath=GCA_1.1_to_GCA_2.1_rs_report.txt\n"));
        assert!(props.contains("eva.count-stats.username=counts_user\n"));
    }

    #[tokio::test]
    async fn test_remap_cluster_config_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remap_cluster_config.yaml");
        let config = RemapClusterConfig {
            taxonomy_list: vec![9606],
            source_assembly_accession: "GCA_1.1".to_string(),
            target_assembly_accession: "GCA_1.1".to_string(),
            species_name: Some("Homo sapiens".to_string()),
            output_dir: dir.path().to_path_buf(),
            genome_assembly_dir: PathBuf::from("/genomes"),
            extraction_properties: PathBuf::from("remapping_extraction.properties"),
            ingestion_properties: PathBuf::from("remapping_ingestion.properties"),
            clustering_properties: PathBuf::from("clustering_template.properties"),
            clustering_instance: 1,
            remapping_config: None,
            remapping_required: false,
            executable: BTreeMap::from([(
                "nextflow".to_string(),
                serde_yaml::Value::String("/usr/bin/nextflow".to_string()),
            )]),
            nextflow: BTreeMap::new(),
            jar: BTreeMap::new(),
        };
        config.write_to(&path).await.unwrap();

        let written: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["remapping_required"], serde_yaml::Value::Bool(false));
        assert_eq!(written["taxonomy_list"][0].as_i64(), Some(9606));
        assert_eq!(written["executable"]["nextflow"].as_str(), Some("/usr/bin/nextflow"));
    }
}
