//! Files of one source assembly run
//!
//! ```text
//! <base_directory>/<taxonomies>/<source_assembly>/
//!   work/
//!   remapping_extraction.properties
//!   remapping_ingestion.properties
//!   clustering_template.properties
//!   remap_cluster_config.yaml
//!   remapping_process.log
//!   logs/<source>_vcf_extractor.log
//!   logs/<source>_eva_remapped.vcf_ingestion.log
//!   logs/<source>_dbsnp_remapped.vcf_ingestion.log
//!   eva/<source>_eva_remapped_counts.yml
//!   dbsnp/<source>_dbsnp_remapped_counts.yml
//! ```

use crate::properties::join_taxonomies;
use crate::tracker::VariantSource;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyLayout {
    root: PathBuf,
    source_assembly: String,
}

impl AssemblyLayout {
    pub fn new(base_directory: &Path, taxonomies: &[i32], source_assembly: &str) -> Self {
        Self {
            root: base_directory
                .join(join_taxonomies(taxonomies))
                .join(source_assembly),
            source_assembly: source_assembly.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.join("work")
    }

    pub fn extraction_properties(&self) -> PathBuf {
        self.root.join("remapping_extraction.properties")
    }

    pub fn ingestion_properties(&self) -> PathBuf {
        self.root.join("remapping_ingestion.properties")
    }

    pub fn clustering_properties(&self) -> PathBuf {
        self.root.join("clustering_template.properties")
    }

    pub fn remap_cluster_config(&self) -> PathBuf {
        self.root.join("remap_cluster_config.yaml")
    }

    pub fn process_log(&self) -> PathBuf {
        self.root.join("remapping_process.log")
    }

    pub fn extraction_log(&self) -> PathBuf {
        self.root
            .join("logs")
            .join(format!("{}_vcf_extractor.log", self.source_assembly))
    }

    pub fn remapped_counts(&self, source: VariantSource) -> PathBuf {
        let prefix = source_prefix(source);
        self.root
            .join(prefix)
            .join(format!("{}_{prefix}_remapped_counts.yml", self.source_assembly))
    }

    pub fn ingestion_log(&self, source: VariantSource) -> PathBuf {
        self.root.join("logs").join(format!(
            "{}_{}_remapped.vcf_ingestion.log",
            self.source_assembly,
            source_prefix(source)
        ))
    }
}

fn source_prefix(source: VariantSource) -> &'static str {
    match source {
        VariantSource::Eva => "eva",
        VariantSource::Dbsnp => "dbsnp",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = AssemblyLayout::new(Path::new("/remap"), &[9606, 9598], "GCA_1.1");
        assert_eq!(layout.root(), Path::new("/remap/9606,9598/GCA_1.1"));
        assert_eq!(layout.work_dir(), Path::new("/remap/9606,9598/GCA_1.1/work"));
        assert_eq!(
            layout.extraction_log(),
            Path::new("/remap/9606,9598/GCA_1.1/logs/GCA_1.1_vcf_extractor.log")
        );
        assert_eq!(
            layout.remapped_counts(VariantSource::Dbsnp),
            Path::new("/remap/9606,9598/GCA_1.1/dbsnp/GCA_1.1_dbsnp_remapped_counts.yml")
        );
        assert_eq!(
            layout.ingestion_log(VariantSource::Eva),
            Path::new("/remap/9606,9598/GCA_1.1/logs/GCA_1.1_eva_remapped.vcf_ingestion.log")
        );
    }
}
