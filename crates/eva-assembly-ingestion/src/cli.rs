//! Command-line arguments of the binaries

use crate::job::Task;
use clap::Parser;
use std::path::PathBuf;

/// Remap and cluster every variant of a taxonomy onto a new target assembly,
/// then make it the supported assembly
#[derive(Parser, Debug)]
#[command(name = "add_target_assembly")]
#[command(author, version, about, long_about = None)]
pub struct AddTargetAssemblyCli {
    /// Taxonomy id whose target assembly is changing
    #[arg(long)]
    pub taxonomy: i32,

    /// Assembly accession of the new target, e.g. GCA_000001405.15
    #[arg(long = "target_assembly")]
    pub target_assembly: String,

    /// Who chose the target assembly, recorded in the supported assembly history
    #[arg(long = "source_of_assembly", default_value = "Ensembl")]
    pub source_of_assembly: String,

    /// Tasks to run, always in the order load_tracker, remap_cluster, update_dbs
    #[arg(long, value_enum, num_args = 1.., default_values_t = Task::ALL)]
    pub tasks: Vec<Task>,

    /// Release the remapped variants will be part of
    #[arg(long = "release_version")]
    pub release_version: i32,

    /// Resume the Nextflow pipeline of a previous run
    #[arg(long)]
    pub resume: bool,

    /// Clustering instance id
    #[arg(long, default_value_t = 1)]
    pub instance: u32,

    /// Config file; defaults to $ASSEMBLYCONFIG then ~/.assembly_config.yml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Check that the assembly EVA supports for every species matches the one
/// currently supported by its source
#[derive(Parser, Debug)]
#[command(name = "genome_target_tracker")]
#[command(author, version, about, long_about = None)]
pub struct GenomeTargetTrackerCli {
    /// Maven settings file holding the database credentials
    #[arg(long = "private_config_xml_file")]
    pub private_config_xml_file: PathBuf,

    /// Profile of the settings file to use
    #[arg(long, default_value = "production_processing")]
    pub profile: String,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_target_assembly_defaults() {
        let cli = AddTargetAssemblyCli::try_parse_from([
            "add_target_assembly",
            "--taxonomy",
            "9606",
            "--target_assembly",
            "GCA_000001405.15",
            "--release_version",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.tasks, Task::ALL.to_vec());
        assert_eq!(cli.source_of_assembly, "Ensembl");
        assert_eq!(cli.instance, 1);
        assert!(!cli.resume);
    }

    #[test]
    fn test_add_target_assembly_task_subset() {
        let cli = AddTargetAssemblyCli::try_parse_from([
            "add_target_assembly",
            "--taxonomy",
            "9913",
            "--target_assembly",
            "GCA_002263795.2",
            "--release_version",
            "4",
            "--tasks",
            "update_dbs",
            "load_tracker",
            "--resume",
        ])
        .unwrap();
        assert_eq!(cli.tasks, vec![Task::UpdateDbs, Task::LoadTracker]);
        assert!(cli.resume);
    }

    #[test]
    fn test_unknown_task_rejected() {
        let result = AddTargetAssemblyCli::try_parse_from([
            "add_target_assembly",
            "--taxonomy",
            "9913",
            "--target_assembly",
            "GCA_002263795.2",
            "--release_version",
            "4",
            "--tasks",
            "remap",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_genome_target_tracker_args() {
        let cli = GenomeTargetTrackerCli::try_parse_from([
            "genome_target_tracker",
            "--private_config_xml_file",
            "/secrets/settings.xml",
        ])
        .unwrap();
        assert_eq!(cli.profile, "production_processing");
        assert_eq!(cli.private_config_xml_file, PathBuf::from("/secrets/settings.xml"));
    }
}
