//! Assembly ingestion configuration
//!
//! Loaded once at startup from a YAML file and passed by reference to every
//! component. Lookup order: explicit path, `$ASSEMBLYCONFIG`,
//! `~/.assembly_config.yml`.

use crate::error::{IngestError, Result};
use eva_common::maven::{MavenProfile, MavenSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Environment variable pointing at the config file.
pub const CONFIG_ENV_VAR: &str = "ASSEMBLYCONFIG";

/// Config file name looked up in the home directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".assembly_config.yml";

/// Release whose tracker rows list the dbSNP source assemblies.
pub const DEFAULT_DBSNP_REFERENCE_RELEASE: i32 = 3;

/// Pool size for the metadata database. The job is sequential.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    pub maven: MavenConfig,
    pub remapping: RemappingConfig,
    pub genome_downloader: GenomeDownloaderConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Executable paths, passed through to the pipeline parameters
    #[serde(default)]
    pub executable: BTreeMap<String, serde_yaml::Value>,
    /// Nextflow settings, passed through to the pipeline parameters
    #[serde(default)]
    pub nextflow: BTreeMap<String, serde_yaml::Value>,
    /// Jar paths, passed through to the pipeline parameters
    #[serde(default)]
    pub jar: BTreeMap<String, serde_yaml::Value>,
    /// Path this config was read from, forwarded to the pipeline
    #[serde(skip)]
    pub source_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MavenConfig {
    /// Profile id inside the settings file, e.g. "production_processing"
    pub environment: String,
    pub settings_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemappingConfig {
    pub base_directory: PathBuf,
    /// The remap_cluster.nf workflow
    pub pipeline: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeDownloaderConfig {
    pub output_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_dbsnp_reference_release")]
    pub dbsnp_reference_release: i32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            dbsnp_reference_release: DEFAULT_DBSNP_REFERENCE_RELEASE,
        }
    }
}

fn default_dbsnp_reference_release() -> i32 {
    DEFAULT_DBSNP_REFERENCE_RELEASE
}

/// Direct database settings, overriding the Maven profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    DEFAULT_DATABASE_MAX_CONNECTIONS
}

fn default_connect_timeout() -> u64 {
    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS
}

impl AssemblyConfig {
    /// Load from `explicit` when given, otherwise from the first existing
    /// candidate path
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(IngestError::config(format!(
                    "Config file {} does not exist",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        let candidates = Self::candidate_paths();
        let path = candidates.iter().find(|p| p.is_file()).ok_or_else(|| {
            IngestError::config(format!(
                "No config file found, tried: {}",
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;
        Self::from_file(path)
    }

    /// Fallback locations when no path is given on the command line
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            paths.push(PathBuf::from(path));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(DEFAULT_CONFIG_FILE_NAME));
        }
        paths
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.source_file = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Loaded assembly config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.maven.environment.trim().is_empty() {
            return Err(IngestError::config("maven.environment cannot be empty"));
        }
        if self.maven.settings_file.as_os_str().is_empty() {
            return Err(IngestError::config("maven.settings_file cannot be empty"));
        }
        if self.remapping.base_directory.as_os_str().is_empty() {
            return Err(IngestError::config("remapping.base_directory cannot be empty"));
        }
        if self.remapping.pipeline.as_os_str().is_empty() {
            return Err(IngestError::config("remapping.pipeline cannot be empty"));
        }
        if let Some(ref db) = self.database {
            if db.max_connections == 0 {
                return Err(IngestError::config("database.max_connections must be greater than 0"));
            }
        }
        Ok(())
    }

    /// Path of the nextflow executable
    pub fn nextflow_executable(&self) -> Result<String> {
        match self.executable.get("nextflow") {
            Some(serde_yaml::Value::String(path)) => Ok(path.clone()),
            _ => Err(IngestError::config("executable.nextflow must be set to a path")),
        }
    }

    pub fn maven_profile(&self) -> Result<MavenProfile> {
        let settings = MavenSettings::from_file(&self.maven.settings_file)?;
        Ok(settings.profile(&self.maven.environment)?)
    }

    /// Metadata database URL: explicit `database.url` wins over the Maven profile
    pub fn metadata_database_url(&self, profile: &MavenProfile) -> Result<String> {
        if let Some(url) = self.database.as_ref().and_then(|db| db.url.clone()) {
            return Ok(url);
        }
        Ok(profile.metadata_db_credentials()?.connection_url()?)
    }

    pub fn max_connections(&self) -> u32 {
        self.database
            .as_ref()
            .map(|db| db.max_connections)
            .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS)
    }

    pub fn connect_timeout_secs(&self) -> u64 {
        self.database
            .as_ref()
            .map(|db| db.connect_timeout_secs)
            .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS)
    }
}
