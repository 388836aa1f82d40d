//! Credential lookup from Maven `settings.xml` profiles
//!
//! EVA keeps connection details for every environment as `<properties>` of a
//! named `<profile>` in a private Maven settings file. The tools never read
//! credentials from anywhere else, so this module is the single place that
//! knows the property names.

use crate::error::{EvaError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const METADATA_JDBC_URL: &str = "eva.evapro.jdbc.url";
pub const METADATA_USER: &str = "eva.evapro.user";
pub const METADATA_PASSWORD: &str = "eva.evapro.password";

pub const ACCESSION_JDBC_URL: &str = "eva.accession.jdbc.url";
pub const ACCESSION_USER: &str = "eva.accession.user";
pub const ACCESSION_PASSWORD: &str = "eva.accession.password";

pub const MONGO_HOST: &str = "eva.mongo.host";
pub const MONGO_USER: &str = "eva.mongo.user";
pub const MONGO_PASSWORD: &str = "eva.mongo.passwd";

pub const COUNT_STATS_URL: &str = "eva.count-stats.url";
pub const COUNT_STATS_USER: &str = "eva.count-stats.username";
pub const COUNT_STATS_PASSWORD: &str = "eva.count-stats.password";

pub const CONTIG_ALIAS_URL: &str = "eva.contig-alias.url";
pub const CONTIG_ALIAS_USER: &str = "eva.contig-alias.admin-user";
pub const CONTIG_ALIAS_PASSWORD: &str = "eva.contig-alias.admin-password";

#[derive(Debug, Deserialize)]
struct SettingsXml {
    #[serde(default)]
    profiles: ProfilesXml,
}

#[derive(Debug, Default, Deserialize)]
struct ProfilesXml {
    #[serde(rename = "profile", default)]
    profiles: Vec<ProfileXml>,
}

#[derive(Debug, Deserialize)]
struct ProfileXml {
    id: String,
    #[serde(default)]
    properties: HashMap<String, String>,
}

/// Parsed Maven settings file
#[derive(Debug, Clone)]
pub struct MavenSettings {
    source: String,
    profiles: HashMap<String, HashMap<String, String>>,
}

impl MavenSettings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path.display().to_string())
    }

    pub fn parse(content: &str, source: impl Into<String>) -> Result<Self> {
        let settings: SettingsXml = quick_xml::de::from_str(content)?;
        let profiles = settings
            .profiles
            .profiles
            .into_iter()
            .map(|p| (p.id, p.properties))
            .collect();
        Ok(Self {
            source: source.into(),
            profiles,
        })
    }

    pub fn profile(&self, id: &str) -> Result<MavenProfile> {
        self.profiles
            .get(id)
            .map(|properties| MavenProfile {
                id: id.to_string(),
                properties: properties.clone(),
            })
            .ok_or_else(|| EvaError::ProfileNotFound {
                profile: id.to_string(),
                file: self.source.clone(),
            })
    }
}

/// The `<properties>` block of a single profile
#[derive(Debug, Clone)]
pub struct MavenProfile {
    id: String,
    properties: HashMap<String, String>,
}

impl MavenProfile {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Result<&str> {
        self.properties
            .get(key)
            .map(|v| v.trim())
            .ok_or_else(|| EvaError::MissingProperty {
                profile: self.id.clone(),
                key: key.to_string(),
            })
    }

    pub fn metadata_db_credentials(&self) -> Result<PgCredentials> {
        self.pg_credentials(METADATA_JDBC_URL, METADATA_USER, METADATA_PASSWORD)
    }

    pub fn accession_db_credentials(&self) -> Result<PgCredentials> {
        self.pg_credentials(ACCESSION_JDBC_URL, ACCESSION_USER, ACCESSION_PASSWORD)
    }

    pub fn mongo_credentials(&self) -> Result<MongoCredentials> {
        // The profile may list several hosts of a replica set
        let host = self
            .get(MONGO_HOST)?
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(MongoCredentials {
            host,
            user: self.get(MONGO_USER)?.to_string(),
            password: self.get(MONGO_PASSWORD)?.to_string(),
        })
    }

    pub fn count_stats_credentials(&self) -> Result<ServiceCredentials> {
        self.service_credentials(COUNT_STATS_URL, COUNT_STATS_USER, COUNT_STATS_PASSWORD)
    }

    pub fn contig_alias_credentials(&self) -> Result<ServiceCredentials> {
        self.service_credentials(CONTIG_ALIAS_URL, CONTIG_ALIAS_USER, CONTIG_ALIAS_PASSWORD)
    }

    fn pg_credentials(&self, url: &str, user: &str, password: &str) -> Result<PgCredentials> {
        Ok(PgCredentials {
            jdbc_url: self.get(url)?.to_string(),
            user: self.get(user)?.to_string(),
            password: self.get(password)?.to_string(),
        })
    }

    fn service_credentials(&self, url: &str, user: &str, password: &str) -> Result<ServiceCredentials> {
        Ok(ServiceCredentials {
            url: self.get(url)?.to_string(),
            user: self.get(user)?.to_string(),
            password: self.get(password)?.to_string(),
        })
    }
}

/// Postgres credentials as stored for the JVM tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgCredentials {
    /// `jdbc:postgresql://host:port/database`
    pub jdbc_url: String,
    pub user: String,
    pub password: String,
}

impl PgCredentials {
    /// Connection URL usable by sqlx, with the credentials embedded
    pub fn connection_url(&self) -> Result<String> {
        let rest = self
            .jdbc_url
            .strip_prefix("jdbc:postgresql://")
            .ok_or_else(|| EvaError::parse(format!("Not a postgres JDBC url: {}", self.jdbc_url)))?;
        Ok(format!(
            "postgresql://{}:{}@{}",
            urlencoding::encode(&self.user),
            urlencoding::encode(&self.password),
            rest
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoCredentials {
    pub host: String,
    pub user: String,
    pub password: String,
}

/// Base URL plus basic-auth credentials of an HTTP service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCredentials {
    pub url: String,
    pub user: String,
    pub password: String,
}
