use anyhow::{Context, Result};
use gazetteer_recon_core::rank::RankPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Externally reachable base URL, used for the identifier space and
    /// the entity view template in the service manifest.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

fn default_service_name() -> String {
    "Canadian Cities Reconciliation Service".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatasetConfig {
    /// CSV loaded at startup. The service starts empty without one.
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub fields: FieldSynonyms,
}

/// Accepted CSV header names per entity attribute, in priority order.
#[derive(Debug, Deserialize, Clone)]
pub struct FieldSynonyms {
    #[serde(default = "default_id_fields")]
    pub id: Vec<String>,
    #[serde(default = "default_name_fields")]
    pub name: Vec<String>,
    #[serde(default = "default_province_fields")]
    pub province: Vec<String>,
    #[serde(default = "default_latitude_fields")]
    pub latitude: Vec<String>,
    #[serde(default = "default_longitude_fields")]
    pub longitude: Vec<String>,
}

impl Default for FieldSynonyms {
    fn default() -> Self {
        Self {
            id: default_id_fields(),
            name: default_name_fields(),
            province: default_province_fields(),
            latitude: default_latitude_fields(),
            longitude: default_longitude_fields(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
fn default_id_fields() -> Vec<String> {
    strings(&["id"])
}
fn default_name_fields() -> Vec<String> {
    strings(&["city", "name", "City", "Name"])
}
fn default_province_fields() -> Vec<String> {
    strings(&["province", "province_name", "admin_name", "state"])
}
fn default_latitude_fields() -> Vec<String> {
    strings(&["lat", "latitude", "Latitude"])
}
fn default_longitude_fields() -> Vec<String> {
    strings(&["lng", "longitude", "Longitude"])
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconcileConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_min_score")]
    pub min_score: u32,
    #[serde(default = "default_match_threshold")]
    pub match_threshold: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        let policy = RankPolicy::default();
        Self {
            default_limit: policy.default_limit,
            min_score: policy.min_score,
            match_threshold: policy.match_threshold,
        }
    }
}

fn default_limit() -> usize {
    RankPolicy::default().default_limit
}
fn default_min_score() -> u32 {
    RankPolicy::default().min_score
}
fn default_match_threshold() -> u32 {
    RankPolicy::default().match_threshold
}

impl ReconcileConfig {
    pub fn policy(&self) -> RankPolicy {
        RankPolicy {
            default_limit: self.default_limit,
            min_score: self.min_score,
            match_threshold: self.match_threshold,
        }
    }
}

impl Config {
    /// Defaults for commands that run without a config file.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:3000".to_string(),
                public_url: default_public_url(),
                max_upload_bytes: default_max_upload_bytes(),
            },
            service: ServiceConfig::default(),
            dataset: DatasetConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    // Relative dataset paths are resolved against the config file.
    if let Some(dataset) = config.dataset.path.as_mut() {
        if dataset.is_relative() {
            if let Some(dir) = path.parent() {
                *dataset = dir.join(&*dataset);
            }
        }
    }

    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.public_url.trim().is_empty() {
        anyhow::bail!("server.public_url must not be empty");
    }

    if config.reconcile.default_limit < 1 {
        anyhow::bail!("reconcile.default_limit must be >= 1");
    }
    if config.reconcile.match_threshold > 100 {
        anyhow::bail!("reconcile.match_threshold must be in [0, 100]");
    }
    if config.reconcile.min_score >= 100 {
        anyhow::bail!("reconcile.min_score must be < 100");
    }

    let fields = &config.dataset.fields;
    for (attr, names) in [
        ("id", &fields.id),
        ("name", &fields.name),
        ("province", &fields.province),
        ("latitude", &fields.latitude),
        ("longitude", &fields.longitude),
    ] {
        if names.is_empty() {
            anyhow::bail!("dataset.fields.{} must list at least one column name", attr);
        }
    }

    Ok(())
}
