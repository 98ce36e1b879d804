//! Service configuration.
//!
//! Layered with figment, lowest priority first: built-in defaults, the TOML
//! file at [`CONFIG_PATH`], the plain deployment variables (`CDROM_DEVICE`,
//! `TMP_DIR`, `OUTPUT_DIR`, `EXCLUDE_DRIVES`, `LOG_LEVEL`), any
//! `CDRIPD_`-prefixed variable (nested with `__`), then command-line flags.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Deserializer, Serialize};

pub const CONFIG_PATH: &str = "/etc/cdripd/config.toml";

const DEPLOYMENT_VARS: &[&str] = &[
    "CDROM_DEVICE",
    "TMP_DIR",
    "OUTPUT_DIR",
    "EXCLUDE_DRIVES",
    "LOG_LEVEL",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Drive that must be usable for the service to start.
    pub cdrom_device: String,
    /// Exported as `TMPDIR` to every external tool.
    pub tmp_dir: PathBuf,
    /// Root under which rip and analysis artifacts are written.
    pub output_dir: PathBuf,
    #[serde(deserialize_with = "comma_list")]
    pub exclude_drives: Vec<String>,
    pub log_level: String,
    pub log_json: bool,
    pub http_bind: SocketAddr,
    pub simulation: bool,
    pub tools: ToolsConfig,
    pub sources: SourcesConfig,
}

/// Program names (or paths) of the external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub paranoia: String,
    pub discid: String,
    pub eject: String,
}

/// Where the kernel exposes drives and their capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub dev_dir: PathBuf,
    pub cdrom_info: PathBuf,
    pub sysfs_block: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cdrom_device: "/dev/sr0".to_string(),
            tmp_dir: PathBuf::from("/tmp"),
            output_dir: PathBuf::from("/var/lib/cdripd/output"),
            exclude_drives: Vec::new(),
            log_level: "info".to_string(),
            log_json: false,
            http_bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            simulation: false,
            tools: ToolsConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            paranoia: "cdparanoia".to_string(),
            discid: "discid".to_string(),
            eject: "eject".to_string(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            dev_dir: PathBuf::from("/dev"),
            cdrom_info: PathBuf::from("/proc/sys/dev/cdrom/info"),
            sysfs_block: PathBuf::from("/sys/block"),
        }
    }
}

impl AppConfig {
    pub fn new<T: Serialize>(overrides: Option<&T>) -> Result<Self> {
        Self::load(Path::new(CONFIG_PATH), overrides)
    }

    pub fn load<T: Serialize>(config_file: &Path, overrides: Option<&T>) -> Result<Self> {
        Self::figment(config_file, overrides)
            .extract()
            .context("Failed to load configuration")
    }

    pub fn figment<T: Serialize>(config_file: &Path, overrides: Option<&T>) -> Figment {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_file))
            .merge(Env::raw().only(DEPLOYMENT_VARS))
            .merge(Env::prefixed("CDRIPD_").split("__"));

        match overrides {
            Some(overrides) => figment.merge(Serialized::defaults(overrides)),
            None => figment,
        }
    }
}

/// Accept either a list or a comma-separated string; blank entries are dropped.
fn comma_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Text(String),
    }

    let items = match Raw::deserialize(deserializer)? {
        Raw::List(items) => items,
        Raw::Text(text) => text.split(',').map(str::to_string).collect(),
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}
