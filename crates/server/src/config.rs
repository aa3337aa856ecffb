use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_file_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Timing of the active-track rotation, in milliseconds. Each tick after
/// the first waits a random interval in `[min_interval_ms, max_interval_ms)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveTrackConfig {
    pub initial_delay_ms: u64,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
}

impl Default for ActiveTrackConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 10_000,
            min_interval_ms: 10_000,
            max_interval_ms: 20_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub version: u32,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_level: String,
    pub data_dir: String,
    pub upload: UploadConfig,
    pub active_track: ActiveTrackConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            environment: Environment::Development,
            log_level: "info".to_string(),
            data_dir: DEFAULT_DATA_DIR.to_string(),
            upload: UploadConfig::default(),
            active_track: ActiveTrackConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn normalize(&mut self) {
        if self.version < CONFIG_VERSION {
            self.version = CONFIG_VERSION;
        }
        if self.host.trim().is_empty() {
            self.host = "0.0.0.0".to_string();
        }
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        if self.log_level.trim().is_empty() {
            self.log_level = "info".to_string();
        }
        if self.data_dir.trim().is_empty() {
            self.data_dir = DEFAULT_DATA_DIR.to_string();
        }
        if self.upload.max_file_size == 0 {
            self.upload.max_file_size = DEFAULT_MAX_FILE_SIZE;
        }
        let timing = &mut self.active_track;
        if timing.min_interval_ms > timing.max_interval_ms {
            std::mem::swap(&mut timing.min_interval_ms, &mut timing.max_interval_ms);
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("TRACKHUB_PORT") {
            if let Ok(port) = value.trim().parse::<u16>() {
                self.port = port;
            }
        }
        if let Ok(value) = env::var("TRACKHUB_DATA_DIR") {
            if !value.trim().is_empty() {
                self.data_dir = value.trim().to_string();
            }
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("TRACKHUB_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

pub fn load_or_create_config(path: &Path) -> Result<(ServerConfig, bool), ConfigError> {
    let (mut config, created) = if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: ServerConfig = serde_yaml::from_str(&contents)?;
        config.normalize();
        (config, false)
    } else {
        let config = ServerConfig::default();
        save_config(path, &config)?;
        (config, true)
    };
    config.apply_env_overrides();
    config.normalize();
    Ok((config, created))
}

pub fn save_config(path: &Path, config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}
