use crate::domain::error::OpenApiError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SERVICE_KEY_ENV: &str = "OPENAPI_KOREA_SERVICE_KEY";
pub const RESOURCE_FILE_ENV: &str = "OPENAPI_RESOURCE_FILE_PATH";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub service_key: Option<String>,
    pub resource_file: Option<String>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub datasets: DatasetConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Apply `ttl_secs` to whole-dataset snapshots too. When false, snapshots
    /// live until `refresh_data` drops them.
    #[serde(default = "default_true")]
    pub expire_resources: bool,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatasetConfig {
    #[serde(default = "default_true")]
    pub cctv: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    // The upstream's certificate chain does not validate on every platform.
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    #[serde(default = "default_true")]
    pub enable: bool,
    pub path: Option<String>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            expire_resources: true,
            max_pages: default_max_pages(),
            page_size: default_page_size(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self { cctv: true }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            accept_invalid_certs: true,
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            enable: true,
            path: None,
            level: default_log_level(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn resource_ttl(&self) -> Option<Duration> {
        self.expire_resources.then(|| self.ttl())
    }
}

impl Logging {
    /// `EnvFilter` directive for the configured level; unknown levels fall back to warn.
    pub fn filter_directive(&self) -> &'static str {
        match self.level.to_ascii_uppercase().as_str() {
            "DEBUG" => "debug",
            "INFO" => "info",
            "WARN" => "warn",
            "ERROR" => "error",
            _ => "warn",
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Environment first, then the file. Blank values count as missing.
    pub fn resolve_service_key(&self) -> Option<String> {
        pick(std::env::var(SERVICE_KEY_ENV).ok(), self.service_key.clone())
    }

    pub fn resolve_resource_file(&self) -> Option<PathBuf> {
        pick(std::env::var(RESOURCE_FILE_ENV).ok(), self.resource_file.clone()).map(PathBuf::from)
    }
}

fn pick(env: Option<String>, file: Option<String>) -> Option<String> {
    env.filter(|v| !v.trim().is_empty())
        .or_else(|| file.filter(|v| !v.trim().is_empty()))
        .map(|v| v.trim().to_string())
}

// Defaults
fn default_true() -> bool {
    true
}
fn default_ttl_secs() -> u64 {
    30 * 60
}
fn default_max_pages() -> u32 {
    1000
}
fn default_page_size() -> u32 {
    100
}
fn default_base_url() -> String {
    "https://apis.data.go.kr/5690000".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36".to_string()
}
fn default_log_level() -> String {
    "WARN".to_string()
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("openapi-korea").join("config.toml"))
}

/// Outcome of loading: the config plus a warning to log once logging is up.
pub struct Loaded {
    pub config: Config,
    pub warning: Option<String>,
}

pub fn load_config(explicit: Option<&Path>) -> Result<Loaded, OpenApiError> {
    let path = explicit.map(Path::to_path_buf).or_else(get_config_path);

    if let Some(path) = path {
        if path.exists() {
            let parsed = fs::read_to_string(&path)
                .map_err(OpenApiError::from)
                .and_then(|content| parse_config(&content));
            return Ok(match parsed {
                Ok(config) => Loaded {
                    config,
                    warning: None,
                },
                Err(e) => Loaded {
                    config: Config::default(),
                    warning: Some(format!(
                        "Failed to load config file {}: {}. Using defaults.",
                        path.display(),
                        e
                    )),
                },
            });
        }
    }

    Ok(Loaded {
        config: Config::default(),
        warning: None,
    })
}

pub fn parse_config(content: &str) -> Result<Config, OpenApiError> {
    let config: Config = toml::from_str(content)?;
    if config.cache.page_size == 0 {
        return Err(OpenApiError::Config("cache.page_size must be positive".to_string()));
    }
    if config.cache.max_pages == 0 {
        return Err(OpenApiError::Config("cache.max_pages must be positive".to_string()));
    }
    Ok(config)
}

pub fn generate_config_sample(explicit: Option<&Path>) -> Result<PathBuf, OpenApiError> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(get_config_path)
        .ok_or_else(|| OpenApiError::Config("Cannot determine config directory".to_string()))?;

    if path.exists() {
        return Err(OpenApiError::Config(format!(
            "Config file already exists at: {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let sample = Config {
        service_key: Some(String::new()),
        ..Config::default()
    };
    let toml_content = toml::to_string_pretty(&sample)
        .map_err(|e| OpenApiError::Config(format!("Failed to serialize config: {}", e)))?;
    fs::write(&path, toml_content)
        .map_err(|e| OpenApiError::Config(format!("Failed to write config file: {}", e)))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_prefers_env_and_skips_blank() {
        assert_eq!(
            pick(Some("env".into()), Some("file".into())),
            Some("env".to_string())
        );
        assert_eq!(
            pick(Some("  ".into()), Some("file".into())),
            Some("file".to_string())
        );
        assert_eq!(pick(None, Some("".into())), None);
        assert_eq!(pick(None, None), None);
    }

    #[test]
    fn test_resource_ttl_follows_policy() {
        let mut cache = CacheConfig::default();
        assert_eq!(cache.resource_ttl(), Some(Duration::from_secs(1800)));
        cache.expire_resources = false;
        assert_eq!(cache.resource_ttl(), None);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = parse_config("[cache]\npage_size = 0\n").unwrap_err();
        assert!(matches!(err, OpenApiError::Config(_)));
    }
}
