//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use wigle_core::Credentials;
use wigle_export::ExportSelection;

/// Global configuration for wigle
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub api: ApiConfig,
    pub http: HttpSettings,
    pub export: ExportDefaults,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("./wigle-data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub name: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.wigle.net/api/v2".to_string(),
            name: std::env::var("WIGLE_API_NAME").ok(),
            token: std::env::var("WIGLE_API_TOKEN").ok(),
        }
    }
}

impl ApiConfig {
    /// Both halves present and non-empty
    pub fn credentials(&self) -> Option<Credentials> {
        let name = self.name.as_deref()?;
        let token = self.token.as_deref()?;
        Some(Credentials::new(name, token)).filter(Credentials::is_complete)
    }
}

/// Per-request timeouts in seconds, and pool sizing.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub page_timeout: u64,
    pub count_timeout: u64,
    pub lookup_timeout: u64,
    pub detail_timeout: u64,
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            page_timeout: 60,
            count_timeout: 30,
            lookup_timeout: 30,
            detail_timeout: 60,
            pool_max_idle_per_host: 32,
        }
    }
}

/// Export toggles used when no export flag is given on the command line.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    pub csv: bool,
    pub kml: bool,
    pub keep_json: bool,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            csv: true,
            kml: false,
            keep_json: false,
        }
    }
}

impl From<ExportDefaults> for ExportSelection {
    fn from(d: ExportDefaults) -> Self {
        Self {
            csv: d.csv,
            kml: d.kml,
            keep_json: d.keep_json,
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./wigle.toml (current directory)
    /// 2. ~/.config/wigle/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("wigle.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "wigle") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output.default_dir, PathBuf::from("./wigle-data"));
        assert_eq!(config.api.base_url, "https://api.wigle.net/api/v2");
        assert_eq!(config.http.page_timeout, 60);
        assert_eq!(config.http.count_timeout, 30);
        assert!(config.export.csv);
        assert!(!config.export.keep_json);
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("WIGLE_TEST_VAR", "test_value");
        assert_eq!(
            expand_env_var("${WIGLE_TEST_VAR}"),
            Some("test_value".to_string())
        );
        std::env::remove_var("WIGLE_TEST_VAR");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[output]
default_dir = "/tmp/wigle"

[api]
name = "AID0123"
token = "${NONEXISTENT_VAR_12345}"

[http]
page_timeout = 90

[export]
kml = true
keep_json = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.output.default_dir, PathBuf::from("/tmp/wigle"));
        assert_eq!(config.api.name.as_deref(), Some("AID0123"));
        assert_eq!(config.api.token, None);
        assert!(config.api.credentials().is_none());
        assert_eq!(config.http.page_timeout, 90);
        assert_eq!(config.http.detail_timeout, 60);

        let selection = ExportSelection::from(config.export);
        assert!(selection.csv && selection.kml && selection.keep_json);
    }

    #[test]
    fn credentials_need_both_halves() {
        let api = ApiConfig {
            base_url: String::new(),
            name: Some("AID0123".into()),
            token: Some("secret".into()),
        };
        assert!(api.credentials().is_some());

        let api = ApiConfig {
            token: Some("  ".into()),
            ..api
        };
        assert!(api.credentials().is_none());
    }
}
