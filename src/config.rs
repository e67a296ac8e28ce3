use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_NAMESPACE: &str = "ponto";
pub const DEFAULT_LOG_FILTER: &str = "ponto=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub namespace: String,
    pub log_filter: String,
}

/// On-disk shape; every field is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    data_dir: Option<PathBuf>,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        data_dir.push("ponto");
        Self {
            data_dir,
            namespace: DEFAULT_NAMESPACE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the config file, then environment variables.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = config_path() {
            if let Some(file) = read_config_file(&path)? {
                config.apply_file(file);
            }
        }
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(data_dir) = file.data_dir {
            self.data_dir = data_dir;
        }
        if let Some(namespace) = file.namespace.filter(|value| !value.trim().is_empty()) {
            self.namespace = namespace;
        }
        if let Some(log_filter) = file.log_filter.filter(|value| !value.trim().is_empty()) {
            self.log_filter = log_filter;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("PONTO_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("PONTO_NAMESPACE").filter(|v| !v.trim().is_empty()) {
            self.namespace = value;
        }
        if let Some(value) = lookup("RUST_LOG").filter(|v| !v.trim().is_empty()) {
            self.log_filter = value;
        }
    }
}

fn config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("ponto");
    path.push("config.json");
    Some(path)
}

fn read_config_file(path: &Path) -> Result<Option<ConfigFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let file = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(Some(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn file_values_override_defaults() {
        let mut config = AppConfig::default();
        let file: ConfigFile =
            serde_json::from_str(r#"{"data_dir": "/srv/ponto", "namespace": "  "}"#).unwrap();
        config.apply_file(file);
        assert_eq!(config.data_dir, PathBuf::from("/srv/ponto"));
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn env_overrides_file() {
        let vars: HashMap<&str, &str> =
            [("PONTO_NAMESPACE", "demo"), ("RUST_LOG", "ponto=debug")].into();
        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).map(|value| value.to_string()));
        assert_eq!(config.namespace, "demo");
        assert_eq!(config.log_filter, "ponto=debug");
    }

    #[test]
    fn config_file_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(read_config_file(&path).unwrap().is_none());

        fs::write(&path, r#"{"namespace": "team"}"#).unwrap();
        let file = read_config_file(&path).unwrap().unwrap();
        assert_eq!(file.namespace.as_deref(), Some("team"));

        fs::write(&path, "{nope").unwrap();
        assert!(read_config_file(&path).is_err());
    }
}
