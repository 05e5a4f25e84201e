//! Workbench configuration, loaded from TOML.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkbenchConfig {
    pub network: NetworkConfig,
    pub overpass: OverpassConfig,
    pub stac: StacConfig,
    pub query: QueryConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    /// Same-origin relay for capability/feature requests; direct when unset.
    pub proxy_url: Option<String>,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverpassConfig {
    pub endpoint: String,
    /// Server-side timeout embedded in the query header.
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StacConfig {
    pub search_url: String,
    pub collections: Vec<String>,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub hit_tolerance_px: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            proxy_url: Some("http://127.0.0.1:8787/api/proxy".to_string()),
            user_agent: format!("geoweave/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://overpass-api.de/api/interpreter".to_string(),
            timeout_secs: 25,
        }
    }
}

impl Default for StacConfig {
    fn default() -> Self {
        Self {
            search_url: "https://earth-search.aws.element84.com/v1/search".to_string(),
            collections: vec!["sentinel-2-l2a".to_string()],
            limit: 50,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            hit_tolerance_px: 5.0,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl WorkbenchConfig {
    pub fn from_file_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents = fs::read_to_string(path).map_err(|e| config_error(path, e))?;
            Self::from_toml(&contents).map_err(|e| match e {
                EngineError::Config { reason, .. } => config_error(path, reason),
                other => other,
            })
        } else {
            tracing::info!("Config file not found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| config_error(Path::new("<inline>"), e))
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self).map_err(|e| config_error(path, e))?;
        fs::write(path, contents).map_err(|e| config_error(path, e))
    }
}

fn config_error(path: &Path, reason: impl std::fmt::Display) -> EngineError {
    EngineError::Config {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_fill_in_defaults() {
        let cfg = WorkbenchConfig::from_toml(
            r#"
            [network]
            proxy_url = "http://localhost:9000/api/proxy"

            [stac]
            limit = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.network.proxy_url.as_deref(), Some("http://localhost:9000/api/proxy"));
        assert_eq!(cfg.network.request_timeout_secs, 60);
        assert_eq!(cfg.stac.limit, 10);
        assert_eq!(cfg.stac.collections, vec!["sentinel-2-l2a"]);
        assert_eq!(cfg.query.hit_tolerance_px, 5.0);
        assert_eq!(cfg.overpass.timeout_secs, 25);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = WorkbenchConfig::from_file_or_default("/nonexistent/geoweave.toml").unwrap();
        assert_eq!(cfg, WorkbenchConfig::default());
    }

    #[test]
    fn save_and_reload() {
        let path = std::env::temp_dir().join(format!("geoweave-config-{}.toml", std::process::id()));
        let mut cfg = WorkbenchConfig::default();
        cfg.proxy.bind = "0.0.0.0:9999".into();
        cfg.save_to_file(&path).unwrap();
        let back = WorkbenchConfig::from_file_or_default(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(back, cfg);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = WorkbenchConfig::from_toml("[network\n").unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));
    }
}
