//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::generation::Generation;
use crate::url::{RequestUrl, UrlError};

/// Default origin the application is served from.
pub const DEFAULT_ORIGIN: &str = "https://fittrack.app";

/// Default seed list, fetched and stored at install.
pub const DEFAULT_SEED: &[&str] = &[
    "/",
    "/index.html",
    "/install.html",
    "/redirect.html",
    "/manifest.json",
    "/favicon.ico",
    "/icons/icon-192x192.png",
    "/icons/icon-512x512.png",
    "/splash/splash-1125x2436.png",
    "/splash/splash-1242x2688.png",
    "/styles/main.css",
    "/styles/standalone.css",
];

/// Identity-provider hosts that are never intercepted.
pub const DEFAULT_TRUSTED_HOSTS: &[&str] = &[
    "accounts.google.com",
    "apis.google.com",
    "oauth2.googleapis.com",
    "securetoken.googleapis.com",
    "identitytoolkit.googleapis.com",
    "*.firebaseapp.com",
];

/// Stylesheets that must track the latest deployment.
pub const DEFAULT_CRITICAL_STYLESHEETS: &[&str] = &["/styles/main.css", "/styles/standalone.css"];

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to serialize TOML config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL in config: {0}")]
    Url(#[from] UrlError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Output format for engine logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines, for log aggregation.
    #[default]
    Json,
    /// Human-readable, for development.
    Human,
}

/// An informational page reachable under several paths, always served
/// from one canonical cached copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAlias {
    /// Path of the cached copy.
    pub canonical: String,
    /// Paths that resolve to the canonical copy.
    pub variants: Vec<String>,
}

impl PageAlias {
    /// Create an alias.
    pub fn new(canonical: impl Into<String>, variants: &[&str]) -> Self {
        Self {
            canonical: canonical.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Whether `path` names this page (canonical path included).
    pub fn matches(&self, path: &str) -> bool {
        self.canonical == path || self.variants.iter().any(|v| v == path)
    }
}

/// Configuration of the offline cache engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Origin the application is served from.
    pub origin: String,
    /// Current cache generation.
    pub generation: Generation,
    /// Document served as the offline fallback for HTML navigations.
    pub root_document: String,
    /// URLs fetched and stored at install.
    pub seed: Vec<String>,
    /// Hosts (or `*.` patterns) that bypass the engine.
    pub trusted_hosts: Vec<String>,
    /// Path prefix of the static asset directory served cache-first.
    pub asset_prefix: String,
    /// Stylesheets served network-first.
    pub critical_stylesheets: Vec<String>,
    /// Transport timeout for a single network attempt.
    pub fetch_timeout_ms: u64,
    /// Attach `X-Cache-*` headers to served responses.
    pub debug_headers: bool,
    /// Log output format.
    pub log_format: LogFormat,
    /// Informational page aliases.
    pub aliases: Vec<PageAlias>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            generation: Generation::build(),
            root_document: "/".to_string(),
            seed: DEFAULT_SEED.iter().map(|s| s.to_string()).collect(),
            trusted_hosts: DEFAULT_TRUSTED_HOSTS.iter().map(|s| s.to_string()).collect(),
            asset_prefix: "/icons/".to_string(),
            critical_stylesheets: DEFAULT_CRITICAL_STYLESHEETS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fetch_timeout_ms: 10_000,
            debug_headers: false,
            log_format: LogFormat::Json,
            aliases: vec![
                PageAlias::new("/install.html", &["/install", "/install/"]),
                PageAlias::new("/redirect.html", &["/redirect", "/redirect/"]),
            ],
        }
    }
}

impl EngineConfig {
    /// Load config from a file; `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config = if path.extension().map_or(false, |e| e == "json") {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML config.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse JSON config.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid("generation must not be empty".to_string()));
        }

        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_ms must be positive".to_string()));
        }

        if !self.asset_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "asset_prefix must start with '/': {}",
                self.asset_prefix
            )));
        }

        let seed = self.seed_urls()?;

        let root = self.root_url()?;
        if !seed.contains(&root) {
            return Err(ConfigError::Invalid(format!(
                "root document {} is not in the seed list",
                self.root_document
            )));
        }

        for alias in &self.aliases {
            let canonical = self.resolve(&alias.canonical)?;
            if !seed.contains(&canonical) {
                return Err(ConfigError::Invalid(format!(
                    "alias canonical {} is not in the seed list",
                    alias.canonical
                )));
            }
        }

        Ok(())
    }

    /// Parsed origin.
    pub fn origin_url(&self) -> Result<RequestUrl, ConfigError> {
        let origin = RequestUrl::parse(&self.origin)?;
        if origin.path() != "/" || origin.query().is_some() {
            return Err(ConfigError::Invalid(format!(
                "origin must not carry a path or query: {}",
                self.origin
            )));
        }
        Ok(origin)
    }

    /// Resolve a possibly relative URL against the origin.
    pub fn resolve(&self, url: &str) -> Result<RequestUrl, ConfigError> {
        Ok(self.origin_url()?.resolve(url)?)
    }

    /// Absolute seed URLs, in configured order, without duplicates.
    pub fn seed_urls(&self) -> Result<Vec<RequestUrl>, ConfigError> {
        let mut urls: Vec<RequestUrl> = Vec::with_capacity(self.seed.len());
        for entry in &self.seed {
            let url = self.resolve(entry)?;
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(urls)
    }

    /// Absolute URL of the offline fallback document.
    pub fn root_url(&self) -> Result<RequestUrl, ConfigError> {
        self.resolve(&self.root_document)
    }

    /// Transport timeout for one network attempt.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.seed_urls().unwrap().len(), DEFAULT_SEED.len());
        assert_eq!(config.root_url().unwrap().to_string(), "https://fittrack.app/");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            origin = "http://localhost:3000"
            generation = "fitness-cache-v7"
            seed = ["/", "/manifest.json", "/icons/a.png"]
            aliases = []
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.generation.as_str(), "fitness-cache-v7");
        assert_eq!(config.asset_prefix, "/icons/");
        assert_eq!(
            config.seed_urls().unwrap()[2].to_string(),
            "http://localhost:3000/icons/a.png"
        );
    }

    #[test]
    fn test_aliases_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            [[aliases]]
            canonical = "/install.html"
            variants = ["/install"]
            "#,
        )
        .unwrap();
        assert_eq!(config.aliases.len(), 1);
        assert!(config.aliases[0].matches("/install"));
        assert!(config.aliases[0].matches("/install.html"));
        assert!(!config.aliases[0].matches("/installer"));
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = EngineConfig::default();
        let rendered = config.to_toml_string().unwrap();
        let parsed = EngineConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_json_config() {
        let config =
            EngineConfig::from_json_str(r#"{"generation": "v2", "debug_headers": true}"#).unwrap();
        assert!(config.debug_headers);
        assert_eq!(config.generation, Generation::from("v2"));
    }

    #[test]
    fn test_validate_rejects_missing_root() {
        let config = EngineConfig {
            seed: vec!["/manifest.json".to_string()],
            aliases: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_unseeded_alias() {
        let config = EngineConfig {
            seed: vec!["/".to_string()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("alias canonical"));
    }

    #[test]
    fn test_validate_rejects_empty_generation() {
        let config = EngineConfig {
            generation: Generation::from("  "),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_origin_with_path() {
        let config = EngineConfig {
            origin: "https://fittrack.app/app".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seed_urls_deduplicated() {
        let config = EngineConfig {
            seed: vec!["/".to_string(), "https://fittrack.app/".to_string()],
            aliases: Vec::new(),
            ..Default::default()
        };
        assert_eq!(config.seed_urls().unwrap().len(), 1);
    }
}
