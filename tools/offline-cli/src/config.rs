//! Configuration file discovery and templates.

use std::path::{Path, PathBuf};

use anyhow::Result;
use offline_core::EngineConfig;

/// File names searched for, in order, from the working directory upwards.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["offline.toml", ".offline.toml", "offline.json"];

/// Config file in `dir`, if one exists.
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Default configuration as commented TOML.
pub fn generate_default_config() -> Result<String> {
    let mut config = EngineConfig::default();
    config.generation = "fitness-cache-v1".into();
    let body = config.to_toml_string()?;

    Ok(format!(
        r#"# Offline cache engine configuration
#
# generation     - cache generation name; bump on every deploy
# seed           - URLs stored at install, must include root_document
# trusted_hosts  - never intercepted; entries may use one '*' wildcard
# aliases        - extra paths served from a seeded canonical page

{}"#,
        body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips() {
        let content = generate_default_config().unwrap();
        let config = EngineConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.generation.as_str(), "fitness-cache-v1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_find_config_file_missing() {
        let dir = std::env::temp_dir().join("offline-cli-no-config-here");
        assert!(find_config_file(&dir).is_none());
    }
}
