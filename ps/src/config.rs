//! Configuration for promptstore

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root folder holding one subfolder per dataset
    #[serde(default = "default_templates_path")]
    pub templates_path: PathBuf,
}

fn default_templates_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptstore")
        .join("templates")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates_path: default_templates_path(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("promptstore").join("config.yml")),
            Some(PathBuf::from("promptstore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yml");
        std::fs::write(&config_path, "templates_path: /tmp/prompts\n").unwrap();

        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.templates_path, PathBuf::from("/tmp/prompts"));
    }

    #[test]
    fn test_save_round_trip() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yml");
        let config = Config {
            templates_path: temp.path().join("templates"),
        };
        config.save(&config_path).unwrap();

        let loaded = Config::load(Some(&config_path)).unwrap();
        assert_eq!(loaded.templates_path, config.templates_path);
    }
}
