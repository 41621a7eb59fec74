//! Configuration for the local services
//!
//! Every field has a default, so a missing or partial JSON file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Dev-server preview settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Package manager used to install and serve workspaces
    pub package_manager: String,
    /// Lowest port a preview may use
    pub default_start_port: u16,
    /// Highest port probed for a free one
    pub max_port: u16,
    pub ready_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Time between SIGTERM and SIGKILL when stopping
    pub stop_grace_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            package_manager: "pnpm".to_string(),
            default_start_port: 3010,
            max_port: 3999,
            ready_timeout_secs: 60,
            poll_interval_ms: 700,
            stop_grace_ms: 1200,
        }
    }
}

/// Vision model endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Model used when a node does not name one
    pub default_model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            default_model: "qwen/qwen3-vl-235b-a22b-thinking".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Root of templates, workspaces, thumbnails, the hero catalog and runs
    pub data_dir: PathBuf,
    pub preview: PreviewConfig,
    pub vision: VisionConfig,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            preview: PreviewConfig::default(),
            vision: VisionConfig::default(),
        }
    }
}

impl ServicesConfig {
    /// Defaults rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Load from a JSON file, or use defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No services config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        log::info!("Loaded services config from {:?}", path);
        Ok(config)
    }

    pub fn template_dir(&self) -> PathBuf {
        self.data_dir.join("templates").join("starter-next-gsap")
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.data_dir.join("workspaces")
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.data_dir.join("thumbnails")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("heroes.json")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.data_dir.join("runs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ServicesConfig::default();
        assert_eq!(config.template_dir(), PathBuf::from("data/templates/starter-next-gsap"));
        assert_eq!(config.catalog_path(), PathBuf::from("data/heroes.json"));
        assert_eq!(config.preview.default_start_port, 3010);
        assert_eq!(config.vision.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("services.json");
        std::fs::write(
            &path,
            r#"{"data_dir": "/srv/hero", "preview": {"max_port": 3100}}"#,
        )
        .unwrap();

        let config = ServicesConfig::load(&path).unwrap();
        assert_eq!(config.runs_dir(), PathBuf::from("/srv/hero/runs"));
        assert_eq!(config.preview.max_port, 3100);
        assert_eq!(config.preview.package_manager, "pnpm");
        assert_eq!(config.vision, VisionConfig::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = ServicesConfig::load("/definitely/not/here.json").unwrap();
        assert_eq!(config, ServicesConfig::default());
    }
}
