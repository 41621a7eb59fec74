//! Local catalog of published heroes

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use node_engine::format_timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Result, ServiceError};

/// Fields supplied when publishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHeroRecord {
    pub title: String,
    pub hero_id: String,
    pub workspace_path: String,
    pub preview_url: String,
    pub thumbnail_path: String,
}

/// A published hero
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroRecord {
    pub id: String,
    pub title: String,
    pub hero_id: String,
    pub workspace_path: String,
    pub preview_url: String,
    pub thumbnail_path: String,
    pub created_at: String,
}

#[async_trait]
pub trait HeroCatalog: Send + Sync {
    /// Store a new record and return it with its id and timestamp
    async fn publish(&self, record: NewHeroRecord) -> Result<HeroRecord>;

    /// All records, newest first
    async fn list(&self) -> Result<Vec<HeroRecord>>;
}

/// Catalog kept as a single JSON array on disk
pub struct JsonHeroCatalog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonHeroCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<HeroRecord>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| ServiceError::Catalog(format!("{:?} is corrupt: {}", self.path, e)))
    }
}

#[async_trait]
impl HeroCatalog for JsonHeroCatalog {
    async fn publish(&self, record: NewHeroRecord) -> Result<HeroRecord> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        let created = HeroRecord {
            id: uuid::Uuid::new_v4().to_string(),
            title: record.title,
            hero_id: record.hero_id,
            workspace_path: record.workspace_path,
            preview_url: record.preview_url,
            thumbnail_path: record.thumbnail_path,
            created_at: format_timestamp(Utc::now()),
        };
        records.insert(0, created.clone());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(&records)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        log::info!("Published hero {} ({})", created.id, created.hero_id);
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<HeroRecord>> {
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(hero_id: &str) -> NewHeroRecord {
        NewHeroRecord {
            title: "Launch banner".to_string(),
            hero_id: hero_id.to_string(),
            workspace_path: "/data/workspaces/run-1".to_string(),
            preview_url: "http://localhost:3010/preview/x".to_string(),
            thumbnail_path: "data/thumbnails/x.svg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_and_list() {
        let temp = TempDir::new().unwrap();
        let catalog = JsonHeroCatalog::new(temp.path().join("nested/heroes.json"));
        assert!(catalog.list().await.unwrap().is_empty());

        let first = catalog.publish(record("hero_a")).await.unwrap();
        let second = catalog.publish(record("hero_b")).await.unwrap();
        assert_ne!(first.id, second.id);

        let listed = catalog.list().await.unwrap();
        assert_eq!(listed, vec![second, first]);
    }

    #[tokio::test]
    async fn test_corrupt_catalog() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("heroes.json");
        std::fs::write(&path, "not json").unwrap();
        let catalog = JsonHeroCatalog::new(&path);
        assert!(matches!(
            catalog.publish(record("x")).await,
            Err(ServiceError::Catalog(_))
        ));
    }
}
