use crate::config::StorageConfig;
use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const FLAG_FILE: &str = "flags.json";
const FLAG_FILE_TMP: &str = "flags.json.tmp";

/// Durable key-value store for small string flags.
///
/// Values are kept in memory and rewritten to a single JSON file on every
/// change, via a temp file and rename so a crash never leaves a torn file.
#[derive(Clone)]
pub struct FlagStore {
    root: Arc<PathBuf>,
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl FlagStore {
    pub async fn open(cfg: &StorageConfig) -> Result<Self> {
        let root = cfg.path.clone();
        tokio::fs::create_dir_all(&root).await?;

        let path = root.join(FLAG_FILE);
        let values = if path.exists() {
            let data = tokio::fs::read_to_string(&path).await?;
            let map: HashMap<String, String> = serde_json::from_str(&data)?;
            tracing::info!("loaded {} persisted flags from {}", map.len(), path.display());
            map
        } else {
            HashMap::new()
        };

        Ok(FlagStore {
            root: Arc::new(root),
            values: Arc::new(Mutex::new(values)),
        })
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.values.lock().await.get(key).cloned()
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), value.to_string());

        let json = serde_json::to_string(&*values)?;
        let path = self.root.join(FLAG_FILE);
        let tmp_path = self.root.join(FLAG_FILE_TMP);
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}
