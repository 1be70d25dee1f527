use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

use super::CacheBackend;

/// One JSON file per collection under a cache directory.
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    pub async fn open(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Cache(format!(
                "failed to create cache dir {}: {}",
                dir.display(),
                e
            ))
        })?;
        tracing::info!("Local cache directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait::async_trait]
impl CacheBackend for FsCache {
    async fn read(&self, key: &str) -> AppResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Cache(format!("read {} failed: {}", key, e))),
        }
    }

    async fn write(&self, key: &str, contents: &str) -> AppResult<()> {
        // Write beside the target and rename so readers never see a torn file.
        let target = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| AppError::Cache(format!("write {} failed: {}", key, e)))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| AppError::Cache(format!("rename {} failed: {}", key, e)))?;
        Ok(())
    }

    fn backend_tag(&self) -> &'static str {
        "fs"
    }
}
