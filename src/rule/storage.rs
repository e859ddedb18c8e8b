//! 键值存储抽象
//! 引擎只依赖简单的 get/set/remove 契约，值统一为 JSON

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rmp_serde::{Serializer, from_slice};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::config::GlobalConfig;
use crate::error::{PageStyleError, PsResult};

/// 键值存储契约
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PsResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> PsResult<()>;
    async fn remove(&self, key: &str) -> PsResult<()>;
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有数据初始化（测试/迁移场景）
    pub fn with_entries(entries: HashMap<String, Value>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> PsResult<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> PsResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> PsResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// 文件存储：整张键值表以 MessagePack 写入单个文件
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // 串行化读-改-写
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.store_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件不存在视为空表
    async fn read_all(&self) -> PsResult<HashMap<String, Value>> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        let entries: HashMap<String, Value> = from_slice(&data)
            .map_err(|e| PageStyleError::MsgPackError(format!("反序列化失败：{}", e)))?;
        debug!("存储文件读取成功，键数量：{}", entries.len());
        Ok(entries)
    }

    async fn write_all(&self, entries: &HashMap<String, Value>) -> PsResult<()> {
        let mut data = Vec::new();
        entries
            .serialize(&mut Serializer::new(&mut data))
            .map_err(|e| PageStyleError::MsgPackError(format!("序列化失败：{}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, data).await?;
        debug!("存储文件写入成功，键数量：{}", entries.len());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> PsResult<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> PsResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> PsResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_some() {
            self.write_all(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", json!([1, 2])).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!([1, 2])));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.mp");

        let value = json!([{"matchPattern": "*", "configs": [{"selector": "p", "elementIndex": 2}]}]);
        FileStore::new(&path).set("cssConfigs_a.com", value.clone()).await.unwrap();
        FileStore::new(&path).set("cssConfigs_b.com", json!({"configs": []})).await.unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("cssConfigs_a.com").await.unwrap(), Some(value));
        assert_eq!(reopened.get("missing").await.unwrap(), None);

        reopened.remove("cssConfigs_b.com").await.unwrap();
        assert_eq!(reopened.get("cssConfigs_b.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("none.mp"));
        assert_eq!(store.get("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mp");
        tokio::fs::write(&path, b"\xc1\xc1\xc1").await.unwrap();

        let err = FileStore::new(&path).get("k").await.unwrap_err();
        assert!(matches!(err, PageStyleError::MsgPackError(_)));
    }
}
