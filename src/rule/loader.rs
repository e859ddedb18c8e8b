//! 站点规则加载/保存
//! 每个站点的规则集合存放在 `<前缀><hostname>` 键下，加载时完成格式迁移

use std::sync::Arc;

use tracing::debug;

use super::migration::migrate;
use super::model::HostCollection;
use super::storage::KeyValueStore;
use crate::config::GlobalConfig;
use crate::error::PsResult;

/// 站点规则存储适配器
#[derive(Debug)]
pub struct ConfigStore<S> {
    store: Arc<S>,
    key_prefix: String,
}

impl<S> Clone for ConfigStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key_prefix: self.key_prefix.clone(),
        }
    }
}

impl<S: KeyValueStore> ConfigStore<S> {
    pub fn new(store: Arc<S>, config: &GlobalConfig) -> Self {
        Self {
            store,
            key_prefix: config.storage_key_prefix.clone(),
        }
    }

    /// 站点存储键
    pub fn storage_key(&self, hostname: &str) -> String {
        format!("{}{}", self.key_prefix, hostname)
    }

    pub fn backend(&self) -> &Arc<S> {
        &self.store
    }

    /// 加载站点规则集合（含旧格式迁移）
    pub async fn load(&self, hostname: &str) -> PsResult<HostCollection> {
        let key = self.storage_key(hostname);
        let raw = self.store.get(&key).await?;
        let collection = migrate(raw);
        debug!("加载站点规则：{}，规则集数量：{}", key, collection.len());
        Ok(collection)
    }

    /// 整体写入站点规则集合
    pub async fn save(&self, hostname: &str, collection: &HostCollection) -> PsResult<()> {
        let key = self.storage_key(hostname);
        let value = serde_json::to_value(collection)?;
        self.store.set(&key, value).await?;
        debug!("保存站点规则：{}，规则集数量：{}", key, collection.len());
        Ok(())
    }

    /// 删除站点全部规则
    pub async fn clear(&self, hostname: &str) -> PsResult<()> {
        self.store.remove(&self.storage_key(hostname)).await
    }
}
