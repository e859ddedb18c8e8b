//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;

use crate::page::DEFAULT_STYLE_ELEMENT_ID;

/// 存储键前缀，与扩展历史数据保持一致
pub const DEFAULT_STORAGE_KEY_PREFIX: &str = "cssConfigs_";

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 文件存储路径（MessagePack）
    pub store_path: PathBuf,
    // 每个站点的存储键前缀
    pub storage_key_prefix: String,
    // 注入伪类样式的 <style> 元素 id
    pub style_element_id: String,
    // 导出文件名前缀
    pub export_file_prefix: String,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("rspagestyle_store.mp"),
            storage_key_prefix: DEFAULT_STORAGE_KEY_PREFIX.to_string(),
            style_element_id: DEFAULT_STYLE_ELEMENT_ID.to_string(),
            export_file_prefix: "css-config-".to_string(),
            verbose: false,
        }
    }
}

impl GlobalConfig {
    /// 日志过滤指令：详细模式输出调试日志
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "rspagestyle=debug"
        } else {
            "rspagestyle=info"
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn store_path(mut self, path: PathBuf) -> Self {
        self.config.store_path = path;
        self
    }

    pub fn storage_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.storage_key_prefix = prefix.into();
        self
    }

    pub fn style_element_id(mut self, id: impl Into<String>) -> Self {
        self.config.style_element_id = id.into();
        self
    }

    pub fn export_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.export_file_prefix = prefix.into();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}
