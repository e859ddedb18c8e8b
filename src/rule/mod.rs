//! 规则模块：负责规则数据模型、存储格式迁移、持久化与导入导出
pub mod model;
pub mod migration;
pub mod storage;
pub mod loader;
pub mod transfer;

// 导出核心接口
pub use self::model::{GlobalScript, HostCollection, PseudoStyleMap, Rule, RuleSet, StyleMap};
pub use self::migration::{migrate, StoredShape, WILDCARD_PATTERN};
pub use self::storage::{FileStore, KeyValueStore, MemoryStore};
pub use self::loader::ConfigStore;
pub use self::transfer::{build_export, export_file_name, parse_import, ExportFile};
