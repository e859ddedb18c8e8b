//! rspagestyle - 按站点、按路径的页面样式/脚本覆盖引擎

// 导出全局错误类型
pub use self::error::{PageStyleError, PsResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, GlobalConfig};

// 导出规则模块核心接口
pub use self::rule::{
    ConfigStore, FileStore, GlobalScript, HostCollection, KeyValueStore, MemoryStore, Rule,
    RuleSet, StoredShape, migrate,
};

// 导出编译模块核心接口
pub use self::compiler::{InlineReport, PathMatcher, RuleResolver, StyleCompiler};

// 导出页面模块核心接口
pub use self::page::{PageDocument, PageLocation};

// 导出引擎模块核心接口
pub use self::engine::{
    ApplyReport, ApplyScope, DomMutation, ExtensionMessage, PrivilegedHost, ScriptDispatcher,
    ScriptRunner, Session,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod page;
pub mod engine;
pub mod utils;
