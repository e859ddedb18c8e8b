//! 工具模块：通用辅助能力
pub mod style_attr;

// 导出核心接口
pub use self::style_attr::{normalize_property, StyleDeclarations};
