//! 页面模块：文档改写与页面位置
pub mod document;
pub mod location;

pub use self::document::{PageDocument, DEFAULT_STYLE_ELEMENT_ID};
pub use self::location::PageLocation;
