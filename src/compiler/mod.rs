//! 编译模块：路径模式编译、生效规则集选择、样式编译
pub mod pattern;
pub mod resolver;
pub mod style;

pub use self::pattern::{glob_to_regex, PathMatcher};
pub use self::resolver::RuleResolver;
pub use self::style::{InlineReport, MalformedSelector, StyleCompiler};
