//! 路径匹配模式编译
//! `*` 匹配任意长度字符（可为空），其余字符一律按字面量处理，整串锚定

use regex::Regex;
use tracing::warn;

/// 编译后的路径匹配器
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: String,
    regex: Regex,
}

impl PathMatcher {
    /// 编译匹配模式；空模式返回 `None`（永不匹配）
    pub fn compile(pattern: Option<&str>) -> Option<Self> {
        let pattern = pattern.filter(|p| !p.is_empty())?;
        match Regex::new(&glob_to_regex(pattern)) {
            Ok(regex) => Some(Self {
                pattern: pattern.to_string(),
                regex,
            }),
            // 所有字符均已转义，只有超出正则大小限制时才会失败
            Err(e) => {
                warn!("匹配模式编译失败：{}，错误：{}", pattern, e);
                None
            }
        }
    }

    /// 路径是否匹配
    pub fn test(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// 编译得到的正则表达式（调试用）
    pub fn describe(&self) -> &str {
        self.regex.as_str()
    }
}

/// 通配模式转正则：按 `*` 切分，各段转义后用 `.*` 连接
pub fn glob_to_regex(pattern: &str) -> String {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    format!("^{}$", body)
}
