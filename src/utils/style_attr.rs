//! 内联 style 属性解析与合并
//! 行为对齐 `element.style[prop] = value`：已有声明原位覆盖，新声明追加，空值删除

use std::fmt;

/// 有序的样式声明列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDeclarations {
    entries: Vec<(String, String)>,
}

impl StyleDeclarations {
    /// 解析 style 属性文本；无法识别的片段直接丢弃
    pub fn parse(text: &str) -> Self {
        let entries = split_declarations(text)
            .into_iter()
            .filter_map(|decl| {
                let (name, value) = decl.split_once(':')?;
                let name = canonical_name(name);
                let value = value.trim();
                if name.is_empty() || value.is_empty() {
                    return None;
                }
                Some((name, value.to_string()))
            })
            .fold(Vec::<(String, String)>::new(), |mut acc, (name, value)| {
                // 同名声明后者覆盖前者
                match acc.iter_mut().find(|(n, _)| *n == name) {
                    Some(slot) => slot.1 = value,
                    None => acc.push((name, value)),
                }
                acc
            });
        Self { entries }
    }

    /// 设置单个属性
    pub fn set(&mut self, property: &str, value: &str) {
        let name = normalize_property(property);
        if name.is_empty() {
            return;
        }
        let value = value.trim();
        if value.is_empty() {
            self.entries.retain(|(n, _)| *n != name);
            return;
        }
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.entries.push((name, value.to_string())),
        }
    }

    /// 批量设置
    pub fn set_all<'a>(&mut self, styles: impl IntoIterator<Item = (&'a String, &'a String)>) {
        for (property, value) in styles {
            self.set(property, value);
        }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        let name = normalize_property(property);
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for StyleDeclarations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (name, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}: {};", name, value)?;
        }
        Ok(())
    }
}

/// 属性名规范化：驼峰转连字符，普通属性小写，自定义属性（`--x`）原样保留
pub fn normalize_property(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        return name.to_string();
    }
    if name == "cssFloat" {
        return "float".to_string();
    }
    if !name.chars().any(|c| c.is_ascii_uppercase()) {
        return name.to_string();
    }
    // 已是连字符写法，仅统一大小写
    if name.contains('-') {
        return name.to_ascii_lowercase();
    }

    let mut out = String::with_capacity(name.len() + 4);
    // WebkitX / MozX -> -webkit-x / -moz-x；msX -> -ms-x
    if name.starts_with(|c: char| c.is_ascii_uppercase())
        || (name.starts_with("ms") && name[2..].starts_with(|c: char| c.is_ascii_uppercase()))
    {
        out.push('-');
    }
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// 已写入属性文本中的声明名：不区分大小写，自定义属性除外
fn canonical_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// 按 `;` 切分声明，忽略引号与括号内的分号（如 `url("a;b")`）
fn split_declarations(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}
