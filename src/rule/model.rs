//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化
//!
//! 持久化字段名沿用历史存储格式（`matchPattern`、`configs`、`globalScript` 等），
//! 反序列化对字段类型保持宽松：历史数据由编辑器直接写入，数字/字符串混用较常见。

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// 属性名 -> 属性值
pub type StyleMap = BTreeMap<String, String>;
/// 伪类后缀（如 `:hover`）-> 样式表
pub type PseudoStyleMap = BTreeMap<String, StyleMap>;

// 整数前缀（兼容 "2"、" 3px" 这类由输入框写入的索引值）
static INT_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").unwrap());

/// 单条规则：一个选择器目标上的样式/内容指令
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, deserialize_with = "lenient_string")]
    pub selector: String,
    #[serde(default, deserialize_with = "lenient_style_map")]
    pub styles: StyleMap,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "lenient_pseudo_map"
    )]
    pub pseudo_styles: PseudoStyleMap,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_index"
    )]
    pub element_index: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_replace: bool,
    /// 仅用于编辑器折叠状态，引擎不读取
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_collapsed: bool,
}

impl Rule {
    /// 编辑器"新增规则"时的空白规则
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn with_selector(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            ..Self::default()
        }
    }

    /// 选择器为空的规则不产生任何效果
    pub fn is_inert(&self) -> bool {
        self.selector.trim().is_empty()
    }

    /// 有效的元素索引（非负）；`None` 表示作用于全部匹配元素
    pub fn target_index(&self) -> Option<usize> {
        self.element_index
            .filter(|idx| *idx >= 0)
            .and_then(|idx| usize::try_from(idx).ok())
    }
}

/// 规则集的全局脚本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalScript {
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(default = "default_enabled", deserialize_with = "lenient_enabled")]
    pub enabled: bool,
}

impl Default for GlobalScript {
    fn default() -> Self {
        Self {
            code: String::new(),
            enabled: true,
        }
    }
}

impl GlobalScript {
    /// 启用且代码非空时才需要派发
    pub fn is_runnable(&self) -> bool {
        self.enabled && !self.code.is_empty()
    }
}

fn default_enabled() -> bool {
    true
}

/// 规则集：某个路径匹配模式下的规则列表 + 全局脚本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub match_pattern: String,
    #[serde(rename = "configs", alias = "rules", default, deserialize_with = "lenient_rules")]
    pub rules: Vec<Rule>,
    #[serde(default, deserialize_with = "lenient_script")]
    pub global_script: GlobalScript,
}

impl RuleSet {
    pub fn new(match_pattern: impl Into<String>) -> Self {
        Self {
            match_pattern: match_pattern.into(),
            rules: Vec::new(),
            global_script: GlobalScript::default(),
        }
    }

    /// 至少有一条规则或非空脚本才值得导出
    pub fn has_content(&self) -> bool {
        !self.rules.is_empty() || !self.global_script.code.is_empty()
    }
}

/// 单个站点下的全部规则集
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostCollection(Vec<RuleSet>);

impl HostCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找使用指定匹配模式的规则集位置
    pub fn position_of(&self, pattern: &str) -> Option<usize> {
        self.0.iter().position(|rs| rs.match_pattern == pattern)
    }

    /// 除 `except` 以外是否已有规则集使用该模式
    pub fn pattern_taken(&self, pattern: &str, except: Option<usize>) -> bool {
        self.0
            .iter()
            .enumerate()
            .any(|(idx, rs)| Some(idx) != except && rs.match_pattern == pattern)
    }

    pub fn push(&mut self, rule_set: RuleSet) {
        self.0.push(rule_set);
    }

    pub fn into_inner(self) -> Vec<RuleSet> {
        self.0
    }
}

impl From<Vec<RuleSet>> for HostCollection {
    fn from(rule_sets: Vec<RuleSet>) -> Self {
        Self(rule_sets)
    }
}

impl Deref for HostCollection {
    type Target = [RuleSet];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for HostCollection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

// ======== 宽松反序列化 ========

/// JS 风格的真值判断
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 标量转样式值字符串；对象/数组/null 视为无效
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn style_map_from_value(value: &Value) -> StyleMap {
    let Value::Object(map) = value else {
        return StyleMap::new();
    };
    map.iter()
        .filter_map(|(prop, val)| scalar_to_string(val).map(|v| (prop.clone(), v)))
        .collect()
}

/// 解析元素索引，语义与 `parseInt(x, 10)` 一致
pub(crate) fn parse_element_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => INT_PREFIX
            .captures(s)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(scalar_to_string(&value).unwrap_or_default())
}

fn lenient_bool<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(truthy(&Value::deserialize(de)?))
}

fn lenient_enabled<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    // 仅显式的 false 关闭脚本
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Null => true,
        other => truthy(&other),
    })
}

fn lenient_style_map<'de, D: Deserializer<'de>>(de: D) -> Result<StyleMap, D::Error> {
    Ok(style_map_from_value(&Value::deserialize(de)?))
}

fn lenient_pseudo_map<'de, D: Deserializer<'de>>(de: D) -> Result<PseudoStyleMap, D::Error> {
    let value = Value::deserialize(de)?;
    let Value::Object(map) = value else {
        return Ok(PseudoStyleMap::new());
    };
    Ok(map
        .iter()
        .map(|(pseudo, styles)| (pseudo.clone(), style_map_from_value(styles)))
        .collect())
}

fn lenient_index<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    Ok(parse_element_index(&Value::deserialize(de)?))
}

fn lenient_script<'de, D: Deserializer<'de>>(de: D) -> Result<GlobalScript, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(decode_script(value))
}

fn lenient_rules<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Rule>, D::Error> {
    Ok(decode_rules(Value::deserialize(de)?))
}

/// 脚本对象解码，失败时回退默认值
pub(crate) fn decode_script(value: Value) -> GlobalScript {
    match value {
        Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        _ => GlobalScript::default(),
    }
}

/// 规则数组解码：逐条宽松解析，无法解析的元素跳过
pub(crate) fn decode_rules(value: Value) -> Vec<Rule> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            if !item.is_object() {
                warn!("跳过非对象规则，索引：{}", idx);
                return None;
            }
            match serde_json::from_value::<Rule>(item) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!("规则解析失败，已跳过，索引：{}，错误：{}", idx, e);
                    None
                }
            }
        })
        .collect()
}
