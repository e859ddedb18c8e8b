//! 存储数据格式识别与迁移
//! 历史版本写入过三种结构，加载时统一识别并转换为规范的 [`HostCollection`]：
//! 1. 规则集数组（当前格式，元素含 `matchPattern`）
//! 2. 规则数组（最早格式）
//! 3. `{configs, globalScript}` 单对象（非空标量同样按此处理，得到空的通配规则集）
//!
//! 识别规则集中在 [`StoredShape::detect`]，对任何输入都有确定结果，不会失败。

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::model::{decode_rules, decode_script, HostCollection, RuleSet};

/// 迁移后的规则集统一使用的通配模式
pub const WILDCARD_PATTERN: &str = "*";

/// 存储值的结构识别结果
#[derive(Debug, Clone, PartialEq)]
pub enum StoredShape {
    /// 无数据（null、false、0、空串）
    Absent,
    /// 当前格式：规则集数组
    Canonical(Vec<Value>),
    /// 最早格式：裸规则数组
    LegacyRuleList(Vec<Value>),
    /// 旧格式：单个规则集对象
    LegacySingle {
        configs: Option<Value>,
        global_script: Option<Value>,
    },
}

impl StoredShape {
    /// 按优先级识别存储值结构
    pub fn detect(raw: Option<Value>) -> Self {
        match raw {
            Some(Value::Array(items)) => {
                if is_canonical(&items) {
                    StoredShape::Canonical(items)
                } else {
                    StoredShape::LegacyRuleList(items)
                }
            }
            Some(Value::Object(mut map)) => StoredShape::LegacySingle {
                configs: map.remove("configs"),
                global_script: map.remove("globalScript"),
            },
            // 非空标量：按旧格式处理，得到一个空的通配规则集
            Some(scalar) if is_truthy_scalar(&scalar) => StoredShape::LegacySingle {
                configs: None,
                global_script: None,
            },
            _ => StoredShape::Absent,
        }
    }

    /// 结构名称（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            StoredShape::Absent => "absent",
            StoredShape::Canonical(_) => "canonical",
            StoredShape::LegacyRuleList(_) => "legacy-rule-list",
            StoredShape::LegacySingle { .. } => "legacy-single",
        }
    }

    /// 转换为规范规则集合
    pub fn into_collection(self) -> HostCollection {
        match self {
            StoredShape::Absent => HostCollection::new(),
            StoredShape::Canonical(items) => decode_canonical(items),
            StoredShape::LegacyRuleList(items) => {
                let mut rule_set = RuleSet::new(WILDCARD_PATTERN);
                rule_set.rules = decode_rules(Value::Array(items));
                HostCollection::from(vec![rule_set])
            }
            StoredShape::LegacySingle {
                configs,
                global_script,
            } => {
                let mut rule_set = RuleSet::new(WILDCARD_PATTERN);
                rule_set.rules = configs.map(decode_rules).unwrap_or_default();
                rule_set.global_script = global_script.map(decode_script).unwrap_or_default();
                HostCollection::from(vec![rule_set])
            }
        }
    }
}

/// 存储值 -> 规范规则集合（识别 + 转换）
pub fn migrate(raw: Option<Value>) -> HostCollection {
    let shape = StoredShape::detect(raw);
    if !matches!(shape, StoredShape::Canonical(_) | StoredShape::Absent) {
        debug!("检测到旧版存储格式：{}，迁移为规则集数组", shape.name());
    }
    shape.into_collection()
}

/// 空数组，或首元素为含 `matchPattern` 字段的对象
pub(crate) fn is_canonical(items: &[Value]) -> bool {
    match items.first() {
        None => true,
        Some(first) => first_has_pattern(first),
    }
}

fn is_truthy_scalar(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

pub(crate) fn first_has_pattern(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj: &Map<String, Value>| obj.contains_key("matchPattern"))
}

/// 规则集数组逐条解码；空模式与重复模式的规则集被丢弃（保留先出现者）
fn decode_canonical(items: Vec<Value>) -> HostCollection {
    let mut collection = HostCollection::new();
    for (idx, item) in items.into_iter().enumerate() {
        let rule_set = match serde_json::from_value::<RuleSet>(item) {
            Ok(rule_set) => rule_set,
            Err(e) => {
                warn!("规则集解析失败，已跳过，索引：{}，错误：{}", idx, e);
                continue;
            }
        };
        if rule_set.match_pattern.is_empty() {
            warn!("规则集匹配模式为空，已跳过，索引：{}", idx);
            continue;
        }
        if collection.position_of(&rule_set.match_pattern).is_some() {
            warn!("重复的匹配模式 {}，已跳过，索引：{}", rule_set.match_pattern, idx);
            continue;
        }
        collection.push(rule_set);
    }
    collection
}
