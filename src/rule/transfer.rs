//! 规则导入导出
//! 导入：校验结构后整体替换；导出：过滤空规则集，格式化 JSON

use serde_json::Value;

use super::migration::first_has_pattern;
use super::model::{HostCollection, RuleSet};
use crate::error::{PageStyleError, PsResult};

/// 导出文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

/// 解析导入文件内容
///
/// 顶层必须是数组，非空时首元素必须含 `matchPattern`；任何一个规则集解析失败、
/// 模式为空或重复都会拒绝整个导入，调用方状态保持不变。
pub fn parse_import(text: &str) -> PsResult<HostCollection> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| PageStyleError::ImportFormatError(format!("JSON解析失败：{}", e)))?;

    let Value::Array(items) = value else {
        return Err(PageStyleError::ImportFormatError(
            "顶层必须是规则集数组".to_string(),
        ));
    };
    if let Some(first) = items.first() {
        if !first_has_pattern(first) {
            return Err(PageStyleError::ImportFormatError(
                "规则集缺少 matchPattern 字段".to_string(),
            ));
        }
    }

    let mut collection = HostCollection::new();
    for (idx, item) in items.into_iter().enumerate() {
        let rule_set: RuleSet = serde_json::from_value(item).map_err(|e| {
            PageStyleError::ImportFormatError(format!("第 {} 个规则集无效：{}", idx + 1, e))
        })?;
        if rule_set.match_pattern.trim().is_empty() {
            return Err(PageStyleError::ImportFormatError(format!(
                "第 {} 个规则集匹配模式为空",
                idx + 1
            )));
        }
        if collection.position_of(&rule_set.match_pattern).is_some() {
            return Err(PageStyleError::ImportFormatError(format!(
                "匹配模式重复：{}",
                rule_set.match_pattern
            )));
        }
        collection.push(rule_set);
    }
    Ok(collection)
}

/// 导出文件名：`<前缀><hostname>.json`
pub fn export_file_name(prefix: &str, hostname: &str) -> String {
    format!("{}{}.json", prefix, hostname)
}

/// 构建导出文件；没有可导出的规则集时返回 `None`
pub fn build_export(
    collection: &HostCollection,
    hostname: &str,
    prefix: &str,
) -> PsResult<Option<ExportFile>> {
    let exportable: Vec<&RuleSet> = collection.iter().filter(|rs| rs.has_content()).collect();
    if exportable.is_empty() {
        return Ok(None);
    }

    Ok(Some(ExportFile {
        file_name: export_file_name(prefix, hostname),
        contents: serde_json::to_string_pretty(&exportable)?,
    }))
}
