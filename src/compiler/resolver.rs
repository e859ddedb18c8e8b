//! 生效规则集选择
//! 在所有匹配当前路径的规则集中选出模式最长的一个；
//! 长度相同的按插入顺序，先出现者胜出。

use super::pattern::PathMatcher;
use crate::rule::model::RuleSet;

/// 规则集选择器（纯函数，无副作用）
pub struct RuleResolver;

impl RuleResolver {
    /// 返回生效规则集在集合中的位置
    pub fn resolve_active_index(rule_sets: &[RuleSet], path: &str) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;

        for (idx, rule_set) in rule_sets.iter().enumerate() {
            let Some(matcher) = PathMatcher::compile(Some(&rule_set.match_pattern)) else {
                continue;
            };
            if !matcher.test(path) {
                continue;
            }

            let specificity = rule_set.match_pattern.chars().count();
            // 严格大于才替换，保证平局时先插入者胜出
            if best.is_none_or(|(_, best_len)| specificity > best_len) {
                best = Some((idx, specificity));
            }
        }

        best.map(|(idx, _)| idx)
    }

    /// 返回生效规则集引用
    pub fn resolve_active<'a>(rule_sets: &'a [RuleSet], path: &str) -> Option<&'a RuleSet> {
        Self::resolve_active_index(rule_sets, path).map(|idx| &rule_sets[idx])
    }
}
