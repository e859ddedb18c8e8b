//! 样式编译器
//! 伪类样式编译为样式表文本写入专属 <style> 元素；普通样式直接合并到元素内联 style。
//! 每次调用都是完整重算，重复调用结果不变。

use tracing::{debug, warn};

use crate::error::PageStyleError;
use crate::page::PageDocument;
use crate::rule::model::Rule;

/// 无效选择器记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedSelector {
    pub rule_index: usize,
    pub selector: String,
    pub reason: String,
}

/// 内联样式应用统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineReport {
    pub applied_rules: usize,
    pub touched_elements: usize,
    pub skipped_inert: usize,
    pub malformed: Vec<MalformedSelector>,
}

/// 样式编译器
pub struct StyleCompiler;

impl StyleCompiler {
    /// 编译伪类样式表：每个 (规则, 伪类) 输出一条 `selector+pseudo { prop: value; ... }`
    pub fn compile_pseudo(rules: &[Rule]) -> String {
        rules
            .iter()
            .filter(|rule| !rule.is_inert())
            .flat_map(|rule| {
                rule.pseudo_styles.iter().map(move |(pseudo, styles)| {
                    let body = styles
                        .iter()
                        .map(|(prop, value)| format!("{}: {};", prop, value))
                        .collect::<Vec<_>>()
                        .join(" ");
                    format!("{}{} {{ {} }}", rule.selector, pseudo, body)
                })
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 编译伪类样式并整体替换文档中的专属样式元素
    pub fn apply_pseudo(rules: &[Rule], document: &mut PageDocument) -> String {
        let css = Self::compile_pseudo(rules);
        if let Err(e) = document.set_owned_stylesheet(&css) {
            warn!("伪类样式写入失败：{}", e);
        }
        css
    }

    /// 按顺序逐条应用内联样式；单条规则失败只记录警告，不影响后续规则
    pub fn apply_inline(rules: &[Rule], document: &mut PageDocument) -> InlineReport {
        let mut report = InlineReport::default();

        for (rule_index, rule) in rules.iter().enumerate() {
            if rule.is_inert() {
                report.skipped_inert += 1;
                continue;
            }

            match document.apply_rule(rule) {
                Ok(touched) => {
                    report.applied_rules += 1;
                    report.touched_elements += touched;
                }
                Err(PageStyleError::MalformedSelector { selector, reason }) => {
                    warn!("无效选择器 \"{}\"，规则索引：{}，错误：{}", selector, rule_index, reason);
                    report.malformed.push(MalformedSelector {
                        rule_index,
                        selector,
                        reason,
                    });
                }
                Err(e) => {
                    warn!("规则应用失败，规则索引：{}，错误：{}", rule_index, e);
                }
            }
        }

        debug!(
            "内联样式应用完成：规则{}条、元素{}个、空选择器{}条、无效选择器{}条",
            report.applied_rules,
            report.touched_elements,
            report.skipped_inert,
            report.malformed.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::model::StyleMap;

    fn pseudo_rule(selector: &str, pseudo: &[(&str, &[(&str, &str)])]) -> Rule {
        let mut rule = Rule::with_selector(selector);
        for (suffix, props) in pseudo {
            let styles: StyleMap = props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            rule.pseudo_styles.insert(suffix.to_string(), styles);
        }
        rule
    }

    #[test]
    fn test_compile_pseudo_format() {
        let rules = vec![
            pseudo_rule("a.nav", &[(":hover", &[("color", "red"), ("text-decoration", "none")])]),
            Rule::with_selector("p"),
            pseudo_rule("h1", &[("::before", &[("content", "\"> \"")]), (":focus", &[("outline", "0")])]),
        ];

        let css = StyleCompiler::compile_pseudo(&rules);
        assert_eq!(
            css,
            "a.nav:hover { color: red; text-decoration: none; }\n\
             h1::before { content: \"> \"; }\n\
             h1:focus { outline: 0; }"
        );
    }

    #[test]
    fn test_compile_pseudo_skips_inert_rules() {
        let rules = vec![pseudo_rule("", &[(":hover", &[("color", "red")])])];
        assert_eq!(StyleCompiler::compile_pseudo(&rules), "");
    }

    #[test]
    fn test_compile_pseudo_keeps_empty_blocks() {
        let rules = vec![
            pseudo_rule("a", &[(":hover", &[])]),
            pseudo_rule("b", &[(":focus", &[("color", "red")])]),
        ];
        assert_eq!(
            StyleCompiler::compile_pseudo(&rules),
            "a:hover {  }\nb:focus { color: red; }"
        );
    }

    #[test]
    fn test_apply_inline_isolates_bad_selectors() {
        let mut doc = PageDocument::new("<body><p>a</p><span>b</span></body>");
        let mut bad = Rule::with_selector("p:hover");
        bad.styles.insert("color".into(), "red".into());
        let mut good = Rule::with_selector("span");
        good.styles.insert("color".into(), "blue".into());
        let rules = vec![Rule::blank(), bad, good];

        let report = StyleCompiler::apply_inline(&rules, &mut doc);
        assert_eq!(report.skipped_inert, 1);
        assert_eq!(report.applied_rules, 1);
        assert_eq!(report.touched_elements, 1);
        assert_eq!(report.malformed.len(), 1);
        assert_eq!(report.malformed[0].rule_index, 1);
        assert_eq!(doc.markup(), r#"<body><p>a</p><span style="color: blue;">b</span></body>"#);
    }

    #[test]
    fn test_quoted_values_survive_later_rules() {
        let mut doc = PageDocument::new("<p>x</p>");
        let mut font = Rule::with_selector("p");
        font.styles.insert("fontFamily".into(), "\"Fira Sans\", serif".into());
        let mut color = Rule::with_selector("p");
        color.styles.insert("color".into(), "red".into());

        let report = StyleCompiler::apply_inline(&[font, color], &mut doc);
        assert_eq!(report.applied_rules, 2);
        assert_eq!(
            doc.attribute_values("p", "style").unwrap(),
            vec![Some("font-family: \"Fira Sans\", serif; color: red;".to_string())]
        );
    }

    #[test]
    fn test_rules_apply_sequentially() {
        // 第二条规则看到第一条规则清空内容后的文档
        let mut doc = PageDocument::new(r#"<div id="box"><em>x</em><em>y</em></div><em>z</em>"#);
        let mut clear = Rule::with_selector("#box");
        clear.is_replace = true;
        let mut style = Rule::with_selector("em");
        style.styles.insert("color".into(), "red".into());
        style.element_index = Some(0);

        StyleCompiler::apply_inline(&[clear, style], &mut doc);
        assert_eq!(
            doc.markup(),
            r#"<div id="box"></div><em style="color: red;">z</em>"#
        );
    }

    #[test]
    fn test_full_compilation_is_idempotent() {
        let mut doc = PageDocument::new("<html><head></head><body><a href=\"#\">x</a></body></html>");
        let mut rule = pseudo_rule("a", &[(":hover", &[("color", "red")])]);
        rule.styles.insert("fontWeight".into(), "bold".into());
        let rules = vec![rule];

        let css1 = StyleCompiler::apply_pseudo(&rules, &mut doc);
        StyleCompiler::apply_inline(&rules, &mut doc);
        let markup1 = doc.markup().to_string();

        let css2 = StyleCompiler::apply_pseudo(&rules, &mut doc);
        StyleCompiler::apply_inline(&rules, &mut doc);

        assert_eq!(css1, css2);
        assert_eq!(doc.markup(), markup1);
        assert!(markup1.contains(r##"<a href="#" style="font-weight: bold;">x</a>"##));
    }
}
