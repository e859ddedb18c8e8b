//! 页面文档
//! 以 HTML 文本承载页面状态，所有查询与修改都通过 lol_html 流式改写完成

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lol_html::html_content::{ContentType, EndTag};
use lol_html::{element, text, EndTagHandler, HandlerResult, HtmlRewriter, Selector, Settings};

use crate::error::{PageStyleError, PsResult};
use crate::rule::model::Rule;
use crate::utils::StyleDeclarations;

/// 默认的伪类样式元素 id
pub const DEFAULT_STYLE_ELEMENT_ID: &str = "rspagestyle-pseudo-styles";

/// 页面文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    markup: String,
    style_element_id: String,
}

impl PageDocument {
    pub fn new(markup: impl Into<String>) -> Self {
        Self::with_style_element_id(markup, DEFAULT_STYLE_ELEMENT_ID)
    }

    pub fn with_style_element_id(markup: impl Into<String>, style_element_id: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            style_element_id: style_element_id.into(),
        }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn into_markup(self) -> String {
        self.markup
    }

    /// 页面自身的 DOM 变化（整页替换）
    pub fn replace_markup(&mut self, markup: impl Into<String>) {
        self.markup = markup.into();
    }

    pub fn style_element_id(&self) -> &str {
        &self.style_element_id
    }

    /// 解析选择器，不支持的语法统一视为无效选择器
    pub fn parse_selector(selector: &str) -> PsResult<Selector> {
        selector
            .parse::<Selector>()
            .map_err(|e| PageStyleError::MalformedSelector {
                selector: selector.to_string(),
                reason: e.to_string(),
            })
    }

    /// 按文档顺序统计匹配元素数量
    pub fn query_count(&self, selector: &str) -> PsResult<usize> {
        Self::parse_selector(selector)?;
        let count = Cell::new(0usize);
        run_rewriter(
            &self.markup,
            Settings {
                element_content_handlers: vec![element!(selector, |_el| {
                    count.set(count.get() + 1);
                    Ok(())
                })],
                strict: false,
                ..Settings::default()
            },
        )?;
        Ok(count.get())
    }

    /// 按文档顺序读取匹配元素的属性值
    pub fn attribute_values(&self, selector: &str, name: &str) -> PsResult<Vec<Option<String>>> {
        Self::parse_selector(selector)?;
        let values = RefCell::new(Vec::new());
        run_rewriter(
            &self.markup,
            Settings {
                element_content_handlers: vec![element!(selector, |el| {
                    values.borrow_mut().push(el.get_attribute(name).map(decode_attribute));
                    Ok(())
                })],
                strict: false,
                ..Settings::default()
            },
        )?;
        Ok(values.into_inner())
    }

    /// 对文档应用单条规则，返回被修改的元素数量
    ///
    /// 索引有效且在匹配范围内时只作用于该位置的元素，否则作用于全部匹配元素。
    /// `isReplace` 先清空元素内容，再把样式合并进 `style` 属性。
    pub fn apply_rule(&mut self, rule: &Rule) -> PsResult<usize> {
        let selector = rule.selector.trim();
        Self::parse_selector(selector)?;

        let target = match rule.target_index() {
            Some(idx) if idx < self.query_count(selector)? => Some(idx),
            _ => None,
        };

        let seen = Cell::new(0usize);
        let touched = Cell::new(0usize);
        let output = run_rewriter(
            &self.markup,
            Settings {
                element_content_handlers: vec![element!(selector, |el| {
                    let position = seen.get();
                    seen.set(position + 1);
                    if target.is_some_and(|idx| idx != position) {
                        return Ok(());
                    }

                    if rule.is_replace && el.can_have_content() {
                        el.set_inner_content("", ContentType::Text);
                    }

                    if !rule.styles.is_empty() {
                        let current = el.get_attribute("style").map(decode_attribute);
                        let mut decls = StyleDeclarations::parse(current.as_deref().unwrap_or(""));
                        decls.set_all(&rule.styles);
                        let merged = decls.to_string();

                        if merged.is_empty() {
                            if current.is_some() {
                                el.remove_attribute("style");
                            }
                        } else if current.as_deref() != Some(merged.as_str()) {
                            el.set_attribute("style", &merged)?;
                        }
                    }

                    touched.set(touched.get() + 1);
                    Ok(())
                })],
                strict: false,
                ..Settings::default()
            },
        )?;

        self.markup = output;
        Ok(touched.get())
    }

    /// 整体替换伪类样式表
    ///
    /// 旧的样式元素被移除，新元素追加到 `</head>` 之前；
    /// 没有闭合 head 时放到 body 开头，两者都没有时放在文档开头。
    pub fn set_owned_stylesheet(&mut self, css: &str) -> PsResult<()> {
        let owned_selector = format!("style#{}", self.style_element_id);
        Self::parse_selector(&owned_selector)?;

        let tag = format!(
            r#"<style id="{}">{}</style>"#,
            self.style_element_id,
            escape_style_text(css)
        );
        let inserted = Rc::new(Cell::new(false));
        let head_inserted = Rc::clone(&inserted);
        let head_tag = tag.clone();

        let output = run_rewriter(
            &self.markup,
            Settings {
                element_content_handlers: vec![
                    element!(owned_selector, |el| {
                        el.remove();
                        Ok(())
                    }),
                    element!("head", move |el| {
                        if let Some(handlers) = el.end_tag_handlers() {
                            let tag = head_tag.clone();
                            let flag = Rc::clone(&head_inserted);
                            let handler: EndTagHandler<'static> =
                                Box::new(move |end: &mut EndTag<'_>| -> HandlerResult {
                                    end.before(&tag, ContentType::Html);
                                    flag.set(true);
                                    Ok(())
                                });
                            handlers.push(handler);
                        }
                        Ok(())
                    }),
                    element!("body", |el| {
                        if !inserted.get() {
                            el.prepend(&tag, ContentType::Html);
                            inserted.set(true);
                        }
                        Ok(())
                    }),
                ],
                strict: false,
                ..Settings::default()
            },
        )?;

        self.markup = if inserted.get() {
            output
        } else {
            insert_after_doctype(&output, &tag)
        };
        Ok(())
    }

    /// 读取当前伪类样式表文本；样式元素不存在时返回 `None`
    pub fn owned_stylesheet(&self) -> PsResult<Option<String>> {
        let owned_selector = format!("style#{}", self.style_element_id);
        Self::parse_selector(&owned_selector)?;

        let found = Cell::new(false);
        let css = RefCell::new(String::new());
        run_rewriter(
            &self.markup,
            Settings {
                element_content_handlers: vec![
                    element!(owned_selector, |_el| {
                        found.set(true);
                        Ok(())
                    }),
                    text!(owned_selector, |chunk| {
                        css.borrow_mut().push_str(chunk.as_str());
                        Ok(())
                    }),
                ],
                strict: false,
                ..Settings::default()
            },
        )?;

        Ok(found
            .get()
            .then(|| unescape_style_text(&css.into_inner())))
    }
}

/// 执行一次改写，返回改写后的 HTML
fn run_rewriter(markup: &str, settings: Settings<'_, '_>) -> PsResult<String> {
    let mut output = Vec::with_capacity(markup.len() + 256);
    let mut rewriter = HtmlRewriter::new(settings, |chunk: &[u8]| output.extend_from_slice(chunk));
    rewriter
        .write(markup.as_bytes())
        .map_err(|e| PageStyleError::RewriteError(e.to_string()))?;
    rewriter
        .end()
        .map_err(|e| PageStyleError::RewriteError(e.to_string()))?;

    String::from_utf8(output).map_err(|e| PageStyleError::RewriteError(e.to_string()))
}

/// 属性原文中的字符引用（`&quot;`、`&#39;`、`&amp;` ...）解码为实际字符；
/// 写回时由 `set_attribute` 重新转义
fn decode_attribute(raw: String) -> String {
    html_escape::decode_html_entities(&raw).into_owned()
}

// <style> 是原始文本元素，只需避免提前出现 "</"
fn escape_style_text(css: &str) -> String {
    css.replace("</", "<\\/")
}

fn unescape_style_text(css: &str) -> String {
    css.replace("<\\/", "</")
}

/// 无 head/body 时插入到文档开头（保留 DOCTYPE 在最前）
fn insert_after_doctype(markup: &str, tag: &str) -> String {
    let trimmed = markup.trim_start();
    let offset = markup.len() - trimmed.len();
    if trimmed.len() >= 9 && trimmed[..9].eq_ignore_ascii_case("<!doctype") {
        if let Some(end) = trimmed.find('>') {
            let split = offset + end + 1;
            return format!("{}{}{}", &markup[..split], tag, &markup[split..]);
        }
    }
    format!("{}{}", tag, markup)
}
