//! 页面会话
//! 持有单个页面的全部引擎状态：站点规则集合、生效规则集、文档与脚本派发器。
//!
//! 所有编辑都遵循同一流程：修改内存状态 -> 立即应用 -> 尽力持久化。
//! 持久化失败只记录警告，已应用的页面状态不回滚。

use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tracing::{debug, warn};

use super::dispatcher::ScriptDispatcher;
use crate::compiler::{InlineReport, RuleResolver, StyleCompiler};
use crate::config::GlobalConfig;
use crate::error::{PageStyleError, PsResult};
use crate::page::{PageDocument, PageLocation};
use crate::rule::model::{HostCollection, Rule, RuleSet, StyleMap};
use crate::rule::storage::KeyValueStore;
use crate::rule::transfer::{build_export, parse_import, ExportFile};
use crate::rule::{ConfigStore, WILDCARD_PATTERN};

/// 编辑后需要执行的应用范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyScope {
    /// 仅重新应用样式
    Visual,
    /// 样式 + 脚本派发
    All,
    /// 只持久化，不影响页面（如折叠状态）
    PersistOnly,
}

/// 单次应用结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub stylesheet: String,
    pub inline: InlineReport,
    pub script_dispatched: bool,
}

/// 页面自身的 DOM 变化批次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomMutation {
    pub markup: String,
}

impl DomMutation {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

/// 页面会话
pub struct Session<S: KeyValueStore> {
    location: PageLocation,
    collection: HostCollection,
    active: Option<usize>,
    document: PageDocument,
    dispatcher: ScriptDispatcher,
    store: ConfigStore<S>,
    export_prefix: String,
}

impl<S: KeyValueStore> Session<S> {
    /// 加载站点规则并选出生效规则集（唯一的异步等待点）
    pub async fn open(
        config: &GlobalConfig,
        store: Arc<S>,
        location: PageLocation,
        markup: impl Into<String>,
        dispatcher: ScriptDispatcher,
    ) -> PsResult<Self> {
        let store = ConfigStore::new(store, config);
        let collection = store.load(location.hostname()).await?;
        let active = RuleResolver::resolve_active_index(&collection, location.path());
        debug!(
            "会话初始化：{}{}，规则集{}个，生效：{:?}",
            location.hostname(),
            location.path(),
            collection.len(),
            active.map(|idx| collection[idx].match_pattern.as_str())
        );

        Ok(Self {
            document: PageDocument::with_style_element_id(markup, config.style_element_id.clone()),
            location,
            collection,
            active,
            dispatcher,
            store,
            export_prefix: config.export_file_prefix.clone(),
        })
    }

    // ===== 只读访问 =====

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    pub fn collection(&self) -> &HostCollection {
        &self.collection
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_rule_set(&self) -> Option<&RuleSet> {
        self.active.and_then(|idx| self.collection.get(idx))
    }

    pub fn document(&self) -> &PageDocument {
        &self.document
    }

    pub fn into_document(self) -> PageDocument {
        self.document
    }

    /// 面板中匹配模式输入框的显示值：生效模式，或当前路径
    pub fn panel_pattern(&self) -> String {
        match self.active_rule_set() {
            Some(rule_set) => rule_set.match_pattern.clone(),
            None if self.location.path().is_empty() => "/".to_string(),
            None => self.location.path().to_string(),
        }
    }

    /// 面板中脚本开关的显示值：没有规则集时默认开启
    pub fn script_enabled_display(&self) -> bool {
        self.active_rule_set()
            .is_none_or(|rule_set| rule_set.global_script.enabled)
    }

    // ===== 应用 =====

    /// 仅应用样式；DOM 变化触发的重算只走这里
    pub fn apply_visual(&mut self) -> ApplyReport {
        let Some(idx) = self.active else {
            // 同站点内切换页面后不能残留上一页的伪类样式
            if let Err(e) = self.document.set_owned_stylesheet("") {
                warn!("清空伪类样式失败：{}", e);
            }
            return ApplyReport::default();
        };

        let rules = &self.collection[idx].rules;
        let stylesheet = StyleCompiler::apply_pseudo(rules, &mut self.document);
        let inline = StyleCompiler::apply_inline(rules, &mut self.document);
        ApplyReport {
            stylesheet,
            inline,
            script_dispatched: false,
        }
    }

    /// 完整应用：样式 + 派发一次全局脚本
    pub fn apply_all(&mut self) -> ApplyReport {
        let mut report = self.apply_visual();
        if let Some(rule_set) = self.active_rule_set() {
            let script = &rule_set.global_script;
            report.script_dispatched =
                script.is_runnable() && self.dispatcher.dispatch(&script.code, script.enabled);
        }
        report
    }

    /// 订阅页面 DOM 变化：每个批次重算一次样式，从不派发脚本
    pub async fn observe_mutations(&mut self, mut mutations: Receiver<DomMutation>) -> usize {
        let mut batches = 0;
        while let Some(mutation) = mutations.recv().await {
            self.document.replace_markup(mutation.markup);
            self.apply_visual();
            batches += 1;
        }
        debug!("DOM 变化订阅结束，共处理{}个批次", batches);
        batches
    }

    /// 按范围应用，然后尽力持久化
    pub async fn commit(&mut self, scope: ApplyScope) -> ApplyReport {
        let report = match scope {
            ApplyScope::Visual => self.apply_visual(),
            ApplyScope::All => self.apply_all(),
            ApplyScope::PersistOnly => ApplyReport::default(),
        };
        self.persist().await;
        report
    }

    async fn persist(&self) {
        if let Err(e) = self
            .store
            .save(self.location.hostname(), &self.collection)
            .await
        {
            warn!("规则保存失败，本次修改仅在当前页面生效：{}", e);
        }
    }

    fn reresolve(&mut self) {
        self.active = RuleResolver::resolve_active_index(&self.collection, self.location.path());
    }

    // ===== 规则集编辑 =====

    /// 确保存在生效规则集；没有时以给定模式新建
    ///
    /// 模式去除首尾空白，为空时使用 `*`；与已有模式重复时拒绝。
    pub fn ensure_active(&mut self, pattern_hint: Option<&str>) -> PsResult<usize> {
        if let Some(idx) = self.active {
            return Ok(idx);
        }

        let pattern = pattern_hint
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(WILDCARD_PATTERN)
            .to_string();
        if self.collection.position_of(&pattern).is_some() {
            return Err(PageStyleError::DuplicatePattern(pattern));
        }

        debug!("新建规则集：{}", pattern);
        self.collection.push(RuleSet::new(pattern));
        let idx = self.collection.len() - 1;
        self.active = Some(idx);
        Ok(idx)
    }

    /// 以面板默认值（当前路径）确保存在生效规则集
    fn ensure_active_default(&mut self) -> PsResult<usize> {
        let hint = self.panel_pattern();
        self.ensure_active(Some(&hint))
    }

    /// 修改生效规则集的匹配模式，之后按当前路径重新选择生效规则集
    pub async fn set_match_pattern(&mut self, pattern: &str) -> PsResult<ApplyReport> {
        let idx = self.active.ok_or(PageStyleError::NoActiveRuleSet)?;
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(PageStyleError::EmptyPattern);
        }
        if self.collection.pattern_taken(pattern, Some(idx)) {
            return Err(PageStyleError::DuplicatePattern(pattern.to_string()));
        }

        self.collection[idx].match_pattern = pattern.to_string();
        self.reresolve();
        Ok(self.commit(ApplyScope::All).await)
    }

    pub async fn set_script_code(&mut self, code: &str) -> PsResult<ApplyReport> {
        let idx = self.ensure_active_default()?;
        self.collection[idx].global_script.code = code.to_string();
        Ok(self.commit(ApplyScope::All).await)
    }

    pub async fn set_script_enabled(&mut self, enabled: bool) -> PsResult<ApplyReport> {
        let idx = self.ensure_active_default()?;
        self.collection[idx].global_script.enabled = enabled;
        Ok(self.commit(ApplyScope::All).await)
    }

    // ===== 规则编辑 =====

    fn rule_mut(&mut self, rule_index: usize) -> PsResult<&mut Rule> {
        let idx = self.active.ok_or(PageStyleError::NoActiveRuleSet)?;
        self.collection[idx]
            .rules
            .get_mut(rule_index)
            .ok_or(PageStyleError::RuleNotFound(rule_index))
    }

    /// 追加空白规则，返回其索引
    pub async fn add_rule(&mut self) -> PsResult<usize> {
        let idx = self.ensure_active_default()?;
        let rules = &mut self.collection[idx].rules;
        rules.push(Rule::blank());
        let rule_index = rules.len() - 1;
        self.commit(ApplyScope::Visual).await;
        Ok(rule_index)
    }

    pub async fn remove_rule(&mut self, rule_index: usize) -> PsResult<ApplyReport> {
        let idx = self.active.ok_or(PageStyleError::NoActiveRuleSet)?;
        let rules = &mut self.collection[idx].rules;
        if rule_index >= rules.len() {
            return Err(PageStyleError::RuleNotFound(rule_index));
        }
        rules.remove(rule_index);
        Ok(self.commit(ApplyScope::All).await)
    }

    pub async fn set_selector(&mut self, rule_index: usize, selector: &str) -> PsResult<ApplyReport> {
        self.rule_mut(rule_index)?.selector = selector.to_string();
        Ok(self.commit(ApplyScope::Visual).await)
    }

    pub async fn set_element_index(
        &mut self,
        rule_index: usize,
        element_index: Option<i64>,
    ) -> PsResult<ApplyReport> {
        self.rule_mut(rule_index)?.element_index = element_index;
        Ok(self.commit(ApplyScope::Visual).await)
    }

    pub async fn set_replace(&mut self, rule_index: usize, is_replace: bool) -> PsResult<ApplyReport> {
        self.rule_mut(rule_index)?.is_replace = is_replace;
        Ok(self.commit(ApplyScope::Visual).await)
    }

    /// 折叠状态只影响编辑器显示
    pub async fn toggle_collapsed(&mut self, rule_index: usize) -> PsResult<bool> {
        let rule = self.rule_mut(rule_index)?;
        rule.is_collapsed = !rule.is_collapsed;
        let collapsed = rule.is_collapsed;
        self.commit(ApplyScope::PersistOnly).await;
        Ok(collapsed)
    }

    // ===== 样式编辑 =====

    pub async fn set_style(
        &mut self,
        rule_index: usize,
        property: &str,
        value: &str,
    ) -> PsResult<ApplyReport> {
        let rule = self.rule_mut(rule_index)?;
        set_or_remove(&mut rule.styles, property, value);
        Ok(self.commit(ApplyScope::Visual).await)
    }

    /// 重命名属性；新名称为空时删除该属性
    pub async fn rename_style(
        &mut self,
        rule_index: usize,
        old_property: &str,
        new_property: &str,
    ) -> PsResult<ApplyReport> {
        let rule = self.rule_mut(rule_index)?;
        rename_key(&mut rule.styles, old_property, new_property);
        Ok(self.commit(ApplyScope::Visual).await)
    }

    pub async fn remove_style(&mut self, rule_index: usize, property: &str) -> PsResult<ApplyReport> {
        self.rule_mut(rule_index)?.styles.remove(property);
        Ok(self.commit(ApplyScope::Visual).await)
    }

    /// 新增占位属性（`property`、`property-1` ...），返回属性名
    pub async fn add_style_placeholder(&mut self, rule_index: usize) -> PsResult<String> {
        let rule = self.rule_mut(rule_index)?;
        let name = unique_key(&rule.styles, "property");
        rule.styles.insert(name.clone(), "value".to_string());
        self.commit(ApplyScope::Visual).await;
        Ok(name)
    }

    // ===== 伪类样式编辑 =====

    /// 新增伪类块（`:new-pseudo`、`:new-pseudo-1` ...），返回伪类名
    pub async fn add_pseudo_block(&mut self, rule_index: usize) -> PsResult<String> {
        let rule = self.rule_mut(rule_index)?;
        let name = unique_key(&rule.pseudo_styles, ":new-pseudo");
        let mut styles = StyleMap::new();
        styles.insert("property".to_string(), "value".to_string());
        rule.pseudo_styles.insert(name.clone(), styles);
        self.commit(ApplyScope::Visual).await;
        Ok(name)
    }

    /// 重命名伪类块；新名称为空时删除该块
    pub async fn rename_pseudo_block(
        &mut self,
        rule_index: usize,
        old_pseudo: &str,
        new_pseudo: &str,
    ) -> PsResult<ApplyReport> {
        let rule = self.rule_mut(rule_index)?;
        rename_key(&mut rule.pseudo_styles, old_pseudo, new_pseudo);
        Ok(self.commit(ApplyScope::Visual).await)
    }

    pub async fn remove_pseudo_block(&mut self, rule_index: usize, pseudo: &str) -> PsResult<ApplyReport> {
        self.rule_mut(rule_index)?.pseudo_styles.remove(pseudo);
        Ok(self.commit(ApplyScope::Visual).await)
    }

    pub async fn set_pseudo_style(
        &mut self,
        rule_index: usize,
        pseudo: &str,
        property: &str,
        value: &str,
    ) -> PsResult<ApplyReport> {
        let rule = self.rule_mut(rule_index)?;
        let styles = rule.pseudo_styles.entry(pseudo.trim().to_string()).or_default();
        set_or_remove(styles, property, value);
        Ok(self.commit(ApplyScope::Visual).await)
    }

    // ===== 导入 / 导出 / 清空 =====

    /// 导入并整体替换站点规则；格式错误时内存状态不变
    pub async fn import_json(&mut self, text: &str) -> PsResult<ApplyReport> {
        let collection = parse_import(text)?;
        debug!("导入规则集{}个", collection.len());
        self.collection = collection;
        self.reresolve();
        Ok(self.commit(ApplyScope::All).await)
    }

    pub fn export(&self) -> PsResult<Option<ExportFile>> {
        build_export(&self.collection, self.location.hostname(), &self.export_prefix)
    }

    /// 清空站点全部规则
    pub async fn clear_all(&mut self) -> ApplyReport {
        self.collection = HostCollection::new();
        self.active = None;
        self.commit(ApplyScope::All).await
    }
}

/// 属性名去空白；名称为空忽略，值为空视为删除
fn set_or_remove(styles: &mut StyleMap, property: &str, value: &str) {
    let property = property.trim();
    if property.is_empty() {
        return;
    }
    if value.is_empty() {
        styles.remove(property);
    } else {
        styles.insert(property.to_string(), value.to_string());
    }
}

fn rename_key<V>(map: &mut std::collections::BTreeMap<String, V>, old: &str, new: &str) {
    let new = new.trim();
    if new == old {
        return;
    }
    let Some(value) = map.remove(old) else {
        return;
    };
    if !new.is_empty() {
        map.insert(new.to_string(), value);
    }
}

fn unique_key<V>(map: &std::collections::BTreeMap<String, V>, base: &str) -> String {
    if !map.contains_key(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !map.contains_key(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::message::ExtensionMessage;
    use crate::rule::storage::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    const PAGE: &str = r#"<html><head><title>t</title></head><body><div class="card">a</div><div class="card">b</div><div class="card">c</div><div class="card">d</div><div class="card">e</div></body></html>"#;

    struct Harness {
        session: Session<MemoryStore>,
        scripts: UnboundedReceiver<ExtensionMessage>,
        store: Arc<MemoryStore>,
    }

    impl Harness {
        fn dispatched(&mut self) -> Vec<String> {
            let mut out = Vec::new();
            while let Ok(ExtensionMessage::ExecuteScript { script }) = self.scripts.try_recv() {
                out.push(script);
            }
            out
        }

        async fn stored(&self) -> Option<serde_json::Value> {
            self.store.get("cssConfigs_example.com").await.unwrap()
        }
    }

    async fn open(stored: Option<serde_json::Value>, path: &str) -> Harness {
        let mut entries = HashMap::new();
        if let Some(value) = stored {
            entries.insert("cssConfigs_example.com".to_string(), value);
        }
        let store = Arc::new(MemoryStore::with_entries(entries));
        let (dispatcher, scripts) = ScriptDispatcher::channel();
        let session = Session::open(
            &GlobalConfig::default(),
            Arc::clone(&store),
            PageLocation::new("example.com", path),
            PAGE,
            dispatcher,
        )
        .await
        .unwrap();
        Harness {
            session,
            scripts,
            store,
        }
    }

    fn blog_sets() -> serde_json::Value {
        json!([
            {"matchPattern": "/blog/*", "configs": [{"selector": "div.card", "styles": {"color": "blue"}}],
             "globalScript": {"code": "wide()", "enabled": true}},
            {"matchPattern": "/blog/post-1", "configs": [
                {"selector": "div.card", "elementIndex": 2, "styles": {"color": "red"},
                 "pseudoStyles": {":hover": {"color": "green"}}}
             ], "globalScript": {"code": "narrow()", "enabled": true}}
        ])
    }

    #[tokio::test]
    async fn test_open_resolves_longest_pattern_and_applies() {
        let mut h = open(Some(blog_sets()), "/blog/post-1").await;
        assert_eq!(h.session.active_rule_set().unwrap().match_pattern, "/blog/post-1");

        let report = h.session.apply_all();
        assert!(report.script_dispatched);
        assert_eq!(report.stylesheet, "div.card:hover { color: green; }");
        assert_eq!(h.dispatched(), vec!["narrow()"]);

        let styles = h.session.document().attribute_values("div.card", "style").unwrap();
        assert_eq!(styles, vec![None, None, Some("color: red;".into()), None, None]);
    }

    #[tokio::test]
    async fn test_mutations_reapply_visuals_without_scripts() {
        let mut h = open(Some(blog_sets()), "/blog/other").await;
        h.session.apply_all();
        assert_eq!(h.dispatched(), vec!["wide()"]);

        let (tx, rx) = mpsc::channel(4);
        tx.send(DomMutation::new(r#"<html><head></head><body><div class="card">new</div></body></html>"#))
            .await
            .unwrap();
        tx.send(DomMutation::new(r#"<html><head></head><body><p>gone</p></body></html>"#))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(h.session.observe_mutations(rx).await, 2);
        assert!(h.dispatched().is_empty());
        // 最后一批没有匹配元素，样式表仍在
        assert_eq!(
            h.session.document().owned_stylesheet().unwrap().as_deref(),
            Some("")
        );
    }

    #[tokio::test]
    async fn test_mutation_batch_styles_inserted_elements() {
        let mut h = open(Some(blog_sets()), "/blog/other").await;
        let (tx, rx) = mpsc::channel(1);
        tx.send(DomMutation::new(r#"<body><div class="card">late</div></body>"#))
            .await
            .unwrap();
        drop(tx);

        h.session.observe_mutations(rx).await;
        assert_eq!(
            h.session.document().attribute_values("div.card", "style").unwrap(),
            vec![Some("color: blue;".to_string())]
        );
    }

    #[tokio::test]
    async fn test_no_active_clears_stylesheet() {
        let mut h = open(Some(blog_sets()), "/shop").await;
        assert!(h.session.active_rule_set().is_none());
        let report = h.session.apply_all();
        assert!(!report.script_dispatched);
        assert_eq!(h.session.document().owned_stylesheet().unwrap().as_deref(), Some(""));
        assert_eq!(h.session.panel_pattern(), "/shop");
        assert!(h.session.script_enabled_display());
    }

    #[tokio::test]
    async fn test_add_rule_creates_rule_set_for_path() {
        let mut h = open(None, "/docs/intro").await;
        let rule_index = h.session.add_rule().await.unwrap();
        assert_eq!(rule_index, 0);
        assert_eq!(h.session.active_rule_set().unwrap().match_pattern, "/docs/intro");

        h.session.set_selector(0, "div.card").await.unwrap();
        h.session.set_element_index(0, Some(0)).await.unwrap();
        h.session.set_style(0, "color", "red").await.unwrap();

        let styles = h.session.document().attribute_values("div.card", "style").unwrap();
        assert_eq!(styles[0].as_deref(), Some("color: red;"));
        assert_eq!(styles[1], None);

        let stored = h.stored().await.unwrap();
        assert_eq!(stored[0]["matchPattern"], "/docs/intro");
        assert_eq!(stored[0]["configs"][0]["styles"]["color"], "red");
        // 仅样式编辑不派发脚本
        assert!(h.dispatched().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_pattern_rejected() {
        let mut h = open(Some(blog_sets()), "/blog/post-1").await;
        let before = h.session.collection().clone();

        let err = h.session.set_match_pattern(" /blog/* ").await.unwrap_err();
        assert!(matches!(err, PageStyleError::DuplicatePattern(p) if p == "/blog/*"));
        let err = h.session.set_match_pattern("   ").await.unwrap_err();
        assert!(matches!(err, PageStyleError::EmptyPattern));
        assert_eq!(h.session.collection(), &before);

        // 修改为自身模式不算重复
        h.session.set_match_pattern("/blog/post-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_active_duplicate() {
        let mut h = open(Some(json!([{"matchPattern": "/a"}])), "/b").await;
        let err = h.session.ensure_active(Some("/a")).unwrap_err();
        assert!(matches!(err, PageStyleError::DuplicatePattern(_)));
        assert_eq!(h.session.collection().len(), 1);

        assert_eq!(h.session.ensure_active(Some("  ")).unwrap(), 1);
        assert_eq!(h.session.active_rule_set().unwrap().match_pattern, "*");
    }

    #[tokio::test]
    async fn test_pattern_edit_reresolves() {
        let mut h = open(Some(blog_sets()), "/blog/post-1").await;
        h.dispatched();

        h.session.set_match_pattern("/elsewhere").await.unwrap();
        // 修改后不再匹配，回落到 /blog/*
        assert_eq!(h.session.active_rule_set().unwrap().match_pattern, "/blog/*");
        assert_eq!(h.dispatched(), vec!["wide()"]);
    }

    #[tokio::test]
    async fn test_script_edits_dispatch() {
        let mut h = open(None, "/").await;
        let report = h.session.set_script_code("hello()").await.unwrap();
        assert!(report.script_dispatched);
        assert_eq!(h.session.active_rule_set().unwrap().match_pattern, "/");

        h.session.set_script_enabled(false).await.unwrap();
        assert_eq!(h.dispatched(), vec!["hello()"]);
        assert!(!h.session.script_enabled_display());
    }

    #[tokio::test]
    async fn test_import_replaces_or_leaves_untouched() {
        let mut h = open(Some(blog_sets()), "/blog/post-1").await;
        let before = h.session.collection().clone();
        let stored_before = h.stored().await;

        assert!(h.session.import_json(r#"{"not": "array"}"#).await.is_err());
        assert!(h.session.import_json(r#"[{"selector": "x"}]"#).await.is_err());
        assert_eq!(h.session.collection(), &before);
        assert_eq!(h.stored().await, stored_before);

        h.session
            .import_json(r#"[{"matchPattern": "*", "configs": [{"selector": "body"}]}]"#)
            .await
            .unwrap();
        assert_eq!(h.session.collection().len(), 1);
        assert_eq!(h.session.active_rule_set().unwrap().match_pattern, "*");
        assert_eq!(h.stored().await.unwrap()[0]["matchPattern"], "*");
    }

    #[tokio::test]
    async fn test_clear_all_and_export() {
        let mut h = open(Some(blog_sets()), "/blog/post-1").await;
        let file = h.session.export().unwrap().unwrap();
        assert_eq!(file.file_name, "css-config-example.com.json");

        h.session.apply_all();
        h.session.clear_all().await;
        assert!(h.session.collection().is_empty());
        assert!(h.session.active_rule_set().is_none());
        assert_eq!(h.session.export().unwrap(), None);
        assert_eq!(h.stored().await, Some(json!([])));
        assert_eq!(h.session.document().owned_stylesheet().unwrap().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_style_and_pseudo_editing() {
        let mut h = open(None, "/").await;
        h.session.add_rule().await.unwrap();
        h.session.set_selector(0, "a").await.unwrap();

        assert_eq!(h.session.add_style_placeholder(0).await.unwrap(), "property");
        assert_eq!(h.session.add_style_placeholder(0).await.unwrap(), "property-1");
        h.session.rename_style(0, "property", "color").await.unwrap();
        h.session.set_style(0, "color", "red").await.unwrap();
        h.session.rename_style(0, "property-1", "").await.unwrap();

        let pseudo = h.session.add_pseudo_block(0).await.unwrap();
        assert_eq!(pseudo, ":new-pseudo");
        h.session.rename_pseudo_block(0, &pseudo, ":hover").await.unwrap();
        h.session.set_pseudo_style(0, ":hover", "property", "").await.unwrap();
        let report = h.session.set_pseudo_style(0, ":hover", "color", "blue").await.unwrap();
        assert_eq!(report.stylesheet, "a:hover { color: blue; }");

        let rule = &h.session.active_rule_set().unwrap().rules[0];
        assert_eq!(rule.styles.len(), 1);
        assert_eq!(rule.styles["color"], "red");

        h.session.remove_pseudo_block(0, ":hover").await.unwrap();
        h.session.remove_style(0, "color").await.unwrap();
        let rule = &h.session.active_rule_set().unwrap().rules[0];
        assert!(rule.styles.is_empty() && rule.pseudo_styles.is_empty());
    }

    #[tokio::test]
    async fn test_rule_level_edits() {
        let mut h = open(None, "/").await;
        assert!(matches!(
            h.session.remove_rule(0).await,
            Err(PageStyleError::NoActiveRuleSet)
        ));

        h.session.add_rule().await.unwrap();
        assert!(h.session.toggle_collapsed(0).await.unwrap());
        h.session.set_replace(0, true).await.unwrap();
        assert!(matches!(
            h.session.set_selector(3, "x").await,
            Err(PageStyleError::RuleNotFound(3))
        ));

        h.session.remove_rule(0).await.unwrap();
        assert!(h.session.active_rule_set().unwrap().rules.is_empty());
    }

    #[test]
    fn test_unique_key_and_rename() {
        let mut map = StyleMap::new();
        assert_eq!(unique_key(&map, "property"), "property");
        map.insert("property".into(), "v".into());
        map.insert("property-1".into(), "v".into());
        assert_eq!(unique_key(&map, "property"), "property-2");

        rename_key(&mut map, "property", " width ");
        assert!(map.contains_key("width"));
        rename_key(&mut map, "missing", "x");
        assert!(!map.contains_key("x"));
    }
}
