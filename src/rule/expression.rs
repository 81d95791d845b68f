use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::cache::EntityCache;
use crate::ExpressionSource;
use crate::Result;
use crate::Tag;
use crate::TagValue;

/// Read-only bindings an expression evaluates against.
pub trait ExpressionContext: Send + Sync {
    /// Current value of a tag, if the tag exists and carries one.
    fn tag_value(
        &self,
        tag_id: u64,
    ) -> Option<TagValue>;
}

/// A compiled expression handle.
///
/// `evaluate` must be pure given the bindings; compilation is expensive and
/// happens once per expression text, never per cycle.
pub trait CompiledExpression: Send + Sync {
    fn evaluate(
        &self,
        ctx: &dyn ExpressionContext,
    ) -> Result<TagValue>;
}

/// Capability boundary for turning expression text into a compiled handle.
///
/// Any embeddable expression engine satisfies this contract; failures
/// surface as `EvaluationError::Compile`.
pub trait ExpressionCompiler: Send + Sync {
    fn compile(
        &self,
        rule_id: u64,
        text: &str,
    ) -> Result<Arc<dyn CompiledExpression>>;
}

/// Expression bindings backed by the tag cache.
pub struct TagCacheContext {
    tags: Arc<EntityCache<Tag>>,
}

impl TagCacheContext {
    pub fn new(tags: Arc<EntityCache<Tag>>) -> Self {
        Self { tags }
    }
}

impl ExpressionContext for TagCacheContext {
    fn tag_value(
        &self,
        tag_id: u64,
    ) -> Option<TagValue> {
        self.tags.get(tag_id).ok().and_then(|tag| tag.value)
    }
}

struct CompiledEntry {
    text: String,
    expr: Arc<dyn CompiledExpression>,
}

/// Scheduler-owned registry of compiled expressions.
///
/// Explicitly constructed and injected, with a defined populate/teardown
/// lifecycle; nothing here is process-global. Texts are compiled exactly
/// once and replaced only when the text actually changes.
pub struct ExpressionRegistry {
    compiler: Arc<dyn ExpressionCompiler>,
    compiled: DashMap<u64, CompiledEntry>,
}

impl ExpressionRegistry {
    pub fn new(compiler: Arc<dyn ExpressionCompiler>) -> Self {
        Self {
            compiler,
            compiled: DashMap::new(),
        }
    }

    /// Compiles and installs one expression; a no-op when the text is
    /// unchanged, recompile-and-replace when it differs.
    pub fn install(
        &self,
        rule_id: u64,
        text: &str,
    ) -> Result<()> {
        if let Some(entry) = self.compiled.get(&rule_id) {
            if entry.text == text {
                debug!("rule {} expression unchanged, keeping compiled handle", rule_id);
                return Ok(());
            }
        }
        let expr = self.compiler.compile(rule_id, text)?;
        self.compiled.insert(
            rule_id,
            CompiledEntry {
                text: text.to_string(),
                expr,
            },
        );
        debug!("rule {} expression compiled and installed", rule_id);
        Ok(())
    }

    /// Drops a rule's compiled handle on unconfiguration.
    pub fn remove(
        &self,
        rule_id: u64,
    ) {
        self.compiled.remove(&rule_id);
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Stable copy of the registry for one evaluation cycle.
    pub fn snapshot(&self) -> Vec<(u64, Arc<dyn CompiledExpression>)> {
        self.compiled
            .iter()
            .map(|entry| (*entry.key(), entry.expr.clone()))
            .collect()
    }

    /// Populates the registry from the persisted expression texts.
    ///
    /// A definition that fails to compile is logged and skipped so one bad
    /// rule cannot block startup; returns the number installed.
    pub fn populate(
        &self,
        source: &dyn ExpressionSource,
    ) -> Result<usize> {
        let defs = source.get_all_expressions()?;
        let mut installed = 0;
        for def in defs {
            match self.install(def.rule_id, &def.text) {
                Ok(()) => installed += 1,
                Err(e) => {
                    error!("skipping rule {}: {:?}", def.rule_id, e);
                }
            }
        }
        info!("expression registry populated with {} compiled rules", installed);
        Ok(installed)
    }
}
