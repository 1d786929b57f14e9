use crate::error::Result;
use crate::serializer::to_value;
use crate::tpl::ast::Node;
use crate::tpl::lexer::tokenize;
use crate::tpl::parser::parse;
use crate::tpl::render::Fragments;
use crate::tpl::resolver::Context;
use crate::value::{ToValue, Value};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::debug;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// A compiled template: parse once, render against many contexts.
///
/// The tree is read-only after compilation, so a `Template` can be shared
/// across threads and rendered concurrently.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    root: Node,
}

impl Template {
    /// Tokenizes and parses `text`.
    pub fn compile(text: &str) -> Result<Self> {
        let tokens = tokenize(text);
        let token_count = tokens.len();
        let root = parse(tokens)?;
        if let Node::Root { children } = &root {
            debug!(
                "compiled template: {} tokens, {} top-level nodes",
                token_count,
                children.len()
            );
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The lazy fragment stream for `context`.
    pub fn emit<'a>(&'a self, context: &'a Value) -> Fragments<'a> {
        self.root.emit(Context::new(context))
    }

    /// Renders against a `Value` without converting it first.
    pub fn render_value(&self, context: &Value) -> Result<String> {
        Ok(self.root.process(Context::new(context))?)
    }

    pub fn render<T: ToValue + ?Sized>(&self, context: &T) -> Result<String> {
        self.render_value(&context.to_value())
    }

    /// Renders against any `Serialize` type, e.g. a plain struct.
    pub fn render_serialize<T: Serialize + ?Sized>(&self, context: &T) -> Result<String> {
        self.render_value(&to_value(context)?)
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Keep compiled templates keyed by their source text.
    pub cache_enabled: bool,
    /// Once this many templates are cached, new ones are compiled but not
    /// stored. The bound holds under concurrent use.
    pub max_cached_templates: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            max_cached_templates: 1024,
        }
    }
}

/// Compiles and renders templates, reusing compiled trees for repeated text.
pub struct Engine {
    options: EngineOptions,
    cache: DashMap<String, Arc<Template>>,
    // Slots taken in `cache`, reserved before an entry is inserted.
    reserved: AtomicUsize,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            options,
            cache: DashMap::new(),
            reserved: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Returns the compiled template for `text`, compiling it on a cache miss.
    pub fn template(&self, text: &str) -> Result<Arc<Template>> {
        if !self.options.cache_enabled {
            return Ok(Arc::new(Template::compile(text)?));
        }

        if let Some(entry) = self.cache.get(text) {
            debug!("template cache hit ({} bytes)", text.len());
            return Ok(Arc::clone(entry.value()));
        }

        let template = Arc::new(Template::compile(text)?);
        match self.cache.entry(text.to_string()) {
            // Another thread compiled the same text first.
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                if self.reserve_slot() {
                    entry.insert(Arc::clone(&template));
                    debug!(
                        "template cached, {} entries",
                        self.reserved.load(Ordering::Acquire)
                    );
                } else {
                    debug!(
                        "template cache full ({} entries), not caching",
                        self.options.max_cached_templates
                    );
                }
                Ok(template)
            }
        }
    }

    fn reserve_slot(&self) -> bool {
        let max = self.options.max_cached_templates;
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok()
    }

    pub fn render<T: ToValue + ?Sized>(&self, text: &str, context: &T) -> Result<String> {
        self.template(text)?.render(context)
    }

    pub fn cached_templates(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.retain(|_, _| {
            self.reserved.fetch_sub(1, Ordering::AcqRel);
            false
        });
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide engine used by [`render`].
pub fn default_engine() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(Engine::new)
}

/// Compiles `text` (cached in the default engine) and renders it against `context`.
pub fn render<T: ToValue + ?Sized>(text: &str, context: &T) -> Result<String> {
    default_engine().render(text, context)
}
