//! Middleware registry.
//!
//! Middleware are [`Layer`]s: a handler plus an optional path prefix and an
//! optional matcher predicate. Layers without a prefix (or with `""` / `"/"`)
//! are *global* and run for every request in registration order. Layers with
//! a prefix are *scoped* and are kept in a [`PrefixTrie`].
//!
//! # Scoped Matching
//!
//! A scoped layer applies when its prefix is a literal prefix of the request
//! pathname. Scoped layers are yielded longest prefix first; layers sharing a
//! prefix keep registration order. Each comes with the *relative* path it
//! should see: the request path with the prefix stripped, or `"/"` when
//! nothing remains.

use crate::routing::PrefixTrie;
use junction_core::{BoxHandler, Event, Handler};
use std::{fmt, sync::Arc};

/// A predicate deciding whether a layer applies.
///
/// Receives the path the layer would see and the event.
pub type Matcher = Arc<dyn Fn(&str, &Event) -> bool + Send + Sync>;

/// Per-layer registration options.
#[derive(Clone, Default)]
pub struct LayerOptions {
    matcher: Option<Matcher>,
}

impl LayerOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only run the layer when `matcher` returns `true`.
    pub fn with_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&str, &Event) -> bool + Send + Sync + 'static,
    {
        self.matcher = Some(Arc::new(matcher));
        self
    }
}

impl fmt::Debug for LayerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerOptions")
            .field("matcher", &self.matcher.is_some())
            .finish()
    }
}

/// A registered middleware.
#[derive(Clone)]
pub struct Layer {
    prefix: Option<String>,
    matcher: Option<Matcher>,
    handler: BoxHandler,
}

impl Layer {
    /// The scoping prefix, `None` for global layers.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The handler.
    pub fn handler(&self) -> &BoxHandler {
        &self.handler
    }

    /// Whether the layer applies to `path` on `event`.
    pub fn matches(&self, path: &str, event: &Event) -> bool {
        self.matcher.as_ref().is_none_or(|m| m(path, event))
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("prefix", &self.prefix)
            .field("matcher", &self.matcher.is_some())
            .finish()
    }
}

/// A middleware registration descriptor.
///
/// ```rust
/// use junction_core::Event;
/// use junction_std::middleware::{LayerOptions, LayerSpec};
///
/// let spec = LayerSpec::scoped("/api", |_event: Event| async {})
///     .with_options(LayerOptions::new().with_matcher(|path, _| path != "/health"));
/// assert_eq!(spec.prefix(), Some("/api"));
/// ```
#[derive(Debug, Clone)]
pub struct LayerSpec {
    prefix: Option<String>,
    handler: BoxHandler,
    options: LayerOptions,
}

impl LayerSpec {
    /// A global layer.
    pub fn global<H: Handler>(handler: H) -> Self {
        Self {
            prefix: None,
            handler: BoxHandler::new(handler),
            options: LayerOptions::default(),
        }
    }

    /// A layer scoped to `prefix`.
    pub fn scoped<H: Handler>(prefix: impl Into<String>, handler: H) -> Self {
        Self {
            prefix: Some(prefix.into()),
            handler: BoxHandler::new(handler),
            options: LayerOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: LayerOptions) -> Self {
        self.options = options;
        self
    }

    /// The prefix as given.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

/// Ordered global layers plus a prefix index of scoped layers.
#[derive(Default)]
pub struct MiddlewareRegistry {
    global: Vec<Layer>,
    scoped: PrefixTrie<Vec<Layer>>,
    len: usize,
}

impl MiddlewareRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer.
    pub fn add(&mut self, spec: LayerSpec) {
        let prefix = spec
            .prefix
            .as_deref()
            .map(normalize_prefix)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let layer = Layer {
            prefix: prefix.clone(),
            matcher: spec.options.matcher,
            handler: spec.handler,
        };
        match prefix {
            Some(prefix) => self.scoped.get_or_insert_with(&prefix, Vec::new).push(layer),
            None => self.global.push(layer),
        }
        self.len += 1;
    }

    /// Global layers, in registration order.
    pub fn global(&self) -> &[Layer] {
        &self.global
    }

    /// Scoped layers applying to `path`, each with the relative path it sees.
    ///
    /// `path` is the request target; matching uses its pathname.
    pub fn scoped(&self, path: &str) -> Vec<(String, &Layer)> {
        let pathname = path.split_once('?').map_or(path, |(p, _)| p);
        self.scoped
            .prefixes_of(pathname)
            .flat_map(|(len, layers)| {
                let relative = relative_path(&path[len..]);
                layers.iter().map(move |layer| (relative.clone(), layer))
            })
            .collect()
    }

    /// Total number of layers.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no layer is registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("global", &self.global.len())
            .field("scoped", &(self.len - self.global.len()))
            .finish()
    }
}

fn normalize_prefix(prefix: &str) -> &str {
    prefix.trim_end_matches('/')
}

fn relative_path(rest: &str) -> String {
    if rest.is_empty() {
        "/".to_string()
    } else if rest.starts_with('?') {
        format!("/{rest}")
    } else {
        rest.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::plain_event;

    fn noop() -> impl Handler {
        |_event: Event| async {}
    }

    fn prefixes(registry: &MiddlewareRegistry, path: &str) -> Vec<(String, String)> {
        registry
            .scoped(path)
            .into_iter()
            .map(|(rel, layer)| (layer.prefix().unwrap_or_default().to_string(), rel))
            .collect()
    }

    #[test]
    fn test_root_prefix_is_global() {
        let mut registry = MiddlewareRegistry::new();
        registry.add(LayerSpec::global(noop()));
        registry.add(LayerSpec::scoped("", noop()));
        registry.add(LayerSpec::scoped("/", noop()));

        assert_eq!(registry.global().len(), 3);
        assert!(registry.scoped("/anything").is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_relative_paths() {
        let mut registry = MiddlewareRegistry::new();
        registry.add(LayerSpec::scoped("/api", noop()));

        assert_eq!(
            prefixes(&registry, "/api/users?x=1"),
            vec![("/api".to_string(), "/users?x=1".to_string())]
        );
        assert_eq!(
            prefixes(&registry, "/api"),
            vec![("/api".to_string(), "/".to_string())]
        );
        assert_eq!(
            prefixes(&registry, "/api?x=1"),
            vec![("/api".to_string(), "/?x=1".to_string())]
        );
    }

    #[test]
    fn test_longest_prefix_first_then_registration_order() {
        let mut registry = MiddlewareRegistry::new();
        registry.add(LayerSpec::scoped("/a", noop()));
        registry.add(LayerSpec::scoped("/a/b/", noop()));
        registry.add(LayerSpec::scoped("/a", noop()));

        let seen: Vec<_> = prefixes(&registry, "/a/b/c")
            .into_iter()
            .map(|(prefix, _)| prefix)
            .collect();
        assert_eq!(seen, vec!["/a/b", "/a", "/a"]);
    }

    #[test]
    fn test_prefix_match_is_literal() {
        let mut registry = MiddlewareRegistry::new();
        registry.add(LayerSpec::scoped("/api", noop()));

        assert_eq!(prefixes(&registry, "/apiary").len(), 1);
        assert!(prefixes(&registry, "/other").is_empty());
    }

    #[test]
    fn test_matcher_filters_layer() {
        let mut registry = MiddlewareRegistry::new();
        registry.add(
            LayerSpec::scoped("/api", noop())
                .with_options(LayerOptions::new().with_matcher(|path, _| path != "/health")),
        );

        let event = plain_event("GET", "/api/health");
        let (relative, layer) = registry.scoped(event.path()).remove(0);
        assert_eq!(relative, "/health");
        assert!(!layer.matches(&relative, &event));
        assert!(layer.matches("/users", &event));
    }
}
