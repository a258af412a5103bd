//! Segment-trie route table with method fallback.
//!
//! # Pattern Syntax
//!
//! | Segment    | Matches                        | Captured as        |
//! |------------|--------------------------------|--------------------|
//! | `users`    | exactly `users`                | -                  |
//! | `:id`      | one segment                    | `id`               |
//! | `*`        | one segment                    | `_0`, `_1`, ...    |
//! | `**`       | the rest (zero or more)        | `_`                |
//! | `**:path`  | the rest (zero or more)        | `path`             |
//!
//! A `**` that is not the last segment matches a single segment, like `*`.
//! Query strings are ignored, and so are empty segments (`//`, trailing `/`).
//!
//! # Candidate Ordering
//!
//! [`RouteTable::lookup`] collects every pattern that matches the path and
//! orders them most-specific first, comparing segment by segment:
//! static beats `:param`/`*`, which beat `**`. Ties keep registration order.
//!
//! The first candidate is the primary match. Its exact-method value wins,
//! then its method-agnostic value. Otherwise the remaining candidates are
//! scanned in order and the first one with a usable value is taken
//! (shadow-route fallback). A path that matched but offered no usable value
//! is reported as [`Lookup::MethodNotAllowed`], listing the methods of every
//! matching pattern.

use http::Method;
use junction_core::Params;
use std::{cmp::Ordering, collections::HashMap, fmt};

/// The method half of a route key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// Any method.
    All,
    /// Exactly this method.
    Method(Method),
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        Self::Method(method)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Method(method) => f.write_str(method.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Wildcard(usize),
    CatchAll(String),
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Self::Static(_) => 0,
            Self::Param(_) | Self::Wildcard(_) => 1,
            Self::CatchAll(_) => 2,
        }
    }
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    let parts: Vec<&str> = split_path(pattern).collect();
    let last = parts.len().saturating_sub(1);
    let mut wildcards = 0;
    let mut next_wildcard = || {
        let index = wildcards;
        wildcards += 1;
        Segment::Wildcard(index)
    };

    parts
        .iter()
        .enumerate()
        .map(|(i, part)| match *part {
            "**" if i == last => Segment::CatchAll("_".to_string()),
            p if p.starts_with("**:") && i == last => Segment::CatchAll(p[3..].to_string()),
            p if p.starts_with("**") => next_wildcard(),
            "*" | ":" => next_wildcard(),
            p if p.starts_with(':') => Segment::Param(p[1..].to_string()),
            p => Segment::Static(p.to_string()),
        })
        .collect()
}

/// Split a path into its non-empty segments, ignoring the query string.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    path.split('/').filter(|s| !s.is_empty())
}

// ============================================================================
// Trie
// ============================================================================

struct Entry<V> {
    pattern: String,
    segments: Vec<Segment>,
    seq: usize,
    methods: Vec<(Method, V)>,
    all: Option<V>,
}

impl<V> Entry<V> {
    fn get(&self, method: &Method) -> Option<&V> {
        self.methods
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, v)| v)
    }

    fn get_or_all(&self, method: &Method) -> Option<&V> {
        self.get(method).or(self.all.as_ref())
    }

    fn cmp_specificity(&self, other: &Self) -> Ordering {
        let ranks = |e: &Self| e.segments.iter().map(Segment::rank).collect::<Vec<_>>();
        ranks(self)
            .cmp(&ranks(other))
            .then(self.seq.cmp(&other.seq))
    }

    fn params(&self, captures: &[&str], rest: &str) -> Params {
        let mut params = Params::new();
        let mut captures = captures.iter();
        for segment in &self.segments {
            match segment {
                Segment::Static(_) => {}
                Segment::Param(name) => {
                    if let Some(value) = captures.next() {
                        params.insert(name.as_str(), *value);
                    }
                }
                Segment::Wildcard(index) => {
                    if let Some(value) = captures.next() {
                        params.insert(format!("_{index}"), *value);
                    }
                }
                Segment::CatchAll(name) => params.insert(name.as_str(), rest),
            }
        }
        params
    }
}

struct Node<V> {
    statics: HashMap<String, Node<V>>,
    dynamic: Option<Box<Node<V>>>,
    catch_all: Vec<Entry<V>>,
    entries: Vec<Entry<V>>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self {
            statics: HashMap::new(),
            dynamic: None,
            catch_all: Vec::new(),
            entries: Vec::new(),
        }
    }
}

struct Candidate<'a, 'p, V> {
    entry: &'a Entry<V>,
    captures: Vec<&'p str>,
    rest: String,
}

impl<V> Node<V> {
    fn collect<'a, 'p>(
        &'a self,
        segments: &[&'p str],
        captures: &mut Vec<&'p str>,
        out: &mut Vec<Candidate<'a, 'p, V>>,
    ) {
        if !self.catch_all.is_empty() {
            let rest = segments.join("/");
            for entry in &self.catch_all {
                out.push(Candidate {
                    entry,
                    captures: captures.clone(),
                    rest: rest.clone(),
                });
            }
        }

        let Some((head, tail)) = segments.split_first() else {
            for entry in &self.entries {
                out.push(Candidate {
                    entry,
                    captures: captures.clone(),
                    rest: String::new(),
                });
            }
            return;
        };

        if let Some(child) = self.statics.get(*head) {
            child.collect(tail, captures, out);
        }
        if let Some(child) = &self.dynamic {
            captures.push(*head);
            child.collect(tail, captures, out);
            captures.pop();
        }
    }
}

// ============================================================================
// Table
// ============================================================================

/// The outcome of [`RouteTable::lookup`].
#[derive(Debug)]
pub enum Lookup<'a, V> {
    /// A route answered the request.
    Found(RouteMatch<'a, V>),
    /// The path matched, but no route accepts the method.
    MethodNotAllowed {
        /// Methods accepted by any pattern matching the path.
        allowed: Vec<Method>,
    },
    /// No pattern matched the path.
    NotFound,
}

/// A selected route.
#[derive(Debug)]
pub struct RouteMatch<'a, V> {
    /// The registered pattern.
    pub pattern: &'a str,
    /// The stored value.
    pub value: &'a V,
    /// Parameters captured by `pattern`.
    pub params: Params,
}

/// A route table keyed by `(method, pattern)`.
///
/// Mutated through `&mut self` during setup, shared read-only afterwards.
pub struct RouteTable<V> {
    root: Node<V>,
    size: usize,
    seq: usize,
}

impl<V> Default for RouteTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RouteTable<V> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            size: 0,
            seq: 0,
        }
    }

    /// Number of `(method, pattern)` pairs.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Register a value.
    ///
    /// Re-inserting the same `(method, pattern)` replaces the value and
    /// returns the old one.
    pub fn insert(&mut self, method: impl Into<RouteMethod>, pattern: &str, value: V) -> Option<V> {
        let segments = parse_pattern(pattern);
        let canonical = canonical_pattern(pattern);

        let mut node = &mut self.root;
        let mut terminal_is_catch_all = false;
        for segment in &segments {
            match segment {
                Segment::Static(s) => node = node.statics.entry(s.clone()).or_default(),
                Segment::Param(_) | Segment::Wildcard(_) => {
                    node = &mut **node.dynamic.get_or_insert_with(Default::default)
                }
                Segment::CatchAll(_) => terminal_is_catch_all = true,
            }
        }
        let slot = if terminal_is_catch_all {
            &mut node.catch_all
        } else {
            &mut node.entries
        };

        let index = match slot.iter().position(|e| e.pattern == canonical) {
            Some(index) => index,
            None => {
                slot.push(Entry {
                    pattern: canonical,
                    segments,
                    seq: self.seq,
                    methods: Vec::new(),
                    all: None,
                });
                self.seq += 1;
                slot.len() - 1
            }
        };
        let entry = &mut slot[index];

        let old = match method.into() {
            RouteMethod::All => entry.all.replace(value),
            RouteMethod::Method(method) => {
                match entry.methods.iter_mut().find(|(m, _)| *m == method) {
                    Some((_, existing)) => Some(std::mem::replace(existing, value)),
                    None => {
                        entry.methods.push((method, value));
                        None
                    }
                }
            }
        };
        if old.is_none() {
            self.size += 1;
        }
        old
    }

    /// Select the value answering `method` on `path`.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_, V> {
        let segments: Vec<&str> = split_path(path).collect();
        let mut candidates = Vec::new();
        self.root.collect(&segments, &mut Vec::new(), &mut candidates);
        candidates.sort_by(|a, b| a.entry.cmp_specificity(b.entry));

        if candidates.is_empty() {
            return Lookup::NotFound;
        }

        let chosen = candidates
            .iter()
            .find_map(|c| c.entry.get_or_all(method).map(|value| (c, value)));

        match chosen {
            Some((candidate, value)) => Lookup::Found(RouteMatch {
                pattern: &candidate.entry.pattern,
                value,
                params: candidate.entry.params(&candidate.captures, &candidate.rest),
            }),
            None => {
                let mut allowed: Vec<Method> = Vec::new();
                for (method, _) in candidates.iter().flat_map(|c| &c.entry.methods) {
                    if !allowed.contains(method) {
                        allowed.push(method.clone());
                    }
                }
                Lookup::MethodNotAllowed { allowed }
            }
        }
    }

    /// Every matching pattern for `path`, most specific first.
    pub fn matches(&self, path: &str) -> Vec<&str> {
        let segments: Vec<&str> = split_path(path).collect();
        let mut candidates = Vec::new();
        self.root.collect(&segments, &mut Vec::new(), &mut candidates);
        candidates.sort_by(|a, b| a.entry.cmp_specificity(b.entry));
        candidates
            .into_iter()
            .map(|c| c.entry.pattern.as_str())
            .collect()
    }
}

impl<V> fmt::Debug for RouteTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("size", &self.size)
            .finish()
    }
}

fn canonical_pattern(pattern: &str) -> String {
    let joined = split_path(pattern).collect::<Vec<_>>().join("/");
    format!("/{joined}")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn found<'a>(table: &'a RouteTable<&'static str>, method: Method, path: &str) -> (&'a str, Params) {
        match table.lookup(&method, path) {
            Lookup::Found(m) => (*m.value, m.params),
            other => panic!("expected a match for {method} {path}, got {other:?}"),
        }
    }

    #[test]
    fn test_new_table_is_empty() {
        let table: RouteTable<i32> = RouteTable::new();
        assert!(table.is_empty());
        assert!(matches!(table.lookup(&Method::GET, "/"), Lookup::NotFound));
    }

    #[test]
    fn test_static_and_param() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/hello/:name", "hello");
        table.insert(Method::GET, "/hello/world", "world");

        let (value, params) = found(&table, Method::GET, "/hello/ada");
        assert_eq!(value, "hello");
        assert_eq!(params.get("name"), Some("ada"));

        let (value, params) = found(&table, Method::GET, "/hello/world");
        assert_eq!(value, "world");
        assert!(params.is_empty());
    }

    #[test]
    fn test_query_and_slashes_ignored() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/a/b", "ab");

        assert_eq!(found(&table, Method::GET, "/a/b?x=1").0, "ab");
        assert_eq!(found(&table, Method::GET, "/a//b/").0, "ab");
        assert!(matches!(table.lookup(&Method::GET, "/a"), Lookup::NotFound));
    }

    #[test]
    fn test_unnamed_wildcards() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/files/*/v/*", "files");

        let (_, params) = found(&table, Method::GET, "/files/a/v/b");
        assert_eq!(params.get("_0"), Some("a"));
        assert_eq!(params.get("_1"), Some("b"));
    }

    #[test]
    fn test_catch_all() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/api/**", "api");
        table.insert(Method::GET, "/assets/**:file", "assets");

        let (_, params) = found(&table, Method::GET, "/api/v1/users");
        assert_eq!(params.get("_"), Some("v1/users"));

        let (_, params) = found(&table, Method::GET, "/assets/css/site.css");
        assert_eq!(params.get("file"), Some("css/site.css"));
    }

    #[test]
    fn test_catch_all_matches_zero_segments() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/api/**", "api");

        let (value, params) = found(&table, Method::GET, "/api");
        assert_eq!(value, "api");
        assert_eq!(params.get("_"), Some(""));
    }

    #[test]
    fn test_specificity_order() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/**", "root");
        table.insert(Method::GET, "/api/**", "api");
        table.insert(Method::GET, "/api/:id", "param");
        table.insert(Method::GET, "/api/users", "static");

        assert_eq!(
            table.matches("/api/users"),
            vec!["/api/users", "/api/:id", "/api/**", "/**"]
        );
        assert_eq!(found(&table, Method::GET, "/api/users").0, "static");
        assert_eq!(found(&table, Method::GET, "/api/42").0, "param");
        assert_eq!(found(&table, Method::GET, "/api/a/b").0, "api");
        assert_eq!(found(&table, Method::GET, "/other").0, "root");
    }

    #[test]
    fn test_method_then_all() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/item", "get");
        table.insert(RouteMethod::All, "/item", "all");

        assert_eq!(found(&table, Method::GET, "/item").0, "get");
        assert_eq!(found(&table, Method::DELETE, "/item").0, "all");
    }

    #[test]
    fn test_shadow_route_fallback() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/users/me", "me");
        table.insert(Method::POST, "/users/:id", "update");

        // `/users/me` is the primary match but has no POST handler.
        let (value, params) = found(&table, Method::POST, "/users/me");
        assert_eq!(value, "update");
        assert_eq!(params.get("id"), Some("me"));
    }

    #[test]
    fn test_method_not_allowed() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/only-get", "get");

        match table.lookup(&Method::POST, "/only-get") {
            Lookup::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::GET]),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn test_method_not_allowed_lists_shadow_methods() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/users/me", "me");
        table.insert(Method::POST, "/users/**", "create");
        table.insert(Method::GET, "/users/:id", "user");
        table.insert(RouteMethod::All, "/**", "fallback-all");

        match table.lookup(&Method::DELETE, "/users/me") {
            Lookup::Found(m) => assert_eq!(*m.value, "fallback-all"),
            other => panic!("unexpected lookup: {other:?}"),
        }

        let mut table = RouteTable::new();
        table.insert(Method::GET, "/users/me", "me");
        table.insert(Method::POST, "/users/**", "create");
        table.insert(Method::GET, "/users/:id", "user");
        match table.lookup(&Method::DELETE, "/users/me") {
            Lookup::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::GET, Method::POST]);
            }
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn test_lookup_outlives_path() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/docs/:page", "docs");

        let (pattern, matches) = {
            let path = format!("/docs/{}", "intro");
            let pattern = match table.lookup(&Method::GET, &path) {
                Lookup::Found(m) => m.pattern,
                other => panic!("unexpected lookup: {other:?}"),
            };
            (pattern, table.matches(&path))
        };
        assert_eq!(pattern, "/docs/:page");
        assert_eq!(matches, vec!["/docs/:page"]);
    }

    #[test]
    fn test_insert_replaces_value() {
        let mut table = RouteTable::new();
        assert_eq!(table.insert(Method::GET, "/k", 1), None);
        assert_eq!(table.insert(Method::GET, "/k/", 2), Some(1));
        assert_eq!(table.len(), 1);
        match table.lookup(&Method::GET, "/k") {
            Lookup::Found(m) => assert_eq!(*m.value, 2),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn test_params_come_from_chosen_pattern() {
        let mut table = RouteTable::new();
        table.insert(Method::GET, "/p/:a", "a");
        table.insert(Method::PUT, "/p/:b", "b");

        let (value, params) = found(&table, Method::PUT, "/p/x");
        assert_eq!(value, "b");
        assert_eq!(params.get("b"), Some("x"));
        assert_eq!(params.get("a"), None);
    }
}
