//! Trie-based prefix index for scoped middleware.
//!
//! Keys are matched character by character, so a key is a *literal* prefix
//! of the path it matches: `/api` matches `/api/users` and also `/apiary`.
//!
//! # Example
//!
//! ```rust
//! use junction_std::routing::PrefixTrie;
//!
//! let mut trie: PrefixTrie<&str> = PrefixTrie::new();
//! trie.insert("/api", "api");
//! trie.insert("/api/v1", "v1");
//!
//! let hits: Vec<_> = trie.prefixes_of("/api/v1/users").collect();
//! assert_eq!(hits, vec![("/api/v1".len(), &"v1"), ("/api".len(), &"api")]);
//! ```

use std::collections::HashMap;

/// A node in the trie.
#[derive(Debug)]
struct TrieNode<V> {
    children: HashMap<char, TrieNode<V>>,
    value: Option<V>,
}

impl<V> Default for TrieNode<V> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            value: None,
        }
    }
}

/// A character trie answering "which keys are prefixes of this string".
#[derive(Debug)]
pub struct PrefixTrie<V> {
    root: TrieNode<V>,
    size: usize,
}

impl<V> Default for PrefixTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PrefixTrie<V> {
    /// Create an empty trie.
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
            size: 0,
        }
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        let old = self.entry(key).replace(value);
        if old.is_none() {
            self.size += 1;
        }
        old
    }

    /// The value slot for `key`, created on demand.
    pub fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> V) -> &mut V {
        if self.entry(key).is_none() {
            self.size += 1;
        }
        self.entry(key).get_or_insert_with(default)
    }

    fn entry(&mut self, key: &str) -> &mut Option<V> {
        let mut node = &mut self.root;
        for ch in key.chars() {
            node = node.children.entry(ch).or_default();
        }
        &mut node.value
    }

    /// Look up a value by exact key.
    pub fn get(&self, key: &str) -> Option<&V> {
        let mut node = &self.root;
        for ch in key.chars() {
            node = node.children.get(&ch)?;
        }
        node.value.as_ref()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the trie is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Every key that is a prefix of `input`, longest first.
    ///
    /// Yields `(prefix_len_in_bytes, value)`.
    pub fn prefixes_of<'a>(
        &'a self,
        input: &str,
    ) -> impl Iterator<Item = (usize, &'a V)> + use<'a, V> {
        let mut hits = Vec::new();
        let mut node = &self.root;
        if let Some(value) = &node.value {
            hits.push((0, value));
        }
        for (offset, ch) in input.char_indices() {
            match node.children.get(&ch) {
                Some(child) => {
                    node = child;
                    if let Some(value) = &node.value {
                        hits.push((offset + ch.len_utf8(), value));
                    }
                }
                None => break,
            }
        }
        hits.into_iter().rev()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trie_is_empty() {
        let trie: PrefixTrie<i32> = PrefixTrie::new();
        assert!(trie.is_empty());
        assert_eq!(trie.prefixes_of("/any").count(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let mut trie = PrefixTrie::new();
        assert_eq!(trie.insert("/api", 1), None);
        assert_eq!(trie.insert("/api", 2), Some(1));
        assert_eq!(trie.get("/api"), Some(&2));
        assert_eq!(trie.get("/ap"), None);
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_prefixes_longest_first() {
        let mut trie = PrefixTrie::new();
        trie.insert("/a", "a");
        trie.insert("/a/b", "ab");
        trie.insert("/x", "x");

        let hits: Vec<_> = trie.prefixes_of("/a/b/c").map(|(_, v)| *v).collect();
        assert_eq!(hits, vec!["ab", "a"]);
    }

    #[test]
    fn test_prefix_is_literal() {
        let mut trie = PrefixTrie::new();
        trie.insert("/api", ());

        assert_eq!(trie.prefixes_of("/apiary").count(), 1);
        assert_eq!(trie.prefixes_of("/ap").count(), 0);
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut trie: PrefixTrie<Vec<i32>> = PrefixTrie::new();
        trie.get_or_insert_with("/a", Vec::new).push(1);
        trie.get_or_insert_with("/a", Vec::new).push(2);
        assert_eq!(trie.get("/a"), Some(&vec![1, 2]));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_unicode_keys() {
        let mut trie = PrefixTrie::new();
        trie.insert("/caf\u{e9}", 1);

        let hits: Vec<_> = trie.prefixes_of("/caf\u{e9}/menu").collect();
        assert_eq!(hits, vec![("/caf\u{e9}".len(), &1)]);
    }
}
