//! # Routing Implementations
//!
//! - [`RouteTable`]: `(method, pattern)` routes over a segment trie, with
//!   params, wildcards and shadow-route method fallback.
//! - [`PrefixTrie`]: a character trie answering "which registered prefixes
//!   does this path start with", used by the scoped middleware registry.

mod prefix;
mod table;

pub use prefix::PrefixTrie;
pub use table::{Lookup, RouteMatch, RouteMethod, RouteTable};
