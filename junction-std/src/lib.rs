//! # junction-std
//!
//! Standard implementations for the Junction HTTP dispatch framework.
//!
//! This crate provides:
//! - **Routing**: [`RouteTable`](routing::RouteTable), [`PrefixTrie`](routing::PrefixTrie)
//! - **Middleware**: [`MiddlewareRegistry`](middleware::MiddlewareRegistry)
//! - **Responses**: [`Normalizer`](normalize::Normalizer) and the [`errors`] pipeline
//! - **Transports**: node, web and plain [`adapters`]
//! - **Standard handlers**: Lazy, Traced, RequestLogger
//! - **Testing helpers**: [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use junction_core;

// Modules
pub mod adapters;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod normalize;
pub mod routing;
pub mod testing;
