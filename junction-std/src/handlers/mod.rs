//! Standard handler wrappers.
//!
//! - [`LazyHandler`]: resolves its handler on first use and caches it.
//! - [`Traced`]: runs a handler inside a `tracing` span.
//! - [`RequestLogger`]: pass-through middleware logging every request.

mod lazy;
mod logging;
mod tracing;

pub use self::tracing::Traced;
pub use lazy::LazyHandler;
pub use logging::RequestLogger;
