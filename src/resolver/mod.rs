//! Resolver module
//!
//! The fallback read path: live value from the store, else a cached value
//! no older than the TTL, else a typed [`Unavailable`].

mod fallback;

pub use fallback::{
    FallbackResolver, Outcome, Resolved, ResolverConfig, Source, Unavailable, DEFAULT_CACHE_TTL,
};
