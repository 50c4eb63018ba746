//! Freshness policy for files kept in the local cache.
//!
//! A cached file is fresh while `now - mtime <= ttl`. Missing files always
//! need a fetch; a file whose metadata cannot be read is an error rather
//! than a guess either way.

pub mod freshness;

pub use freshness::{
    cache_age, cache_age_at, needs_refresh, needs_refresh_at, CacheAge, DEFAULT_CATALOG_TTL,
};
