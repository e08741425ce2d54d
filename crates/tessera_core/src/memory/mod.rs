//! # Memory Management
//!
//! Pools and maps the registry is built on.
//!
//! ## Design Philosophy
//!
//! - Objects never move while they are alive
//! - Every allocate/free/lookup is O(1)
//! - Stale handles are detected through generations, never dereferenced

mod index_map;
mod pool;

pub use index_map::{mix64, IndexMap, KeyHasher};
pub use pool::{PoolHandle, StablePool};
