//! # TESSERA Core
//!
//! Entity-component registry for the TESSERA renderer:
//! - Entities and components stored in chunked pools that never move
//! - Groups: cached "all entities with components {A, B, ...}" results
//! - O(1) group lookup after the first query, incremental upkeep after that
//!
//! ## Architecture Rules
//!
//! 1. **Handles, not pointers** - Callers hold generational ids; stale ids fail cleanly
//! 2. **Pay for what you query** - Component events touch only groups that mention the type
//! 3. **Single owner** - The registry owns every entity, component and group
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{Component, Registry};
//!
//! struct Transform([f32; 16]);
//! impl Component for Transform {}
//!
//! struct MeshRenderer { mesh: u32, material: u32 }
//! impl Component for MeshRenderer {}
//!
//! let mut registry = Registry::new();
//! let e = registry.create_entity();
//! registry.add_component(e, Transform(IDENTITY))?;
//! registry.add_component(e, MeshRenderer { mesh: 0, material: 0 })?;
//!
//! for (entity, transform, renderer) in registry.get_entity_group::<(Transform, MeshRenderer)>().iter() {
//!     // build draw list
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use config::RegistryConfig;
pub use ecs::{
    Component, ComponentAllocator, ComponentSignature, ComponentTypeId, EntityGroup, EntityId,
    EntityMut, EntityRef, GroupId, GroupView, Query, Registry, RegistryStats, TypeRegistry,
};
pub use error::{RegistryError, RegistryResult};
pub use memory::{IndexMap, PoolHandle, StablePool};
