//! # Entity Component Registry
//!
//! Entities, components and cached groups.
//!
//! ## Design Philosophy
//!
//! - Entities are generational handles; stale ids are rejected, not dereferenced
//! - Components live in one stable pool per type
//! - Groups are built lazily on first query and maintained incrementally
//! - Component events reach only the groups that mention the changed type

mod allocator;
mod component;
mod entity;
mod group;
mod query;
mod registry;

pub use allocator::ComponentAllocator;
pub use component::{Component, ComponentSignature, ComponentTypeId, TypeRegistry};
pub use entity::{EntityId, EntityMut, EntityRef};
pub use group::{EntityGroup, GroupId};
pub use query::{Column, GroupView, Query};
pub use registry::{Registry, RegistryStats};
