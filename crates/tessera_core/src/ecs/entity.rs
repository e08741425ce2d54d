//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - A slot index into the registry's entity pool
//! - A generation counter for detecting stale references
//!
//! The per-entity bookkeeping (dense offset, component map) lives in an
//! [`EntityRecord`] owned by the registry. Callers see entities through
//! [`EntityRef`] and [`EntityMut`] views.

use std::fmt;

use super::component::{Component, ComponentTypeId};
use super::registry::Registry;
use crate::error::RegistryResult;
use crate::memory::{IndexMap, PoolHandle};

/// Unique identifier for an entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Slot index in the entity pool
/// - Upper 32 bits: Generation counter for detecting stale references
///
/// A slot's generation is bumped when its entity is deleted, so an id is
/// never handed out twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the packed 64-bit representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }

    #[inline]
    pub(crate) const fn from_handle(handle: PoolHandle) -> Self {
        Self::new(handle.index(), handle.generation())
    }

    #[inline]
    pub(crate) const fn handle(self) -> PoolHandle {
        PoolHandle::new(self.index(), self.generation())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Registry-side state of a live entity.
#[derive(Debug)]
pub(crate) struct EntityRecord {
    /// The entity's own id.
    id: EntityId,
    /// Index in the registry's dense entity array.
    offset: usize,
    /// Component type -> handle into that type's pool.
    components: IndexMap<PoolHandle>,
}

impl EntityRecord {
    pub(crate) fn new(id: EntityId, offset: usize) -> Self {
        Self {
            id,
            offset,
            components: IndexMap::new(),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub(crate) fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    #[inline]
    pub(crate) fn has(&self, component: ComponentTypeId) -> bool {
        self.components.contains_key(component.key())
    }

    #[inline]
    pub(crate) fn handle(&self, component: ComponentTypeId) -> Option<PoolHandle> {
        self.components.get(component.key()).copied()
    }

    pub(crate) fn insert(&mut self, component: ComponentTypeId, handle: PoolHandle) {
        let previous = self.components.insert(component.key(), handle);
        debug_assert!(previous.is_none(), "Component inserted twice");
    }

    pub(crate) fn remove(&mut self, component: ComponentTypeId) -> Option<PoolHandle> {
        self.components.remove(component.key())
    }

    /// The most recently attached component type still on the entity.
    pub(crate) fn last_component(&self) -> Option<ComponentTypeId> {
        self.components
            .last()
            .map(|(key, _)| ComponentTypeId::new(key as u32))
    }

    pub(crate) fn component_types(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.components
            .keys()
            .map(|key| ComponentTypeId::new(key as u32))
    }

    #[inline]
    pub(crate) fn component_count(&self) -> usize {
        self.components.len()
    }
}

/// Read-only view of a live entity.
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    registry: &'a Registry,
    record: &'a EntityRecord,
}

impl<'a> EntityRef<'a> {
    pub(crate) fn new(registry: &'a Registry, record: &'a EntityRecord) -> Self {
        Self { registry, record }
    }

    /// Returns the entity's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.record.id()
    }

    /// Returns the entity's index in the registry's dense entity array.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.record.offset()
    }

    /// Checks if the entity has a component of type `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        self.registry.has_component::<T>(self.id())
    }

    /// Gets the entity's `T` component, or None if absent.
    #[must_use]
    pub fn get_component<T: Component>(&self) -> Option<&'a T> {
        self.registry.get_component::<T>(self.id())
    }

    /// Returns the number of components attached.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.record.component_count()
    }

    /// Iterates over the component types attached, most recent last.
    pub fn component_types(&self) -> impl Iterator<Item = ComponentTypeId> + 'a {
        self.record.component_types()
    }
}

/// Mutable view of a live entity.
///
/// Holds the registry mutably, so the entity stays alive while the view does.
pub struct EntityMut<'a> {
    registry: &'a mut Registry,
    id: EntityId,
}

impl<'a> EntityMut<'a> {
    pub(crate) fn new(registry: &'a mut Registry, id: EntityId) -> Self {
        Self { registry, id }
    }

    /// Returns the entity's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Checks if the entity has a component of type `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        self.registry.has_component::<T>(self.id)
    }

    /// Gets the entity's `T` component, or None if absent.
    #[must_use]
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.registry.get_component::<T>(self.id)
    }

    /// Gets the entity's `T` component mutably, or None if absent.
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.registry.get_component_mut::<T>(self.id)
    }

    /// Attaches `value`. See [`Registry::add_component`].
    ///
    /// # Errors
    ///
    /// Fails if the entity already has a `T`.
    pub fn add_component<T: Component>(&mut self, value: T) -> RegistryResult<&mut T> {
        self.registry.add_component(self.id, value)
    }

    /// Attaches `value`, replacing an existing `T` in place. See
    /// [`Registry::reset_component`].
    ///
    /// # Errors
    ///
    /// Only fails if the entity is stale, which a live view rules out.
    pub fn reset_component<T: Component>(&mut self, value: T) -> RegistryResult<&mut T> {
        self.registry.reset_component(self.id, value)
    }

    /// Detaches and returns the entity's `T`. See [`Registry::remove_component`].
    ///
    /// # Errors
    ///
    /// Fails if the entity has no `T`.
    pub fn remove_component<T: Component>(&mut self) -> RegistryResult<T> {
        self.registry.remove_component::<T>(self.id)
    }

    /// Returns the number of components attached.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.registry
            .entity(self.id)
            .map_or(0, |entity| entity.component_count())
    }
}
