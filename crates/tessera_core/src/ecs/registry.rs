//! # Entity Registry
//!
//! The central container for all entities, components and groups.
//!
//! ## Event Routing
//!
//! ```text
//! add_component::<Mesh>(e)
//!   -> dependents[Mesh] = [group#0 {Transform, Mesh}, group#3 {Mesh}]
//!   -> group#0.add_entity(e)   (admits only if e also has Transform)
//!   -> group#3.add_entity(e)
//! ```
//!
//! Component add/remove cost is proportional to the number of groups that
//! mention the component type, not to the total number of groups.

use tracing::{debug, trace};

use super::allocator::{ComponentAllocator, ErasedAllocator};
use super::component::{Component, ComponentSignature, ComponentTypeId, TypeRegistry};
use super::entity::{EntityId, EntityMut, EntityRecord, EntityRef};
use super::group::{EntityGroup, GroupId};
use super::query::{GroupView, Query};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::memory::{IndexMap, PoolHandle, StablePool};

/// What to do when the entity already has a component of the added type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OnDuplicate {
    /// Fail with [`RegistryError::ComponentAlreadyPresent`].
    Reject,
    /// Replace the value in place; the slot and all group rows stay valid.
    Reset,
}

/// Snapshot of registry occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Live entities.
    pub entities: usize,
    /// Registered component types.
    pub component_types: usize,
    /// Live components across all types.
    pub components: usize,
    /// Sum of component pool high-water marks.
    pub component_high_water_mark: usize,
    /// Materialized groups.
    pub groups: usize,
    /// Sum of group sizes.
    pub group_members: usize,
}

/// The entity-component registry.
///
/// Owns every entity, component and group. Callers hold [`EntityId`]
/// handles and borrowed views; stale handles are rejected, never
/// dereferenced.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = Registry::new();
///
/// let e = registry.create_entity();
/// registry.add_component(e, Transform::default())?;
/// registry.add_component(e, Mesh::cube())?;
///
/// for (entity, transform, mesh) in registry.get_entity_group::<(Transform, Mesh)>().iter() {
///     draw_list.push(entity, transform, mesh);
/// }
/// ```
pub struct Registry {
    /// Pool sizing.
    config: RegistryConfig,
    /// Component type ids.
    types: TypeRegistry,
    /// Entity records, addressed by `EntityId`.
    records: StablePool<EntityRecord>,
    /// Live entities, densely packed. `records[e].offset` is `e`'s index here.
    entities: Vec<EntityId>,
    /// One allocator per component type, keyed by type id.
    allocators: IndexMap<Box<dyn ErasedAllocator>>,
    /// Materialized groups, indexed by `GroupId`.
    groups: Vec<EntityGroup>,
    /// Signature key -> groups with that key.
    group_cache: IndexMap<Vec<GroupId>>,
    /// Component type -> groups whose signature includes it.
    dependents: IndexMap<Vec<GroupId>>,
}

impl Registry {
    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(RegistryConfig::default())
    }

    /// Creates an empty registry with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidConfig`] if the config fails validation.
    pub fn with_config(config: RegistryConfig) -> RegistryResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RegistryConfig) -> Self {
        Self {
            types: TypeRegistry::new(),
            records: StablePool::with_capacity(
                config.entity_chunk_size,
                config.initial_entity_capacity,
            ),
            entities: Vec::with_capacity(config.initial_entity_capacity),
            allocators: IndexMap::new(),
            groups: Vec::new(),
            group_cache: IndexMap::new(),
            dependents: IndexMap::new(),
            config,
        }
    }

    /// Returns the configuration the registry was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Returns the number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if there are no live entities.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns every live entity, densely packed.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.records.contains(id.handle())
    }

    /// Creates an entity with no components.
    ///
    /// The id is never reused after deletion.
    pub fn create_entity(&mut self) -> EntityId {
        let offset = self.entities.len();
        let handle = self
            .records
            .allocate_with(|handle| EntityRecord::new(EntityId::from_handle(handle), offset));

        let id = EntityId::from_handle(handle);
        self.entities.push(id);

        trace!(entity = %id, "created entity");
        id
    }

    /// Deletes an entity and every component attached to it.
    ///
    /// The entity leaves every group it was a member of before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::StaleEntity`] if the entity is not alive.
    pub fn delete_entity(&mut self, id: EntityId) -> RegistryResult<()> {
        let handle = id.handle();
        loop {
            let record = self.records.get(handle).ok_or(RegistryError::StaleEntity(id))?;
            let Some(component) = record.last_component() else {
                break;
            };
            self.unregister(id, component)?;
        }

        let record = self.records.free(handle).ok_or(RegistryError::StaleEntity(id))?;
        let offset = record.offset();
        debug_assert_eq!(self.entities.get(offset), Some(&id));

        self.entities.swap_remove(offset);
        if let Some(&moved) = self.entities.get(offset) {
            if let Some(moved_record) = self.records.get_mut(moved.handle()) {
                moved_record.set_offset(offset);
            }
        }

        trace!(entity = %id, "deleted entity");
        Ok(())
    }

    /// Returns a read-only view of a live entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<EntityRef<'_>> {
        let record = self.records.get(id.handle())?;
        Some(EntityRef::new(self, record))
    }

    /// Returns a mutable view of a live entity.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<EntityMut<'_>> {
        if !self.is_alive(id) {
            return None;
        }
        Some(EntityMut::new(self, id))
    }

    // =========================================================================
    // Component types
    // =========================================================================

    /// Assigns `T` its component type id ahead of first use.
    ///
    /// Registration is optional; types are registered on first use anyway.
    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        self.types.register::<T>()
    }

    /// Returns the id of `T` if it has been registered.
    #[inline]
    #[must_use]
    pub fn component_type_id<T: Component>(&self) -> Option<ComponentTypeId> {
        self.types.get::<T>()
    }

    /// Returns the name a component type was registered with.
    #[must_use]
    pub fn component_name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.types.name(id)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Checks if an entity has a component of type `T`.
    ///
    /// Returns `false` for stale entities.
    #[must_use]
    pub fn has_component<T: Component>(&self, id: EntityId) -> bool {
        let Some(component) = self.types.get::<T>() else {
            return false;
        };
        self.records
            .get(id.handle())
            .is_some_and(|record| record.has(component))
    }

    /// Gets an entity's `T` component, or None if absent or the entity is stale.
    #[must_use]
    pub fn get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        let component = self.types.get::<T>()?;
        let handle = self.records.get(id.handle())?.handle(component)?;
        self.allocator::<T>()?.get(handle)
    }

    /// Gets an entity's `T` component mutably.
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        let component = self.types.get::<T>()?;
        let handle = self.records.get(id.handle())?.handle(component)?;
        self.allocator_mut::<T>()?.get_mut(handle)
    }

    /// Attaches `value` to an entity.
    ///
    /// Every group that requires `T` re-checks the entity within this call;
    /// a group admits it only once all of its required types are present.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::StaleEntity`] if the entity is not alive.
    /// - [`RegistryError::ComponentAlreadyPresent`] if it already has a `T`.
    pub fn add_component<T: Component>(&mut self, id: EntityId, value: T) -> RegistryResult<&mut T> {
        self.register(id, value, OnDuplicate::Reject)
    }

    /// Attaches `value` to an entity, replacing an existing `T` in place.
    ///
    /// A replaced component keeps its storage slot, so group membership and
    /// rows are untouched. A new component is attached as by
    /// [`Registry::add_component`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::StaleEntity`] if the entity is not alive.
    pub fn reset_component<T: Component>(&mut self, id: EntityId, value: T) -> RegistryResult<&mut T> {
        self.register(id, value, OnDuplicate::Reset)
    }

    /// Detaches and returns an entity's `T` component.
    ///
    /// The entity leaves every group requiring `T` within this call.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::StaleEntity`] if the entity is not alive.
    /// - [`RegistryError::ComponentNotFound`] if it has no `T`.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> RegistryResult<T> {
        let not_found = RegistryError::ComponentNotFound {
            entity: id,
            component: T::name(),
        };

        let Some(component) = self.types.get::<T>() else {
            return Err(if self.is_alive(id) {
                not_found
            } else {
                RegistryError::StaleEntity(id)
            });
        };

        let handle = self.detach(id, component)?;
        self.allocator_mut::<T>()
            .and_then(|allocator| allocator.free(handle))
            .ok_or(not_found)
    }

    fn register<T: Component>(
        &mut self,
        id: EntityId,
        value: T,
        on_duplicate: OnDuplicate,
    ) -> RegistryResult<&mut T> {
        let component = self.types.register::<T>();
        let existing = self
            .records
            .get(id.handle())
            .ok_or(RegistryError::StaleEntity(id))?
            .handle(component);

        let chunk_size = self.config.component_chunk_size;
        let allocator = self
            .allocators
            .get_or_insert_with(component.key(), || {
                debug!(component = T::name(), id = %component, "created component allocator");
                let allocator: Box<dyn ErasedAllocator> =
                    Box::new(ComponentAllocator::<T>::new(component, chunk_size));
                allocator
            })
            .as_any_mut()
            .downcast_mut::<ComponentAllocator<T>>();

        let not_found = RegistryError::ComponentNotFound {
            entity: id,
            component: T::name(),
        };
        let Some(allocator) = allocator else {
            return Err(not_found);
        };

        let handle = match (existing, on_duplicate) {
            (Some(_), OnDuplicate::Reject) => {
                return Err(RegistryError::ComponentAlreadyPresent {
                    entity: id,
                    component: T::name(),
                });
            }
            (Some(handle), OnDuplicate::Reset) => {
                allocator.replace(handle, value);
                handle
            }
            (None, _) => {
                let handle = allocator.allocate(id, value);
                let record = self
                    .records
                    .get_mut(id.handle())
                    .ok_or(RegistryError::StaleEntity(id))?;
                record.insert(component, handle);

                if let Some(groups) = self.dependents.get(component.key()) {
                    for group in groups {
                        self.groups[group.index() as usize].add_entity(record);
                    }
                }
                handle
            }
        };

        allocator.get_mut(handle).ok_or(not_found)
    }

    /// Detaches a component of any type and frees it.
    fn unregister(&mut self, id: EntityId, component: ComponentTypeId) -> RegistryResult<()> {
        let handle = self.detach(id, component)?;

        if let Some(allocator) = self.allocators.get_mut(component.key()) {
            debug_assert_eq!(allocator.component_type(), component);
            debug_assert_eq!(allocator.owner_of(handle), Some(id));
            allocator.release(handle);
        }
        Ok(())
    }

    /// Evicts the entity from every group requiring `component` and erases
    /// the component from the entity's map.
    ///
    /// # Returns
    ///
    /// The component's pool handle, still allocated.
    fn detach(&mut self, id: EntityId, component: ComponentTypeId) -> RegistryResult<PoolHandle> {
        let record = self
            .records
            .get_mut(id.handle())
            .ok_or(RegistryError::StaleEntity(id))?;

        let handle = record
            .remove(component)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                entity: id,
                component: self.types.name(component).unwrap_or("<unregistered>"),
            })?;

        if let Some(groups) = self.dependents.get(component.key()) {
            for group in groups {
                self.groups[group.index() as usize].remove_entity(id);
            }
        }

        Ok(handle)
    }

    pub(crate) fn allocator<T: Component>(&self) -> Option<&ComponentAllocator<T>> {
        let component = self.types.get::<T>()?;
        self.allocators
            .get(component.key())?
            .as_any()
            .downcast_ref::<ComponentAllocator<T>>()
    }

    fn allocator_mut<T: Component>(&mut self) -> Option<&mut ComponentAllocator<T>> {
        let component = self.types.get::<T>()?;
        self.allocators
            .get_mut(component.key())?
            .as_any_mut()
            .downcast_mut::<ComponentAllocator<T>>()
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Returns the group of entities having every component in `Q`.
    ///
    /// The first call for a given component set builds the group with one
    /// scan over the live entities; later calls (in any tuple order) return
    /// the cached group in O(1). The group stays current as components are
    /// added and removed.
    pub fn get_entity_group<Q: Query>(&mut self) -> GroupView<'_, Q> {
        let id = self.group_id::<Q>();
        let this: &Self = self;
        GroupView::new(this, &this.groups[id.index() as usize])
    }

    /// Builds the group for `Q` if needed and returns its id.
    pub fn group_id<Q: Query>(&mut self) -> GroupId {
        let signature = Q::signature(&mut self.types);

        if let Some(candidates) = self.group_cache.get(signature.key()) {
            for &id in candidates {
                if self.groups[id.index() as usize].signature() == &signature {
                    return id;
                }
            }
        }

        self.materialize(signature)
    }

    /// Returns a group by id.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&EntityGroup> {
        self.groups.get(id.index() as usize)
    }

    /// Returns the typed view of an already-built group.
    ///
    /// Returns None if `id` is unknown or was built for a different
    /// component set than `Q`.
    #[must_use]
    pub fn group_view<Q: Query>(&self, id: GroupId) -> Option<GroupView<'_, Q>> {
        let signature = Q::lookup_signature(&self.types)?;
        let group = self.group(id)?;
        (group.signature() == &signature).then(|| GroupView::new(self, group))
    }

    /// Returns the group for `Q` if it has already been built.
    ///
    /// Unlike [`Registry::get_entity_group`] this never builds a group, so it
    /// only needs a shared borrow.
    #[must_use]
    pub fn find_entity_group<Q: Query>(&self) -> Option<GroupView<'_, Q>> {
        let signature = Q::lookup_signature(&self.types)?;
        let candidates = self.group_cache.get(signature.key())?;
        candidates
            .iter()
            .map(|id| &self.groups[id.index() as usize])
            .find(|group| group.signature() == &signature)
            .map(|group| GroupView::new(self, group))
    }

    /// Returns the number of materialized groups.
    #[inline]
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Iterates over every materialized group.
    pub fn groups(&self) -> impl Iterator<Item = &EntityGroup> {
        self.groups.iter()
    }

    fn materialize(&mut self, signature: ComponentSignature) -> GroupId {
        let id = GroupId::new(self.groups.len() as u32);

        for &component in signature.types() {
            self.dependents
                .get_or_insert_with(component.key(), Vec::new)
                .push(id);
        }
        self.group_cache
            .get_or_insert_with(signature.key(), Vec::new)
            .push(id);

        let mut group = EntityGroup::new(id, signature);
        for &entity in &self.entities {
            if let Some(record) = self.records.get(entity.handle()) {
                group.add_entity(record);
            }
        }

        debug!(
            group = %id,
            signature = %group.signature(),
            members = group.len(),
            "materialized entity group"
        );
        self.groups.push(group);
        id
    }

    // =========================================================================
    // Teardown and diagnostics
    // =========================================================================

    /// Deletes every entity and component.
    ///
    /// Component type ids, allocators and group definitions survive; groups
    /// are emptied and refill as new entities qualify.
    pub fn clear(&mut self) {
        for group in &mut self.groups {
            group.reset();
        }
        for allocator in self.allocators.values_mut() {
            allocator.clear();
        }
        self.records.clear();
        self.entities.clear();

        debug!(groups = self.groups.len(), "cleared registry");
    }

    /// Returns a snapshot of registry occupancy.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            entities: self.entities.len(),
            component_types: self.types.len(),
            components: self.allocators.values().map(|a| a.live_count()).sum(),
            component_high_water_mark: self.allocators.values().map(|a| a.peak_count()).sum(),
            groups: self.groups.len(),
            group_members: self.groups.iter().map(EntityGroup::len).sum(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
