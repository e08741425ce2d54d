//! # Component Allocators
//!
//! One [`StablePool`] per component type. The registry keeps them behind the
//! type-erased [`ErasedAllocator`] so it can free components of any type when
//! an entity is deleted.

use std::any::Any;

use super::component::{Component, ComponentTypeId};
use super::entity::EntityId;
use crate::memory::{PoolHandle, StablePool};

/// A component value together with the entity that owns it.
struct Owned<T> {
    owner: EntityId,
    value: T,
}

/// Pool-backed storage for every component of type `T`.
pub struct ComponentAllocator<T: Component> {
    /// Id of `T` in the owning registry.
    type_id: ComponentTypeId,
    /// The backing pool.
    pool: StablePool<Owned<T>>,
}

impl<T: Component> ComponentAllocator<T> {
    /// Creates an empty allocator for `T`.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero or not a power of two.
    #[must_use]
    pub fn new(type_id: ComponentTypeId, chunk_size: usize) -> Self {
        Self {
            type_id,
            pool: StablePool::new(chunk_size),
        }
    }

    /// Returns the id of `T` in the owning registry.
    #[inline]
    #[must_use]
    pub fn component_type(&self) -> ComponentTypeId {
        self.type_id
    }

    /// Stores a component owned by `owner`.
    pub fn allocate(&mut self, owner: EntityId, value: T) -> PoolHandle {
        self.pool.allocate(Owned { owner, value })
    }

    /// Replaces the component behind `handle` in place, keeping its owner.
    ///
    /// # Returns
    ///
    /// The previous value, or None if the handle was stale.
    pub fn replace(&mut self, handle: PoolHandle, value: T) -> Option<T> {
        let owner = self.owner(handle)?;
        self.pool
            .replace(handle, Owned { owner, value })
            .map(|previous| previous.value)
    }

    /// Frees the component behind `handle`.
    pub fn free(&mut self, handle: PoolHandle) -> Option<T> {
        self.pool.free(handle).map(|owned| owned.value)
    }

    /// Gets a component.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.pool.get(handle).map(|owned| &owned.value)
    }

    /// Gets a component mutably.
    #[inline]
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.pool.get_mut(handle).map(|owned| &mut owned.value)
    }

    /// Returns the entity owning the component behind `handle`.
    #[inline]
    #[must_use]
    pub fn owner(&self, handle: PoolHandle) -> Option<EntityId> {
        self.pool.get(handle).map(|owned| owned.owner)
    }

    /// Returns the number of live components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns `true` if no component is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Returns the pool's high-water mark.
    #[inline]
    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.pool.high_water_mark()
    }

    /// Iterates over `(owner, component)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.pool.iter().map(|(_, owned)| (owned.owner, &owned.value))
    }
}

/// Type-erased view of a [`ComponentAllocator`].
pub(crate) trait ErasedAllocator: Any + Send + Sync {
    /// Id of the stored component type.
    fn component_type(&self) -> ComponentTypeId;

    /// Frees the component behind `handle`, dropping it.
    fn release(&mut self, handle: PoolHandle) -> bool;

    /// Returns the owner of the component behind `handle`.
    fn owner_of(&self, handle: PoolHandle) -> Option<EntityId>;

    fn live_count(&self) -> usize;

    fn peak_count(&self) -> usize;

    /// Frees every component.
    fn clear(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedAllocator for ComponentAllocator<T> {
    fn component_type(&self) -> ComponentTypeId {
        self.type_id
    }

    fn release(&mut self, handle: PoolHandle) -> bool {
        self.pool.free(handle).is_some()
    }

    fn owner_of(&self, handle: PoolHandle) -> Option<EntityId> {
        self.owner(handle)
    }

    fn live_count(&self) -> usize {
        self.pool.len()
    }

    fn peak_count(&self) -> usize {
        self.pool.high_water_mark()
    }

    fn clear(&mut self) {
        self.pool.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[test]
    fn test_allocate_tracks_owner() {
        let mut allocator = ComponentAllocator::<Health>::new(ComponentTypeId::new(0), 16);
        let owner = EntityId::new(3, 1);

        let handle = allocator.allocate(owner, Health(100));
        assert_eq!(allocator.owner(handle), Some(owner));
        assert_eq!(allocator.get(handle), Some(&Health(100)));
        assert_eq!(allocator.iter().collect::<Vec<_>>(), vec![(owner, &Health(100))]);

        allocator.get_mut(handle).unwrap().0 -= 10;
        let address = allocator.get(handle).unwrap() as *const Health;
        assert_eq!(allocator.replace(handle, Health(50)), Some(Health(90)));
        assert_eq!(allocator.owner(handle), Some(owner));
        assert_eq!(allocator.get(handle).unwrap() as *const Health, address);

        assert_eq!(allocator.free(handle), Some(Health(50)));
        assert!(allocator.is_empty());
        assert!(allocator.get(handle).is_none());
    }

    #[test]
    fn test_erased_release_and_downcast() {
        let mut boxed: Box<dyn ErasedAllocator> =
            Box::new(ComponentAllocator::<Health>::new(ComponentTypeId::new(4), 16));

        let typed = boxed
            .as_any_mut()
            .downcast_mut::<ComponentAllocator<Health>>()
            .unwrap();
        let handle = typed.allocate(EntityId::new(0, 0), Health(1));

        assert_eq!(boxed.component_type(), ComponentTypeId::new(4));
        assert_eq!(boxed.owner_of(handle), Some(EntityId::new(0, 0)));
        assert_eq!(boxed.live_count(), 1);
        assert!(boxed.release(handle));
        assert!(!boxed.release(handle));
        assert_eq!(boxed.live_count(), 0);
        assert_eq!(boxed.peak_count(), 1);
        assert!(boxed.as_any().downcast_ref::<ComponentAllocator<Health>>().is_some());
    }
}
