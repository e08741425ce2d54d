//! # Entity Groups
//!
//! A group is the cached result of "every entity having component set S".
//! It is built once by scanning the live entities and then kept current by
//! the registry, which forwards component add/remove events only to the
//! groups whose signature mentions the changed type.
//!
//! ## Layout
//!
//! ```text
//! signature: {Transform, Mesh}          (width = 2)
//! members:   [e7,  e2,  e9 ]
//! rows:      [t7, m7, t2, m2, t9, m9]   <- one handle per column per member
//! offsets:   {e7 -> 0, e2 -> 1, e9 -> 2}
//! ```
//!
//! Removal is a swap-removal: the last member and its row move into the hole.

use std::fmt;

use super::component::{ComponentSignature, ComponentTypeId};
use super::entity::{EntityId, EntityRecord};
use crate::memory::{IndexMap, PoolHandle};

/// Identifier of a group within one registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct GroupId(u32);

impl GroupId {
    /// Creates a group id from its raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index (creation order).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// Densely packed members of one component signature.
#[derive(Debug)]
pub struct EntityGroup {
    /// This group's id.
    id: GroupId,
    /// Required component types.
    signature: ComponentSignature,
    /// Member entities.
    members: Vec<EntityId>,
    /// Component handles, `signature.len()` per member, parallel to `members`.
    rows: Vec<PoolHandle>,
    /// Entity bits -> offset in `members`.
    offsets: IndexMap<usize>,
}

impl EntityGroup {
    pub(crate) fn new(id: GroupId, signature: ComponentSignature) -> Self {
        Self {
            id,
            signature,
            members: Vec::new(),
            rows: Vec::new(),
            offsets: IndexMap::new(),
        }
    }

    /// Returns the group's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Returns the component types required for membership.
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &ComponentSignature {
        &self.signature
    }

    /// Returns the number of members.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the group has no members.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns `true` if `entity` is a member.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.offsets.contains_key(entity.to_bits())
    }

    /// Returns the members in group order.
    ///
    /// Order is insertion order disturbed by swap-removals; do not rely on it
    /// across deletions.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.members
    }

    /// Returns the offset of `entity` within the group.
    #[inline]
    #[must_use]
    pub fn offset_of(&self, entity: EntityId) -> Option<usize> {
        self.offsets.get(entity.to_bits()).copied()
    }

    /// Returns the component handles of the member at `offset`, in signature
    /// column order.
    #[inline]
    #[must_use]
    pub fn row(&self, offset: usize) -> Option<&[PoolHandle]> {
        let width = self.signature.len();
        self.rows.get(offset * width..(offset + 1) * width)
    }

    /// Returns the column holding `component` handles.
    #[inline]
    #[must_use]
    pub fn column_of(&self, component: ComponentTypeId) -> Option<usize> {
        self.signature.position(component)
    }

    /// Admits `record` if it has every required component and is not
    /// already a member.
    ///
    /// # Returns
    ///
    /// `true` if the entity was added.
    pub(crate) fn add_entity(&mut self, record: &EntityRecord) -> bool {
        let key = record.id().to_bits();
        if self.offsets.contains_key(key) {
            return false;
        }

        let start = self.rows.len();
        for &component in self.signature.types() {
            let Some(handle) = record.handle(component) else {
                self.rows.truncate(start);
                return false;
            };
            self.rows.push(handle);
        }

        self.offsets.insert(key, self.members.len());
        self.members.push(record.id());
        true
    }

    /// Evicts `entity` by swap-removal.
    ///
    /// # Returns
    ///
    /// `true` if the entity was a member.
    pub(crate) fn remove_entity(&mut self, entity: EntityId) -> bool {
        let Some(offset) = self.offsets.remove(entity.to_bits()) else {
            return false;
        };

        let last = self.members.len() - 1;
        let width = self.signature.len();

        self.members.swap_remove(offset);
        if offset != last {
            self.rows
                .copy_within(last * width..(last + 1) * width, offset * width);

            let moved = self.members[offset];
            if let Some(moved_offset) = self.offsets.get_mut(moved.to_bits()) {
                *moved_offset = offset;
            }
        }
        self.rows.truncate(last * width);

        debug_assert_eq!(self.rows.len(), self.members.len() * width);
        true
    }

    /// Drops every member. Used at registry teardown.
    pub(crate) fn reset(&mut self) {
        self.members.clear();
        self.rows.clear();
        self.offsets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ComponentTypeId = ComponentTypeId::new(0);
    const B: ComponentTypeId = ComponentTypeId::new(1);

    fn record(index: u32, components: &[ComponentTypeId]) -> EntityRecord {
        let mut record = EntityRecord::new(EntityId::new(index, 0), index as usize);
        for &component in components {
            record.insert(component, PoolHandle::new(index * 10 + component.index(), 0));
        }
        record
    }

    fn group_ab() -> EntityGroup {
        EntityGroup::new(GroupId::new(0), ComponentSignature::new(vec![B, A]))
    }

    #[test]
    fn test_add_requires_every_component() {
        let mut group = group_ab();

        assert!(!group.add_entity(&record(1, &[A])));
        assert!(group.is_empty());

        let full = record(2, &[A, B]);
        assert!(group.add_entity(&full));
        assert!(!group.add_entity(&full)); // Already a member
        assert_eq!(group.len(), 1);
        assert_eq!(
            group.row(0).unwrap(),
            &[PoolHandle::new(20, 0), PoolHandle::new(21, 0)]
        );
    }

    #[test]
    fn test_swap_removal_keeps_rows_aligned() {
        let mut group = group_ab();
        for index in 0..4 {
            group.add_entity(&record(index, &[A, B]));
        }

        assert!(group.remove_entity(EntityId::new(1, 0)));
        assert!(!group.remove_entity(EntityId::new(1, 0)));
        assert_eq!(group.len(), 3);

        // Entity 3 moved into offset 1 along with its row.
        assert_eq!(group.entities()[1], EntityId::new(3, 0));
        assert_eq!(group.offset_of(EntityId::new(3, 0)), Some(1));
        assert_eq!(
            group.row(1).unwrap(),
            &[PoolHandle::new(30, 0), PoolHandle::new(31, 0)]
        );
        assert!(group.row(3).is_none());

        for (offset, &entity) in group.entities().iter().enumerate() {
            assert_eq!(group.offset_of(entity), Some(offset));
        }
    }

    #[test]
    fn test_remove_last_and_reset() {
        let mut group = group_ab();
        group.add_entity(&record(0, &[A, B]));
        group.add_entity(&record(1, &[A, B]));

        assert!(group.remove_entity(EntityId::new(1, 0)));
        assert_eq!(group.entities(), &[EntityId::new(0, 0)]);

        group.reset();
        assert!(group.is_empty());
        assert!(!group.contains(EntityId::new(0, 0)));
        assert_eq!(group.column_of(B), Some(1));
    }
}
