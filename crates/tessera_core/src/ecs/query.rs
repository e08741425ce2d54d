//! # Typed Group Queries
//!
//! A [`Query`] is a tuple of component types, `(A,)` through
//! `(A, B, C, D, E, F)`. The registry turns it into a [`ComponentSignature`]
//! to find (or build) the matching [`EntityGroup`], and the resulting
//! [`GroupView`] yields `(EntityId, &A, &B, ...)` per member.

use std::marker::PhantomData;

use super::allocator::ComponentAllocator;
use super::component::{Component, ComponentSignature, ComponentTypeId, TypeRegistry};
use super::entity::EntityId;
use super::group::{EntityGroup, GroupId};
use super::registry::Registry;
use crate::memory::PoolHandle;

/// A tuple of component types that can be used to look up a group.
pub trait Query: 'static {
    /// What iteration yields per member.
    type Item<'a>;

    /// Resolved per-type storage for one group.
    type Columns<'a>;

    /// Registers every type of the tuple and returns the group signature.
    fn signature(types: &mut TypeRegistry) -> ComponentSignature;

    /// Returns the group signature without registering anything.
    ///
    /// None if some type of the tuple has never been registered.
    fn lookup_signature(types: &TypeRegistry) -> Option<ComponentSignature>;

    /// Resolves each type's allocator and column in `group`.
    ///
    /// Returns None if some type has never been stored, in which case the
    /// group is necessarily empty.
    fn columns<'a>(registry: &'a Registry, group: &EntityGroup) -> Option<Self::Columns<'a>>;

    /// Builds the item for one member from its row of handles.
    fn fetch<'a>(
        columns: &Self::Columns<'a>,
        entity: EntityId,
        row: &[PoolHandle],
    ) -> Option<Self::Item<'a>>;
}

/// One resolved query column: where `T` lives in the row, and its allocator.
pub struct Column<'a, T: Component> {
    allocator: &'a ComponentAllocator<T>,
    index: usize,
}

impl<'a, T: Component> Column<'a, T> {
    fn resolve(registry: &'a Registry, group: &EntityGroup) -> Option<Self> {
        let component: ComponentTypeId = registry.component_type_id::<T>()?;
        Some(Self {
            allocator: registry.allocator::<T>()?,
            index: group.column_of(component)?,
        })
    }

    #[inline]
    fn get(&self, row: &[PoolHandle]) -> Option<&'a T> {
        self.allocator.get(*row.get(self.index)?)
    }
}

macro_rules! impl_query {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Query for ($($name,)+) {
            type Item<'a> = (EntityId, $(&'a $name,)+);
            type Columns<'a> = ($(Column<'a, $name>,)+);

            fn signature(types: &mut TypeRegistry) -> ComponentSignature {
                ComponentSignature::new(vec![$(types.register::<$name>()),+])
            }

            fn lookup_signature(types: &TypeRegistry) -> Option<ComponentSignature> {
                Some(ComponentSignature::new(vec![$(types.get::<$name>()?),+]))
            }

            fn columns<'a>(registry: &'a Registry, group: &EntityGroup) -> Option<Self::Columns<'a>> {
                Some(($(Column::<$name>::resolve(registry, group)?,)+))
            }

            #[allow(non_snake_case)]
            fn fetch<'a>(
                columns: &Self::Columns<'a>,
                entity: EntityId,
                row: &[PoolHandle],
            ) -> Option<Self::Item<'a>> {
                let ($($name,)+) = columns;
                Some((entity, $($name.get(row)?,)+))
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);

/// Borrowed, typed view of a group.
///
/// The view borrows the registry, so no entity or component can be added or
/// removed while it is alive.
pub struct GroupView<'a, Q: Query> {
    group: &'a EntityGroup,
    columns: Option<Q::Columns<'a>>,
    _query: PhantomData<Q>,
}

impl<'a, Q: Query> GroupView<'a, Q> {
    pub(crate) fn new(registry: &'a Registry, group: &'a EntityGroup) -> Self {
        Self {
            group,
            columns: Q::columns(registry, group),
            _query: PhantomData,
        }
    }

    /// Returns the id of the underlying group.
    #[inline]
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.group.id()
    }

    /// Returns the number of members.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.group.len()
    }

    /// Returns `true` if the group has no members.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    /// Returns `true` if `entity` is a member.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.group.contains(entity)
    }

    /// Returns the members in group order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &'a [EntityId] {
        self.group.entities()
    }

    /// Returns the untyped group.
    #[inline]
    #[must_use]
    pub fn group(&self) -> &'a EntityGroup {
        self.group
    }

    /// Gets the item of a single member.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<Q::Item<'a>> {
        let offset = self.group.offset_of(entity)?;
        Q::fetch(self.columns.as_ref()?, entity, self.group.row(offset)?)
    }

    /// Iterates over `(EntityId, &A, &B, ...)` for every member.
    pub fn iter(&self) -> impl Iterator<Item = Q::Item<'a>> + '_ {
        let group = self.group;
        let columns = self.columns.as_ref();
        group
            .entities()
            .iter()
            .enumerate()
            .filter_map(move |(offset, &entity)| {
                Q::fetch(columns?, entity, group.row(offset)?)
            })
    }
}
