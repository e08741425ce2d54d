//! # Component System
//!
//! Components are plain Rust types attached to entities. Each component type
//! gets a dense numeric id from the registry's [`TypeRegistry`] the first time
//! it is seen (or when registered explicitly at startup).

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::memory::mix64;

/// Marker trait for ECS components.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Default)]
/// struct Transform {
///     translation: [f32; 3],
/// }
///
/// impl Component for Transform {
///     fn name() -> &'static str {
///         "Transform"
///     }
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    /// Human-readable tag used in logs and errors.
    ///
    /// Defaults to the Rust type name.
    fn name() -> &'static str {
        type_name::<Self>()
    }
}

/// Dense numeric identifier of a component type within one registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    /// Creates a type id from its raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index (registration order).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Key used for index maps.
    #[inline]
    #[must_use]
    pub const fn key(self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Assigns stable numeric ids to component types.
///
/// Ids are handed out in registration order and never change for the
/// lifetime of the registry.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Rust type -> assigned id.
    ids: HashMap<TypeId, ComponentTypeId>,
    /// Component names, indexed by id.
    names: Vec<&'static str>,
}

impl TypeRegistry {
    /// Creates an empty type registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `T`, assigning the next free id on first use.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        let next = ComponentTypeId::new(self.names.len() as u32);
        let names = &mut self.names;
        *self.ids.entry(TypeId::of::<T>()).or_insert_with(|| {
            names.push(T::name());
            next
        })
    }

    /// Returns the id of `T` if it has been registered.
    #[inline]
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<ComponentTypeId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the name a type id was registered with.
    #[must_use]
    pub fn name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.names.get(id.index() as usize).copied()
    }

    /// Returns the number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no component type has been registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The set of component types a group is defined over.
///
/// Stored sorted and deduplicated, so `{A, B}` and `{B, A, A}` are the same
/// signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentSignature {
    /// Sorted list of component type ids.
    types: Vec<ComponentTypeId>,
}

impl ComponentSignature {
    /// Creates a signature from component type ids in any order.
    #[must_use]
    pub fn new(mut types: Vec<ComponentTypeId>) -> Self {
        types.sort_unstable();
        types.dedup();
        Self { types }
    }

    /// Returns the component types in ascending id order.
    #[inline]
    #[must_use]
    pub fn types(&self) -> &[ComponentTypeId] {
        &self.types
    }

    /// Returns the number of component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if the signature has no component types.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns `true` if the signature includes `id`.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentTypeId) -> bool {
        self.types.binary_search(&id).is_ok()
    }

    /// Returns the column of `id` within the signature.
    #[inline]
    #[must_use]
    pub fn position(&self, id: ComponentTypeId) -> Option<usize> {
        self.types.binary_search(&id).ok()
    }

    /// Order-independent hash of the type set, used as the group cache key.
    #[must_use]
    pub fn key(&self) -> u64 {
        self.types
            .iter()
            .fold(mix64(self.types.len() as u64), |acc, id| {
                mix64(acc ^ id.key())
            })
    }
}

impl fmt::Display for ComponentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, id) in self.types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str("}")
    }
}
