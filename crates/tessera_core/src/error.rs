//! # Registry Error Types
//!
//! All errors that can occur when mutating the registry or loading its
//! configuration.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors that can occur in the entity-component registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The entity was deleted, or was never issued by this registry.
    #[error("stale entity handle: {0}")]
    StaleEntity(EntityId),

    /// Tried to remove a component the entity does not have.
    #[error("entity {entity} has no {component} component")]
    ComponentNotFound {
        /// The entity that was addressed.
        entity: EntityId,
        /// Name of the missing component type.
        component: &'static str,
    },

    /// Tried to add a component type the entity already has.
    #[error("entity {entity} already has a {component} component (use reset_component to replace it)")]
    ComponentAlreadyPresent {
        /// The entity that was addressed.
        entity: EntityId,
        /// Name of the duplicated component type.
        component: &'static str,
    },

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
