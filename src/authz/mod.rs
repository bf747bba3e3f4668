//! Access resolution and modulation.
//!
//! A request's role names are reduced to one [`AccessType`] by
//! [`RoleService::has_access`], which records it in the request's
//! [`RequestInformation`]. Entity operations then go through an
//! [`AccessModulator`], which picks the strategy matching that access type.

pub mod context;
pub mod errors;
pub mod guard;
pub mod modulator;
pub mod roles;
pub mod strategy;
pub mod types;

pub use context::RequestInformation;
pub use errors::AuthzError;
pub use modulator::AccessModulator;
pub use roles::{RoleService, RoleStore};
pub use strategy::{AccessStrategy, EntityStore, StrategyKind};
pub use types::{AccessType, Collection, CollectionPermission, Operation, Permission};
