//! Accessgate - role-based access resolution and access-modulated storage
//!
//! This library provides the core functionality for the accessgate service.
//! It exposes all modules for testing purposes.

pub mod authz;
pub mod entities;
pub mod errors;
pub mod role_sync;
pub mod settings;
pub mod storage;
pub mod web;
