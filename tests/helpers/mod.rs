#![allow(dead_code)]

pub mod builders;
pub mod db;

pub use builders::{resolved_ctx, seed_acl, RoleBuilder};
pub use db::TestDb;
