pub mod access_control;
pub mod role;

pub use access_control::Entity as AccessControl;
pub use role::Entity as Role;
