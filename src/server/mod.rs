//! Server module for Chatgate
//!
//! - `config`: configuration structures
//! - `loader`: layered loading from files and environment
//! - `validation`: startup checks
//! - `providers`: provider chain resolution
//! - `init`: collaborator wiring and the run loop

pub mod config;
mod init;
mod loader;
mod providers;
mod validation;

pub use init::{build_quota_store, open_storage, run, AppState};
pub use loader::load_config;
pub use providers::resolve_dispatcher;
pub use validation::validate_config;
