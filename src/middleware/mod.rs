//! HTTP middleware for Chatgate
//!
//! - `auth`: caller resolution from `X-API-Key` or `Authorization: Bearer`

pub mod auth;

pub use auth::RequireCaller;
