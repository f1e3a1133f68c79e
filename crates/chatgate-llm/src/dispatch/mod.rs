//! Dispatch - ordered fallback across text providers
//!
//! # Module Structure
//!
//! - `hint`: parsing of the optional client model hint
//! - `dispatcher`: the fallback chain and explicit-provider routing
//! - `mock`: scripted provider for tests

mod dispatcher;
mod hint;
mod mock;


pub use dispatcher::{DispatchAttempt, DispatchError, Dispatched, Dispatcher};
pub use hint::{ModelHint, KNOWN_PROVIDERS};
pub use mock::{ScriptedProvider, Step};
