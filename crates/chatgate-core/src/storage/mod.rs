//! Persistent storage
//!
//! SQLite holds the served-request log (`chat_logs`) and the API keys that
//! callers authenticate with (`api_keys`).

mod sqlite;

#[cfg(test)]
mod tests;

pub use sqlite::SqliteStorage;
