//! Persistence for parties and session logs
//!
//! - `kv`: hash-like per-session storage (`SqliteKvStore`)
//! - `session_store`: append-only message log on top of a `KvStore`
//! - `party_store`: relational party/host-credential records
//! - `locks`: keyed async mutexes serializing per-session writers

pub mod kv;
pub mod locks;
pub mod party_store;
pub mod schema;
pub mod session_store;

pub use kv::{KvStore, SqliteKvStore};
pub use locks::KeyedLocks;
pub use party_store::{HostCredentials, PartyStore, SqlitePartyStore};
pub use schema::init_schema;
pub use session_store::{project_for_users, SessionStore, MESSAGES_FIELD};
