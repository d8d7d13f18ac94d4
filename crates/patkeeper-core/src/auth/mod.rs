//! Session management and credential persistence.
//!
//! This module provides:
//! - `SessionStore`: the signed-in identity, persisted across restarts
//! - `KeyValueStore`: the injected persistence capability with file,
//!   OS keychain and in-memory implementations

pub mod credentials;
pub mod session;
pub mod storage;

pub use credentials::KeyringStore;
pub use session::{SessionStore, CREDENTIAL_KEY, USER_KEY};
pub use storage::{open_store, FileStore, KeyValueStore, MemoryStore, StorageError, StorageKind};
