//! Client-side credential storage.
//!
//! Two slots back the session:
//! - a **durable** slot holding the serialized bearer credential, persisted
//!   as a JSON file under `~/.budget-bridge` ([`FileStorage`]);
//! - a **transient** slot holding the post-login return path, which lives only
//!   as long as the process ([`MemoryStorage`]).
//!
//! [`TokenStore`] is the high-level API the session controller talks to.

mod file;
mod keys;
mod memory;
mod token_store;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use token_store::TokenStore;
pub use traits::KeyValueStorage;

use bridge_config::Paths;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing file exists but is not a JSON object of strings
    #[error("Corrupt storage file {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the token store used by the CLI: file-backed durable slot,
/// in-memory transient slot.
pub fn create_token_store(paths: &Paths) -> TokenStore {
    TokenStore::new(
        Box::new(FileStorage::new(paths.credentials_file())),
        Box::new(MemoryStorage::new()),
    )
}
