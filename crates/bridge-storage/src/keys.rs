//! Storage key constants.

/// Storage keys used by the client.
pub struct StorageKeys;

impl StorageKeys {
    /// Serialized bearer credential (durable slot).
    pub const AUTH_TOKEN: &'static str = "auth_token";

    /// Path to return to once login completes (transient slot).
    pub const RETURN_TO: &'static str = "return_to";
}
