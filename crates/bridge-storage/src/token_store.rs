//! High-level API over the credential slots.

use crate::{KeyValueStorage, StorageKeys, StorageResult};

/// Persists the single bearer credential (durable) and the post-login
/// return path (transient).
///
/// The store holds raw strings only. Decoding and validation belong to the
/// session controller; a value read from here is merely a candidate.
pub struct TokenStore {
    durable: Box<dyn KeyValueStorage>,
    transient: Box<dyn KeyValueStorage>,
}

impl TokenStore {
    pub fn new(durable: Box<dyn KeyValueStorage>, transient: Box<dyn KeyValueStorage>) -> Self {
        Self { durable, transient }
    }

    // ==========================================
    // Bearer credential (durable)
    // ==========================================

    /// Store the serialized bearer credential, replacing any previous one.
    pub fn set_credential(&self, token: &str) -> StorageResult<()> {
        self.durable.set(StorageKeys::AUTH_TOKEN, token)
    }

    /// Read the persisted credential, if any. Blank values read as absent.
    pub fn credential(&self) -> StorageResult<Option<String>> {
        Ok(self
            .durable
            .get(StorageKeys::AUTH_TOKEN)?
            .filter(|token| !token.trim().is_empty()))
    }

    pub fn has_credential(&self) -> StorageResult<bool> {
        Ok(self.credential()?.is_some())
    }

    /// Remove the persisted credential.
    pub fn clear_credential(&self) -> StorageResult<()> {
        self.durable.delete(StorageKeys::AUTH_TOKEN)?;
        Ok(())
    }

    // ==========================================
    // Return path (transient)
    // ==========================================

    /// Remember where to go once login completes.
    pub fn set_return_to(&self, path: &str) -> StorageResult<()> {
        self.transient.set(StorageKeys::RETURN_TO, path)
    }

    /// Read and clear the stashed return path.
    pub fn take_return_to(&self) -> StorageResult<Option<String>> {
        let value = self.transient.get(StorageKeys::RETURN_TO)?;
        if value.is_some() {
            self.transient.delete(StorageKeys::RETURN_TO)?;
        }
        Ok(value)
    }

    /// Remove everything this store owns.
    pub fn clear_all(&self) -> StorageResult<()> {
        self.clear_credential()?;
        self.transient.delete(StorageKeys::RETURN_TO)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn create_store() -> TokenStore {
        TokenStore::new(
            Box::new(MemoryStorage::new()),
            Box::new(MemoryStorage::new()),
        )
    }

    #[test]
    fn test_credential_lifecycle() {
        let store = create_store();
        assert!(!store.has_credential().unwrap());

        store.set_credential("token-1").unwrap();
        assert_eq!(store.credential().unwrap(), Some("token-1".to_string()));

        store.set_credential("token-2").unwrap();
        assert_eq!(store.credential().unwrap(), Some("token-2".to_string()));

        store.clear_credential().unwrap();
        assert_eq!(store.credential().unwrap(), None);
    }

    #[test]
    fn test_blank_credential_reads_as_absent() {
        let store = create_store();
        store.set_credential("   ").unwrap();
        assert!(!store.has_credential().unwrap());
    }

    #[test]
    fn test_return_to_is_taken_once() {
        let store = create_store();
        store.set_return_to("/settings?tab=links").unwrap();

        assert_eq!(
            store.take_return_to().unwrap(),
            Some("/settings?tab=links".to_string())
        );
        assert_eq!(store.take_return_to().unwrap(), None);
    }

    #[test]
    fn test_clear_all() {
        let store = create_store();
        store.set_credential("token").unwrap();
        store.set_return_to("/").unwrap();

        store.clear_all().unwrap();
        assert!(!store.has_credential().unwrap());
        assert_eq!(store.take_return_to().unwrap(), None);
    }
}
