use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

/// Flat string-keyed durable storage.
///
/// Reads must reflect the most recent write issued through the same store.
/// The SQLite [`Database`](crate::db::Database) is the durable implementation;
/// [`MemoryStore`] backs tests and throwaway sessions.
pub trait KeyValueStore {
    fn get_string(&self, key: &str) -> Result<Option<String>>;
    fn put_string(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<bool>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        (**self).get_string(key)
    }

    fn put_string(&self, key: &str, value: &str) -> Result<()> {
        (**self).put_string(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        (**self).get_string(key)
    }

    fn put_string(&self, key: &str, value: &str) -> Result<()> {
        (**self).put_string(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        (**self).get_string(key)
    }

    fn put_string(&self, key: &str, value: &str) -> Result<()> {
        (**self).put_string(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put_string(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get_string("a").unwrap(), None);

        store.put_string("a", "1").unwrap();
        store.put_string("a", "2").unwrap();
        assert_eq!(store.get_string("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);

        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_through_references() {
        fn write_via<S: KeyValueStore>(store: S) {
            store.put_string("k", "v").unwrap();
        }

        let store = Arc::new(MemoryStore::new());
        write_via(&*store);
        write_via(Arc::clone(&store));
        let boxed: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        write_via(&boxed);
        assert_eq!(store.get_string("k").unwrap().as_deref(), Some("v"));
        assert_eq!(boxed.get_string("k").unwrap().as_deref(), Some("v"));
    }
}
