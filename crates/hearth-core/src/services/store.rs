use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ServiceResult;

/// Persistent key-value store shared by all plugins.
///
/// Keys are free-form strings; plugins conventionally namespace them as
/// `<plugin>.<group>.<item>`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads a value.
    async fn get(&self, key: &str) -> ServiceResult<Option<Value>>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> ServiceResult<()>;

    /// Deletes a value, returning whether it existed.
    async fn delete(&self, key: &str) -> ServiceResult<bool>;

    /// Lists keys starting with `prefix`, in lexical order.
    async fn keys(&self, prefix: &str) -> ServiceResult<Vec<String>>;
}

/// Typed helpers on top of [`Store`].
#[async_trait]
pub trait StoreExt: Store {
    /// Reads and deserialises a value.
    async fn get_as<T: DeserializeOwned + Send>(&self, key: &str) -> ServiceResult<Option<T>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialises and writes a value.
    async fn set_as<T: Serialize + Sync>(&self, key: &str, value: &T) -> ServiceResult<()> {
        self.set(key, serde_json::to_value(value)?).await
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// In-process [`Store`] backed by an ordered map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> ServiceResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> ServiceResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> ServiceResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn keys(&self, prefix: &str) -> ServiceResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Mute {
        user: String,
        minutes: u32,
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store.set("mutes.1", json!({"user": "a"})).await.unwrap();
        assert_eq!(store.get("mutes.1").await.unwrap(), Some(json!({"user": "a"})));
        assert!(store.delete("mutes.1").await.unwrap());
        assert!(!store.delete("mutes.1").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keys_by_prefix() {
        let store = MemoryStore::new();
        for key in ["cmd.a", "cmd.b", "counter.x", "cmd"] {
            store.set(key, json!(1)).await.unwrap();
        }
        assert_eq!(store.keys("cmd.").await.unwrap(), vec!["cmd.a", "cmd.b"]);
        assert_eq!(store.keys("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        let store = MemoryStore::new();
        let mute = Mute {
            user: "bob".into(),
            minutes: 10,
        };
        store.set_as("mutes.bob", &mute).await.unwrap();
        assert_eq!(store.get_as::<Mute>("mutes.bob").await.unwrap(), Some(mute));
        assert!(store.get_as::<Mute>("mutes.alice").await.unwrap().is_none());

        store.set("mutes.bad", json!("nope")).await.unwrap();
        assert!(store.get_as::<Mute>("mutes.bad").await.is_err());
    }
}
