use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Named collections kept in the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Employees,
    Clients,
    Funcoes,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Employees => "employees",
            Collection::Clients => "clients",
            Collection::Funcoes => "funcoes",
        }
    }

    pub fn key(&self, namespace: &str) -> String {
        format!("{namespace}.{}", self.name())
    }
}

/// String key-value persistence holding JSON documents.
pub trait RecordStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&mut self, key: &str, json: &str) -> Result<(), StorageError>;
}

/// Reads a JSON array. A missing key is an empty collection.
pub fn load_collection<T: DeserializeOwned>(
    store: &dyn RecordStore,
    key: &str,
) -> Result<Vec<T>, StorageError> {
    let Some(contents) = store.load(key)? else {
        return Ok(Vec::new());
    };
    if contents.trim().is_empty() || contents.trim() == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(&contents).map_err(|source| StorageError::Malformed {
        key: key.to_string(),
        source,
    })
}

/// Like [`load_collection`], but a failing read is logged and treated as an
/// empty collection so callers can still render.
pub fn load_collection_or_empty<T: DeserializeOwned>(store: &dyn RecordStore, key: &str) -> Vec<T> {
    load_collection(store, key).unwrap_or_else(|err| {
        tracing::warn!(key, error = %err, "Treating unreadable collection as empty");
        Vec::new()
    })
}

pub fn save_collection<T: Serialize>(
    store: &mut dyn RecordStore,
    key: &str,
    items: &[T],
) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(items).map_err(|source| StorageError::Malformed {
        key: key.to_string(),
        source,
    })?;
    store.save(key, &json)
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file}.json"))
    }
}

impl RecordStore for JsonDirStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn save(&mut self, key: &str, json: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io_err)?;

        // Write then rename so readers never observe half a document.
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(io_err)?;
        fs::rename(&staging, &path).map_err(io_err)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, json: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), json.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
    }

    #[test]
    fn collection_keys_are_namespaced() {
        assert_eq!(Collection::Employees.key("ponto"), "ponto.employees");
        assert_eq!(Collection::Funcoes.key("demo"), "demo.funcoes");
    }

    #[test]
    fn missing_and_null_collections_are_empty() {
        let mut store = MemoryStore::new();
        let items: Vec<Item> = load_collection(&store, "ponto.clients").unwrap();
        assert!(items.is_empty());

        store.save("ponto.clients", "null").unwrap();
        let items: Vec<Item> = load_collection(&store, "ponto.clients").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error_or_empty() {
        let mut store = MemoryStore::new();
        store.save("ponto.clients", "[{oops").unwrap();
        let result: Result<Vec<Item>, _> = load_collection(&store, "ponto.clients");
        assert!(matches!(result, Err(StorageError::Malformed { .. })));

        let items: Vec<Item> = load_collection_or_empty(&store, "ponto.clients");
        assert!(items.is_empty());
    }

    #[test]
    fn json_dir_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonDirStore::new(dir.path().join("data"));
        assert_eq!(store.load("ponto.clients").unwrap(), None);

        let items = vec![Item {
            id: "CLI001".to_string(),
        }];
        save_collection(&mut store, "ponto.clients", &items).unwrap();
        assert!(store.root().join("ponto.clients.json").exists());

        let loaded: Vec<Item> = load_collection(&store, "ponto.clients").unwrap();
        assert_eq!(loaded, items);
    }

    #[test]
    fn json_dir_store_sanitizes_keys() {
        let store = JsonDirStore::new("/tmp/ponto");
        assert_eq!(
            store.path_for("a/b c"),
            PathBuf::from("/tmp/ponto/a_b_c.json")
        );
    }
}
