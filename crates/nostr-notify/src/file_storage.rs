use crate::{PersistenceFailure, Result, StorageAdapter};
use std::fs;
use std::path::PathBuf;

/// One JSON file per key under a base directory, so the stored settings and
/// history can be inspected by hand.
pub struct FileStorageAdapter {
    base_path: PathBuf,
}

impl FileStorageAdapter {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path)
            .map_err(|e| PersistenceFailure(format!("Failed to create directory: {}", e)))?;
        Ok(Self { base_path })
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        let sanitized = key.replace(['/', '\\', ':'], "_");
        self.base_path.join(format!("{}.json", sanitized))
    }
}

impl StorageAdapter for FileStorageAdapter {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_to_path(key);

        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceFailure(format!("Failed to read {}: {}", key, e)).into()),
        }
    }

    fn put(&self, key: &str, value: String) -> Result<()> {
        let path = self.key_to_path(key);
        // Readers only ever see a complete file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .map_err(|e| PersistenceFailure(format!("Failed to write {}: {}", key, e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| PersistenceFailure(format!("Failed to write {}: {}", key, e)))?;
        Ok(())
    }

    fn del(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key);

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceFailure(format!("Failed to delete {}: {}", key, e)).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_adapter_basic() {
        let temp_dir = TempDir::new().unwrap();
        let adapter = FileStorageAdapter::new(temp_dir.path().to_path_buf()).unwrap();

        assert!(adapter.get("nostr-notify-key").unwrap().is_none());

        adapter
            .put("nostr-notify-key", "abc".to_string())
            .unwrap();
        assert_eq!(
            adapter.get("nostr-notify-key").unwrap(),
            Some("abc".to_string())
        );

        adapter.del("nostr-notify-key").unwrap();
        assert!(adapter.get("nostr-notify-key").unwrap().is_none());

        // Deleting a missing key is fine
        adapter.del("nostr-notify-key").unwrap();
    }

    #[test]
    fn test_file_storage_keys_are_independent() {
        let temp_dir = TempDir::new().unwrap();
        let adapter = FileStorageAdapter::new(temp_dir.path().to_path_buf()).unwrap();

        adapter.put("nostr-notify-key", "1".to_string()).unwrap();
        adapter.put("nostr-notify-relays", "2".to_string()).unwrap();
        adapter.del("nostr-notify-key").unwrap();

        assert!(adapter.get("nostr-notify-key").unwrap().is_none());
        assert_eq!(
            adapter.get("nostr-notify-relays").unwrap(),
            Some("2".to_string())
        );
        // No temporary files are left behind
        assert!(!temp_dir.path().join("nostr-notify-relays.json.tmp").exists());
    }

    #[test]
    fn test_file_storage_sanitizes_keys() {
        let temp_dir = TempDir::new().unwrap();
        let adapter = FileStorageAdapter::new(temp_dir.path().to_path_buf()).unwrap();

        adapter.put("a/b:c", "x".to_string()).unwrap();
        assert!(temp_dir.path().join("a_b_c.json").exists());
        assert_eq!(adapter.get("a/b:c").unwrap(), Some("x".to_string()));
    }
}
