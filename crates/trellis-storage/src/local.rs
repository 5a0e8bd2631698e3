use crate::traits::{StateMedium, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// File extension of committed entries
const ENTRY_EXTENSION: &str = ".json";

/// Longest encoded file name accepted, below the usual 255-byte limit so the
/// temporary-file decoration still fits.
const MAX_FILE_NAME_LEN: usize = 200;

/// Local filesystem medium implementation
///
/// Each key is one file under `base_path`, named by [`encode_file_stem`]. Writes go
/// to a hidden temporary file that is synced and then renamed over the entry, so a key
/// is replaced atomically and a crash leaves either the old or the new value.
#[derive(Clone, Debug)]
pub struct LocalMedium {
    base_path: PathBuf,
}

impl LocalMedium {
    /// Create a new LocalMedium instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for state files (e.g., "~/.trellis/state")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create state directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalMedium { base_path })
    }

    /// Convert a key to its entry path
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        let encoded = encode_file_stem(key);
        if encoded.len() > MAX_FILE_NAME_LEN {
            return Err(StorageError::InvalidKey(format!(
                "Key is too long for the local backend ({} encoded bytes)",
                encoded.len()
            )));
        }
        Ok(self
            .base_path
            .join(format!("{}{}", encoded, ENTRY_EXTENSION)))
    }

    /// Recover the key from an entry file name. Temporary and foreign files yield `None`.
    fn file_name_to_key(file_name: &str) -> Option<String> {
        let encoded = file_name.strip_suffix(ENTRY_EXTENSION)?;
        urlencoding::decode(encoded).ok().map(|key| key.into_owned())
    }

    fn temp_path_for(&self, path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.base_path
            .join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()))
    }
}

/// Percent-encode `key` into a file name stem, uppercase ASCII letters included.
///
/// The only letters left in the stem are lowercase ones and the uppercase hex digits of
/// escapes, so keys differing only in case stay distinct on case-insensitive filesystems.
/// `urlencoding::decode` reverses it.
fn encode_file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    let mut buf = [0u8; 4];
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            stem.push_str(&format!("%{:02X}", c as u8));
        } else {
            stem.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    stem
}

#[async_trait]
impl StateMedium for LocalMedium {
    async fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.key_to_path(key)?;

        match fs::read_to_string(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write(&self, key: &str, value: String) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let temp_path = self.temp_path_for(&path);
        let size = value.len();
        let start = std::time::Instant::now();

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        let written = async {
            file.write_all(value.as_bytes()).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::WriteFailed(format!(
                "Failed to write file {}: {}",
                temp_path.display(),
                e
            )));
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::WriteFailed(format!(
                "Failed to replace file {}: {}",
                path.display(),
                e
            )));
        }

        tracing::debug!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local state write successful"
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(
                    path = %path.display(),
                    key = %key,
                    "Local state delete successful"
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut dir = fs::read_dir(&self.base_path).await.map_err(|e| {
            StorageError::ListFailed(format!(
                "Failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(key) = Self::file_name_to_key(file_name) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        Ok(keys)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_write_read() {
        let dir = tempdir().unwrap();
        let medium = LocalMedium::new(dir.path()).await.unwrap();

        medium
            .write("app:statedb:version", r#"{"version":"1.0"}"#.to_string())
            .await
            .unwrap();

        let read = medium.read("app:statedb:version").await.unwrap();
        assert_eq!(read.as_deref(), Some(r#"{"version":"1.0"}"#));
    }

    #[tokio::test]
    async fn test_local_read_missing_is_none() {
        let dir = tempdir().unwrap();
        let medium = LocalMedium::new(dir.path()).await.unwrap();

        assert_eq!(medium.read("app:missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_overwrite_replaces_value() {
        let dir = tempdir().unwrap();
        let medium = LocalMedium::new(dir.path()).await.unwrap();

        medium.write("k", "first".to_string()).await.unwrap();
        medium.write("k", "second".to_string()).await.unwrap();

        assert_eq!(medium.read("k").await.unwrap().as_deref(), Some("second"));
        // no temporary files left behind
        let mut dir_entries = std::fs::read_dir(dir.path()).unwrap();
        let only = dir_entries.next().unwrap().unwrap();
        assert!(dir_entries.next().is_none());
        assert_eq!(only.file_name().to_str(), Some("k.json"));
    }

    #[tokio::test]
    async fn test_local_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let medium = LocalMedium::new(dir.path()).await.unwrap();

        let result = medium.delete("nonexistent:key").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_local_keys_with_separators_and_slashes() {
        let dir = tempdir().unwrap();
        let medium = LocalMedium::new(dir.path()).await.unwrap();

        medium
            .write("ns:../../etc/passwd", "{}".to_string())
            .await
            .unwrap();

        // the key is encoded into a single file inside the base directory
        assert!(dir.path().join("ns%3A..%2F..%2Fetc%2Fpasswd.json").exists());
        assert_eq!(
            medium.list("ns:").await.unwrap(),
            vec!["ns:../../etc/passwd".to_string()]
        );
    }

    #[tokio::test]
    async fn test_local_list_ignores_temp_and_foreign_files() {
        let dir = tempdir().unwrap();
        let medium = LocalMedium::new(dir.path()).await.unwrap();

        medium.write("a:1", "{}".to_string()).await.unwrap();
        medium.write("b:1", "{}".to_string()).await.unwrap();
        std::fs::write(dir.path().join(".a%3A2.json.deadbeef.tmp"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let keys = medium.list("a:").await.unwrap();
        assert_eq!(keys, vec!["a:1".to_string()]);
    }

    #[tokio::test]
    async fn test_local_rejects_overlong_key() {
        let dir = tempdir().unwrap();
        let medium = LocalMedium::new(dir.path()).await.unwrap();

        let key = "k".repeat(MAX_FILE_NAME_LEN + 1);
        let result = medium.write(&key, "{}".to_string()).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_keys_differing_in_case_use_distinct_files() {
        let dir = tempdir().unwrap();
        let medium = LocalMedium::new(dir.path()).await.unwrap();

        let upper = medium.key_to_path("App:Layout").unwrap();
        let lower = medium.key_to_path("app:layout").unwrap();
        assert_ne!(
            upper.to_string_lossy().to_lowercase(),
            lower.to_string_lossy().to_lowercase()
        );
        assert_eq!(medium.key_to_path("A").unwrap(), dir.path().join("%41.json"));

        medium.write("App:Layout", "1".to_string()).await.unwrap();
        medium.write("app:layout", "2".to_string()).await.unwrap();
        assert_eq!(medium.read("App:Layout").await.unwrap().as_deref(), Some("1"));
        assert_eq!(medium.read("app:layout").await.unwrap().as_deref(), Some("2"));
        assert_eq!(medium.list("App:").await.unwrap(), vec!["App:Layout".to_string()]);
    }

    #[test]
    fn test_file_stem_escapes_case_and_percent() {
        assert_eq!(encode_file_stem("Ab:c"), "%41b%3Ac");
        assert_eq!(encode_file_stem("%3a"), "%253a");
        assert_eq!(encode_file_stem("é"), "%C3%A9");
        assert_eq!(
            urlencoding::decode(&encode_file_stem("Ab:%3a/é")).unwrap(),
            "Ab:%3a/é"
        );
    }

    #[tokio::test]
    async fn test_local_state_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let medium = LocalMedium::new(dir.path()).await.unwrap();
            medium.write("ns:layout", "[1,2]".to_string()).await.unwrap();
        }
        let reopened = LocalMedium::new(dir.path()).await.unwrap();
        assert_eq!(
            reopened.read("ns:layout").await.unwrap().as_deref(),
            Some("[1,2]")
        );
    }
}
