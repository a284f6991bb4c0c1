//! Account credentials and the stores that persist them

use crate::error::RupError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Identity/secret pair used to sign in
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub identity: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Secure persistent storage for one pair of credentials.
///
/// Implementations are scoped to a single application key and must be safe
/// to call from any thread.
pub trait CredentialStore: Send + Sync {
    /// Read the saved pair, if any
    fn get(&self) -> Result<Option<Credentials>, RupError>;

    /// Replace the saved pair
    fn set(&self, credentials: &Credentials) -> Result<(), RupError>;

    /// Remove the saved pair; removing nothing is not an error
    fn delete(&self) -> Result<(), RupError>;
}

/// In-process store, forgotten when dropped
#[derive(Default)]
pub struct MemoryCredentialStore {
    saved: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `credentials`
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            saved: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<Credentials>, RupError> {
        Ok(self
            .saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn set(&self, credentials: &Credentials) -> Result<(), RupError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());
        Ok(())
    }

    fn delete(&self) -> Result<(), RupError> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

/// Default application key for saved credentials
pub const DEFAULT_ACCOUNT_KEY: &str = "rup";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    accounts: BTreeMap<String, SavedAccount>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedAccount {
    #[serde(flatten)]
    credentials: Credentials,
    saved_at: DateTime<Utc>,
}

/// JSON file store readable only by the owner.
///
/// Several application keys may share one file; each store instance only
/// touches its own entry.
pub struct FileCredentialStore {
    path: PathBuf,
    account_key: String,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_account_key(path, DEFAULT_ACCOUNT_KEY)
    }

    pub fn with_account_key(path: impl Into<PathBuf>, account_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            account_key: account_key.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the saved pair was written, if one exists
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>, RupError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self
            .read_file()?
            .accounts
            .get(&self.account_key)
            .map(|account| account.saved_at))
    }

    fn read_file(&self) -> Result<CredentialFile, RupError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(CredentialFile::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CredentialFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_file(&self, file: &CredentialFile) -> Result<(), RupError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        let mut tmp = create_private(&tmp_path)?;
        tmp.write_all(&serde_json::to_vec_pretty(file)?)?;
        tmp.sync_all()?;
        drop(tmp);
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<Credentials>, RupError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let file = self.read_file()?;
        Ok(file
            .accounts
            .get(&self.account_key)
            .map(|account| account.credentials.clone()))
    }

    fn set(&self, credentials: &Credentials) -> Result<(), RupError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = self.read_file()?;
        file.accounts.insert(
            self.account_key.clone(),
            SavedAccount {
                credentials: credentials.clone(),
                saved_at: Utc::now(),
            },
        );
        self.write_file(&file)?;
        debug!("Saved credentials to {}", self.path.display());
        Ok(())
    }

    fn delete(&self) -> Result<(), RupError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = self.read_file()?;
        if file.accounts.remove(&self.account_key).is_none() {
            return Ok(());
        }

        if file.accounts.is_empty() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            self.write_file(&file)?;
        }
        debug!("Deleted saved credentials from {}", self.path.display());
        Ok(())
    }
}

/// Create `path` fresh, readable only by the owner before any byte is written
#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    // The mode only applies when the file is created
    remove_if_exists(path)?;
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    remove_if_exists(path)?;
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_credentials_debug_hides_secret() {
        let credentials = Credentials::new("a@b.com", "hunter2");
        let printed = format!("{:?}", credentials);
        assert!(printed.contains("a@b.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get().unwrap(), None);

        let credentials = Credentials::new("a@b.com", "pw");
        store.set(&credentials).unwrap();
        assert_eq!(store.get().unwrap(), Some(credentials));

        store.delete().unwrap();
        assert_eq!(store.get().unwrap(), None);
        store.delete().unwrap();
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");
        let store = FileCredentialStore::new(&path);

        assert_eq!(store.get().unwrap(), None);
        assert_eq!(store.saved_at().unwrap(), None);

        let credentials = Credentials::new("a@b.com", "pw");
        store.set(&credentials).unwrap();
        assert!(path.exists());
        assert_eq!(store.get().unwrap(), Some(credentials.clone()));
        assert!(store.saved_at().unwrap().is_some());

        // A new instance over the same file sees the same pair
        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.get().unwrap(), Some(credentials));

        store.delete().unwrap();
        assert_eq!(store.get().unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_file_store_isolates_account_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let first = FileCredentialStore::with_account_key(&path, "first");
        let second = FileCredentialStore::with_account_key(&path, "second");

        first.set(&Credentials::new("one@b.com", "1")).unwrap();
        second.set(&Credentials::new("two@b.com", "2")).unwrap();

        first.delete().unwrap();
        assert_eq!(first.get().unwrap(), None);
        assert_eq!(
            second.get().unwrap().map(|c| c.identity),
            Some("two@b.com".to_string())
        );
        assert!(path.exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(matches!(store.get(), Err(RupError::JsonError(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::new(&path);
        store.set(&Credentials::new("a@b.com", "pw")).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_tmp_file_is_private_before_write() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let tmp_path = dir.path().join("credentials.tmp");
        // A stale world-readable leftover must not keep its mode
        std::fs::write(&tmp_path, b"old").unwrap();
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let file = create_private(&tmp_path).unwrap();
        let mode = file.metadata().unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(file.metadata().unwrap().len(), 0);
    }
}
