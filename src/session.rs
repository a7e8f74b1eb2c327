use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::models::UserType;

/// The persisted session document. Field names match the keys the web
/// client kept in local storage, so a session written by either side reads
/// the same.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: Option<String>,
    #[serde(rename = "userType")]
    pub user_type: Option<String>,
    #[serde(rename = "userData")]
    pub user_data: Option<Value>,
}

/// Access to the persisted login state.
///
/// Reads never fail: a missing or unreadable session is simply "logged
/// out". Only writes report errors.
pub trait SessionStore: Send + Sync {
    fn read(&self) -> Option<StoredSession>;
    fn write(&self, session: &StoredSession) -> Result<()>;
    fn clear(&self) -> Result<()>;

    /// Changes whenever the stored session changes, including changes made
    /// by another process.
    fn revision(&self) -> u64;

    fn login(&self, token: &str, user_type: UserType, user: Value) -> Result<()> {
        self.write(&StoredSession {
            token: Some(token.to_string()),
            user_type: Some(user_type.as_str().to_string()),
            user_data: Some(user),
        })
    }

    fn logout(&self) -> Result<()> {
        self.clear()
    }

    /// True iff a token is present. The token is not validated.
    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    fn token(&self) -> Option<String> {
        self.read().and_then(|s| s.token)
    }

    fn user_type(&self) -> Option<UserType> {
        self.read()
            .and_then(|s| s.user_type)
            .and_then(|t| UserType::parse(&t))
    }

    fn current_user(&self) -> Option<Value> {
        self.read().and_then(|s| s.user_data)
    }
}

// --- File-backed store ---

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn open() -> Result<Self> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    #[cfg(test)]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_path() -> PathBuf {
        crate::config::data_dir().join("session.json")
    }

    fn read_bytes(&self) -> Option<Vec<u8>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session file unreadable");
                None
            }
        }
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> Option<StoredSession> {
        let bytes = self.read_bytes()?;
        match serde_json::from_slice(&bytes) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed session file");
                None
            }
        }
    }

    fn write(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(session)?;

        // Write beside the target and rename so readers never see half a session
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }

    fn revision(&self) -> u64 {
        match self.read_bytes() {
            Some(bytes) => {
                let mut hasher = DefaultHasher::new();
                bytes.hash(&mut hasher);
                // Keep 0 reserved for "no session"
                hasher.finish().max(1)
            }
            None => 0,
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

// --- In-memory store ---

/// Session store that lives only as long as the process.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<(Option<StoredSession>, u64)>,
}

#[cfg(test)]
impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl SessionStore for MemorySessionStore {
    fn read(&self) -> Option<StoredSession> {
        self.inner.lock().ok().and_then(|guard| guard.0.clone())
    }

    fn write(&self, session: &StoredSession) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
        guard.0 = Some(session.clone());
        guard.1 += 1;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
        guard.0 = None;
        guard.1 += 1;
        Ok(())
    }

    fn revision(&self) -> u64 {
        self.inner.lock().map(|guard| guard.1).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn file_store(dir: &TempDir) -> FileSessionStore {
        FileSessionStore::at(dir.path().join("nested").join("session.json"))
    }

    #[test]
    fn test_login_then_reads() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir);

        assert!(!store.is_authenticated());
        assert_eq!(store.user_type(), None);
        assert_eq!(store.current_user(), None);

        store
            .login("tok-1", UserType::Company, json!({"id": 4, "companyName": "Acme"}))
            .unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("tok-1"));
        assert_eq!(store.user_type(), Some(UserType::Company));
        assert_eq!(store.current_user(), Some(json!({"id": 4, "companyName": "Acme"})));
    }

    #[test]
    fn test_logout_clears_everything() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir);

        store.login("tok", UserType::Candidate, json!({"id": 1})).unwrap();
        store.logout().unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(store.read(), None);
        assert!(!store.path().exists());

        // Logging out twice is harmless
        store.logout().unwrap();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_document_uses_web_client_keys() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir);
        store.login("tok", UserType::Candidate, json!({"id": 9})).unwrap();

        let raw: Value = serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["token"], "tok");
        assert_eq!(raw["userType"], "candidate");
        assert_eq!(raw["userData"]["id"], 9);
    }

    #[test]
    fn test_malformed_file_reads_as_logged_out() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), b"{not json").unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(store.current_user(), None);
    }

    #[test]
    fn test_unknown_user_type_reads_as_none() {
        let store = MemorySessionStore::new();
        store
            .write(&StoredSession {
                token: Some("tok".to_string()),
                user_type: Some("admin".to_string()),
                user_data: None,
            })
            .unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.user_type(), None);
    }

    #[test]
    fn test_revision_tracks_changes_from_another_handle() {
        let dir = TempDir::new().unwrap();
        let ours = file_store(&dir);
        let theirs = FileSessionStore::at(ours.path().to_path_buf());

        assert_eq!(ours.revision(), 0);
        theirs.login("tok", UserType::Company, json!({})).unwrap();
        let logged_in = ours.revision();
        assert_ne!(logged_in, 0);

        theirs.logout().unwrap();
        assert_eq!(ours.revision(), 0);
        assert!(!ours.is_authenticated());
    }

    #[test]
    fn test_memory_store_revision_increments() {
        let store = MemorySessionStore::new();
        let before = store.revision();
        store.login("t", UserType::Candidate, json!({})).unwrap();
        assert!(store.revision() > before);
        let after_login = store.revision();
        store.logout().unwrap();
        assert!(store.revision() > after_login);
        assert!(!store.is_authenticated());
    }
}
