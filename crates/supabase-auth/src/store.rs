//! Session persistence.

use crate::SupabaseResult;
use auth_session::Session;
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the client keeps the current session.
pub trait SessionStore: Send + Sync {
    /// Load the stored session, if any.
    fn load(&self) -> SupabaseResult<Option<Session>>;

    /// Replace the stored session.
    fn save(&self, session: &Session) -> SupabaseResult<()>;

    /// Remove the stored session. Returns whether one was present.
    fn clear(&self) -> SupabaseResult<bool>;
}

/// In-memory store; the session is lost with the process.
#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> SupabaseResult<Option<Session>> {
        Ok(self.session.lock().clone())
    }

    fn save(&self, session: &Session) -> SupabaseResult<()> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> SupabaseResult<bool> {
        Ok(self.session.lock().take().is_some())
    }
}

/// Session stored as JSON in a single file.
///
/// Writes go to a temporary file that is renamed over the target. On unix
/// the file is readable by the owner only.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(&self, content: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");

        let write_result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(content)?;
            file.sync_all()?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
            }

            fs::rename(&tmp_path, &self.path)
        })();

        if write_result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        write_result
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> SupabaseResult<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let session = serde_json::from_str(&content)?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> SupabaseResult<()> {
        let content = serde_json::to_vec_pretty(session)?;
        self.write_atomic(&content)?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> SupabaseResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_context::User;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn sample_session() -> Session {
        Session {
            access_token: "access-1".to_string(),
            refresh_token: "refresh-1".to_string(),
            token_type: "bearer".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user: User::new("u1").with_email("ada@example.com"),
        }
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&sample_session()).unwrap();
        assert_eq!(store.load().unwrap().unwrap().user.id, "u1");

        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_missing_file() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path().join("session.json"));

        assert!(store.load().unwrap().is_none());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_file_store_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path().join("nested").join("session.json"));
        let session = sample_session();

        store.save(&session).unwrap();

        assert!(store.path().exists());
        assert_eq!(store.load().unwrap(), Some(session));
    }

    #[test]
    fn test_file_store_clear() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path().join("session.json"));
        store.save(&sample_session()).unwrap();

        assert!(store.clear().unwrap());
        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert!(matches!(store.load(), Err(crate::SupabaseError::Json(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path().join("session.json"));
        store.save(&sample_session()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
