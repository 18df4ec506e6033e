use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::credential::decode_claims;
use super::role::{extract_role, Role};
use crate::error::{AppError, AppResult};

pub const TOKEN_KEY: &str = "token";
pub const ROLE_KEY: &str = "role";
pub const USER_ID_KEY: &str = "id";

const SESSION_KEYS: [&str; 3] = [TOKEN_KEY, ROLE_KEY, USER_ID_KEY];

/// Synchronous string key/value storage behind a `SessionContext`.
pub trait SessionBackend: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Apply all writes and removals as one update.
    fn update(&self, set: &[(&str, String)], remove: &[&str]) -> AppResult<()>;
}

/// Process-local storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }
}

impl SessionBackend for MemoryBackend {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn update(&self, set: &[(&str, String)], remove: &[&str]) -> AppResult<()> {
        let mut m = self.map.lock();
        for k in remove { m.remove(*k); }
        for (k, v) in set { m.insert((*k).to_string(), v.clone()); }
        Ok(())
    }
}

/// JSON file storage scoped to one user profile.
///
/// Read lazily on first access; every write goes to a sibling temp file that is
/// then renamed over the original.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    cache: Mutex<Option<HashMap<String, String>>>,
}

impl FileBackend {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into(), cache: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn read_file(&self) -> AppResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            AppError::storage("session_read".to_string(), format!("{}: {}", self.path.display(), e))
        })?;
        if text.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            AppError::storage("session_corrupt".to_string(), format!("{}: {}", self.path.display(), e))
        })
    }

    fn write_file(&self, map: &HashMap<String, String>) -> AppResult<()> {
        let io_err = |e: std::io::Error| {
            AppError::storage("session_write".to_string(), format!("{}: {}", self.path.display(), e))
        };
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(io_err)?;
            }
        }
        let body = serde_json::to_vec_pretty(map)
            .map_err(|e| AppError::storage("session_write".to_string(), e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut opts = std::fs::OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        // owner-only: the file holds a live bearer credential
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let mut file = opts.open(&tmp).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // mode() only applies on creation; tighten a leftover temp file too
            file.set_permissions(std::fs::Permissions::from_mode(0o600)).map_err(io_err)?;
        }
        file.write_all(&body).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl SessionBackend for FileBackend {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut cache = self.cache.lock();
        if cache.is_none() {
            *cache = Some(self.read_file()?);
        }
        Ok(cache.as_ref().and_then(|m| m.get(key).cloned()))
    }

    fn update(&self, set: &[(&str, String)], remove: &[&str]) -> AppResult<()> {
        let mut cache = self.cache.lock();
        let mut next = match cache.take() {
            Some(m) => m,
            // Only a pure removal may replace an unreadable file; writes surface the error.
            None => match self.read_file() {
                Ok(m) => m,
                Err(e) if set.is_empty() => {
                    warn!(target: "lendportal::session", "session.file unreadable, starting fresh: {}", e);
                    HashMap::new()
                }
                Err(e) => return Err(e),
            },
        };
        for k in remove { next.remove(*k); }
        for (k, v) in set { next.insert((*k).to_string(), v.clone()); }
        let res = self.write_file(&next);
        *cache = Some(next);
        res
    }
}

/// The current login as seen by the guard and dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub credential: String,
    pub role: Role,
    pub user_id: Option<String>,
}

/// Shared handle to the persisted session. Cloning shares the same store.
#[derive(Clone)]
pub struct SessionContext {
    backend: Arc<RwLock<Box<dyn SessionBackend>>>,
}

impl SessionContext {
    pub fn new(backend: Box<dyn SessionBackend>) -> Self {
        Self { backend: Arc::new(RwLock::new(backend)) }
    }

    pub fn in_memory() -> Self { Self::new(Box::new(MemoryBackend::new())) }

    /// Persist credential, role and user id together.
    ///
    /// The role must be the one the credential itself yields; a mismatch is
    /// rejected so the stored role can always be re-derived from the token.
    pub fn save(&self, credential: &str, role: Role, user_id: Option<&str>) -> AppResult<()> {
        let claims = decode_claims(credential)?;
        match extract_role(Some(&claims)) {
            Some(derived) if derived == role => {}
            other => {
                return Err(AppError::extraction(
                    "role_mismatch".to_string(),
                    format!("credential yields {:?}, refusing to store {}", other, role),
                ));
            }
        }
        let mut set = vec![(TOKEN_KEY, credential.to_string()), (ROLE_KEY, role.as_str().to_string())];
        let mut remove = Vec::new();
        match user_id {
            Some(id) => set.push((USER_ID_KEY, id.to_string())),
            None => remove.push(USER_ID_KEY),
        }
        self.backend.write().update(&set, &remove)?;
        info!(target: "lendportal::session", "session.save role={} user_id={}", role, user_id.unwrap_or("<none>"));
        Ok(())
    }

    pub fn get_role(&self) -> AppResult<Option<Role>> {
        let raw = self.backend.read().get(ROLE_KEY)?;
        Ok(raw.and_then(|s| match s.parse::<Role>() {
            Ok(r) => Some(r),
            Err(_) => {
                warn!(target: "lendportal::session", "session.role unrecognized value={}", s);
                None
            }
        }))
    }

    /// True iff a credential is stored. Expiry and signature are not checked here.
    pub fn is_active(&self) -> AppResult<bool> {
        Ok(self.credential()?.is_some())
    }

    pub fn credential(&self) -> AppResult<Option<String>> {
        Ok(self.backend.read().get(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    pub fn user_id(&self) -> AppResult<Option<String>> {
        self.backend.read().get(USER_ID_KEY)
    }

    /// Full session tuple, or `None` unless both credential and a known role are stored.
    pub fn session(&self) -> AppResult<Option<Session>> {
        let guard = self.backend.read();
        let Some(credential) = guard.get(TOKEN_KEY)?.filter(|t| !t.is_empty()) else { return Ok(None) };
        let Some(role) = guard.get(ROLE_KEY)?.and_then(|s| s.parse::<Role>().ok()) else { return Ok(None) };
        let user_id = guard.get(USER_ID_KEY)?;
        Ok(Some(Session { credential, role, user_id }))
    }

    pub fn clear(&self) -> AppResult<()> {
        self.backend.write().update(&[], &SESSION_KEYS)?;
        debug!(target: "lendportal::session", "session.clear");
        Ok(())
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}
