//! Identifier-keyed store of connection profiles.
//!
//! The registry is the identity layer the execution paths hang off: a
//! UUID resolves to at most one profile, replacement is atomic (a reader
//! racing an upsert sees the old profile or the new one, never a gap),
//! and absence is a normal query outcome rather than an error.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use husk_protocol::SessionInfo;
use husk_protocol::SessionSummary;
use indexmap::IndexMap;
use tracing::debug;
use uuid::Uuid;

pub struct SessionRegistry {
    entries: RwLock<IndexMap<Uuid, SessionInfo>>,
    store_path: Option<PathBuf>,
}

impl SessionRegistry {
    /// A registry that lives and dies with the process.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            store_path: None,
        }
    }

    /// Open a file-backed registry, loading any existing profiles.
    ///
    /// A missing file is an empty registry; a file that exists but cannot
    /// be read or parsed is an error here rather than a silent wipe later.
    pub fn open(store_path: PathBuf) -> io::Result<Self> {
        let entries = match fs::read(&store_path) {
            Ok(bytes) => {
                let profiles: Vec<SessionInfo> =
                    serde_json::from_slice(&bytes).map_err(io::Error::other)?;
                profiles
                    .into_iter()
                    .map(|info| (info.session_id, info))
                    .collect()
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => IndexMap::new(),
            Err(err) => return Err(err),
        };
        debug!(
            store = %store_path.display(),
            profiles = entries.len(),
            "opened session registry"
        );
        Ok(Self {
            entries: RwLock::new(entries),
            store_path: Some(store_path),
        })
    }

    /// Redacted profile summaries, ordered by creation time then id.
    ///
    /// The order is stable within a process lifetime and across restarts.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> =
            self.read().values().map(SessionInfo::summary).collect();
        summaries.sort_by(|a, b| {
            (a.created_at, a.session_id).cmp(&(b.created_at, b.session_id))
        });
        summaries
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<SessionInfo> {
        self.read().get(&id).cloned()
    }

    /// Look up by a caller-supplied identifier string.
    ///
    /// A malformed identifier is a miss, not an error: callers probe for
    /// existence all the time and must not be able to crash the process
    /// with garbage input.
    pub fn get_by_raw_id(&self, raw: &str) -> Option<SessionInfo> {
        let id = Uuid::from_str(raw.trim()).ok()?;
        self.get_by_id(id)
    }

    /// Insert or atomically replace the profile under `info.session_id`.
    ///
    /// Replacement is whole-value, not a field merge, and happens under a
    /// single write lock: no concurrent reader ever observes the id
    /// missing mid-replace. The original creation stamp survives a
    /// replace so listing order does not shift.
    pub fn upsert(&self, mut info: SessionInfo) -> io::Result<()> {
        let mut entries = self.write();
        if let Some(existing) = entries.get(&info.session_id) {
            info.created_at = existing.created_at;
        }
        entries.insert(info.session_id, info);
        self.flush(&entries)
    }

    /// Remove the profile under `id`; `false` if nothing was there.
    pub fn delete_by_id(&self, id: Uuid) -> io::Result<bool> {
        let mut entries = self.write();
        let removed = entries.shift_remove(&id).is_some();
        if removed {
            self.flush(&entries)?;
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Rewrite the backing file via a sibling temp file + rename, so a
    /// crash mid-write never leaves a truncated store behind.
    fn flush(&self, entries: &IndexMap<Uuid, SessionInfo>) -> io::Result<()> {
        let Some(store_path) = self.store_path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = store_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let profiles: Vec<&SessionInfo> = entries.values().collect();
        let bytes = serde_json::to_vec_pretty(&profiles).map_err(io::Error::other)?;
        let tmp_path = tmp_sibling(store_path);
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, store_path)
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<Uuid, SessionInfo>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<Uuid, SessionInfo>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn tmp_sibling(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    store_path.with_file_name(name)
}
