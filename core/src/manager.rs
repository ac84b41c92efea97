//! Materializes runtime [`Session`]s from stored profiles.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use husk_protocol::SessionInfo;
use uuid::Uuid;

use crate::config::HuskConfig;
use crate::registry::SessionRegistry;
use crate::session::Session;

/// Owns the registry, the shared HTTP client, and a cache of bound
/// sessions.
///
/// Sessions are cheap to build but there is no reason to rebuild one per
/// call; the cache hands out the same `Arc<Session>` until the underlying
/// profile is replaced or deleted, at which point the binding is dropped.
pub struct SessionManager {
    config: HuskConfig,
    client: reqwest::Client,
    registry: Arc<SessionRegistry>,
    bound: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(config: HuskConfig, registry: SessionRegistry) -> io::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(io::Error::other)?;
        Ok(Self {
            config,
            client,
            registry: Arc::new(registry),
            bound: RwLock::new(HashMap::new()),
        })
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Materialize the session for a stored profile, reusing a prior
    /// binding when the profile has not changed.
    pub fn open_session(&self, id: Uuid) -> Option<Arc<Session>> {
        if let Some(session) = self.bound_read().get(&id) {
            return Some(Arc::clone(session));
        }
        let info = self.registry.get_by_id(id)?;
        let session = Arc::new(Session::bind(info, &self.client, &self.config));
        self.bound_write().insert(id, Arc::clone(&session));
        Some(session)
    }

    /// [`Self::open_session`] with caller-supplied identifier text;
    /// malformed identifiers are a miss.
    pub fn open_session_raw(&self, raw: &str) -> Option<Arc<Session>> {
        let info = self.registry.get_by_raw_id(raw)?;
        self.open_session(info.session_id)
    }

    /// Bind a profile without storing it; the "test before saving" flow.
    pub fn session_for(&self, info: SessionInfo) -> Session {
        Session::bind(info, &self.client, &self.config)
    }

    /// Insert or replace a profile, dropping any stale binding for it.
    pub fn upsert(&self, info: SessionInfo) -> io::Result<()> {
        let id = info.session_id;
        self.registry.upsert(info)?;
        self.bound_write().remove(&id);
        Ok(())
    }

    /// Delete a profile and its binding; `false` if nothing was there.
    pub fn delete(&self, id: Uuid) -> io::Result<bool> {
        let removed = self.registry.delete_by_id(id)?;
        if removed {
            self.bound_write().remove(&id);
        }
        Ok(removed)
    }

    fn bound_read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Arc<Session>>> {
        self.bound.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn bound_write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Arc<Session>>> {
        self.bound.write().unwrap_or_else(PoisonError::into_inner)
    }
}
