//! Last-used connection parameters per session, for reconnects within the
//! same browser session. Side collaborator of the core: nothing here is
//! consulted by handle operations.

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::session::ConnectionParams;

#[derive(Default)]
pub struct CredentialCache {
    entries: RwLock<HashMap<Uuid, ConnectionParams>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cached(&self, session_id: Uuid, params: ConnectionParams) {
        self.entries.write().insert(session_id, params);
    }

    pub fn get_cached(&self, session_id: &Uuid) -> Option<ConnectionParams> {
        self.entries.read().get(session_id).cloned()
    }

    pub fn forget(&self, session_id: &Uuid) {
        self.entries.write().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConnectionParams {
        serde_json::from_str(r#"{"user": "root", "password": "pw"}"#).unwrap()
    }

    #[test]
    fn test_cache_round_trip() {
        let cache = CredentialCache::new();
        let id = Uuid::new_v4();
        assert!(cache.get_cached(&id).is_none());
        cache.set_cached(id, params());
        assert_eq!(cache.get_cached(&id).unwrap().user, "root");
        cache.forget(&id);
        assert!(cache.get_cached(&id).is_none());
    }

    #[test]
    fn test_cache_is_per_session() {
        let cache = CredentialCache::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        cache.set_cached(a, params());
        assert!(cache.get_cached(&b).is_none());
    }
}
