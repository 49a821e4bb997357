//! Session-keyed store of connection handles.
//!
//! The registry is the only place where handle lifecycle state is mutated;
//! it is injected into the dispatcher rather than living in a global.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::session::ConnectionHandle;
use crate::{MyBridgeError, Result};

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<ConnectionHandle>>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Store a handle for a session. An existing handle for the same session
    /// is torn down first; teardown failures are logged, never raised.
    pub async fn bind(&self, session_id: Uuid, handle: Arc<ConnectionHandle>) -> Result<()> {
        let displaced = {
            let mut sessions = self.sessions.write();
            if !sessions.contains_key(&session_id) && sessions.len() >= self.max_sessions {
                return Err(MyBridgeError::Protocol(format!(
                    "Maximum session limit ({}) reached",
                    self.max_sessions
                )));
            }
            sessions.insert(session_id, handle)
        };
        if let Some(old) = displaced {
            info!("replacing existing connection for session {session_id}");
            if let Err(e) = old.disconnect().await {
                warn!("failed to disconnect displaced handle for session {session_id}: {e}");
            }
        }
        Ok(())
    }

    pub fn lookup(&self, session_id: &Uuid) -> Option<Arc<ConnectionHandle>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Remove and tear down the session's handle, if any. Returns whether a
    /// handle was present.
    pub async fn unbind(&self, session_id: &Uuid) -> bool {
        let removed = self.sessions.write().remove(session_id);
        match removed {
            Some(handle) => {
                if let Err(e) = handle.disconnect().await {
                    warn!("failed to disconnect handle for session {session_id}: {e}");
                }
                info!(
                    "removed connection for session {session_id} (remaining sessions: {})",
                    self.active_sessions()
                );
                true
            }
            None => false,
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }
}
