//! Append-only session message log
//!
//! Each session's log lives under its code in the `messages` field of the
//! KV store. Writers for one session are serialized by a keyed mutex so a
//! concurrent append can never clobber another.

use std::sync::Arc;

use partydj_common::events::UserMessage;

use crate::error::Result;
use crate::models::SessionMessage;

use super::{KeyedLocks, KvStore};

/// KV field holding the message log
pub const MESSAGES_FIELD: &str = "messages";

/// Message log access by session code
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    locks: KeyedLocks,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            locks: KeyedLocks::new(),
        }
    }

    /// Append `message` and return the full updated log
    pub async fn append(&self, session_code: &str, message: SessionMessage) -> Result<Vec<SessionMessage>> {
        let _guard = self.locks.lock(session_code).await;

        let mut log = self.read_log(session_code).await?;
        log.push(message);
        self.kv
            .set(session_code, &[(MESSAGES_FIELD, serde_json::to_value(&log)?)])
            .await?;

        tracing::debug!(session_code = %session_code, length = log.len(), "Appended session message");
        Ok(log)
    }

    /// Full log, empty if the session has none yet
    pub async fn read_log(&self, session_code: &str) -> Result<Vec<SessionMessage>> {
        match self.kv.get(session_code, MESSAGES_FIELD).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Drop the session's log
    pub async fn delete(&self, session_code: &str) -> Result<()> {
        let _guard = self.locks.lock(session_code).await;
        self.kv.delete(session_code).await
    }
}

/// User-visible projection of a log
pub fn project_for_users(log: &[SessionMessage]) -> Vec<UserMessage> {
    log.iter().filter_map(SessionMessage::to_user_message).collect()
}
