use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SESSION_TTL_HOURS;
use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token_hash: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token_hash: &str, user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            token_hash: token_hash.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

impl Store {
    pub fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        let key = keys::session_key(&session.token_hash);
        self.sessions
            .insert(key.as_bytes(), Self::serialize(session)?)?;
        Ok(())
    }

    /// Expired sessions read as absent; the row itself is removed lazily here
    /// or by the cleanup worker, whichever comes first.
    pub fn get_session(&self, token_hash: &str) -> Result<Option<Session>, StoreError> {
        let key = keys::session_key(token_hash);
        match self.sessions.get(key.as_bytes())? {
            Some(raw) => {
                let session: Session = Self::deserialize(&raw)?;
                if session.is_expired() {
                    let _ = self.sessions.remove(key.as_bytes());
                    Ok(None)
                } else {
                    Ok(Some(session))
                }
            }
            None => Ok(None),
        }
    }

    pub fn delete_session(&self, token_hash: &str) -> Result<(), StoreError> {
        let key = keys::session_key(token_hash);
        self.sessions.remove(key.as_bytes())?;
        Ok(())
    }

    pub fn cleanup_expired_sessions(&self) -> Result<usize, StoreError> {
        let mut removed = 0usize;
        for item in self.sessions.iter() {
            let (key, value) = item?;
            let session: Session = Self::deserialize(&value)?;
            if session.is_expired() {
                self.sessions.remove(key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
