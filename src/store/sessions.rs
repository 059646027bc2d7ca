use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::user::Identity;

#[derive(Debug, Clone)]
struct Session {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

/// Opaque bearer tokens mapped to the identity they authenticate.
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn issue(&self, identity: Identity) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.insert(
            token,
            Session {
                identity,
                expires_at: Utc::now() + self.ttl,
            },
        );
        token
    }

    pub fn resolve(&self, token: Uuid) -> Option<Identity> {
        let now = Utc::now();
        let identity = {
            let session = self.sessions.get(&token)?;
            (session.expires_at >= now).then_some(session.identity)
        };
        if identity.is_none() {
            self.sessions.remove(&token);
        }
        identity
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at >= now);
        before.saturating_sub(self.sessions.len())
    }
}
