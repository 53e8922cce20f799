//! Cookie-backed in-memory sessions for SAML-authenticated users.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tower_cookies::{
    Cookie, Cookies,
    cookie::{SameSite, time::Duration as CookieDuration},
};
use uuid::Uuid;

use crate::config::SessionConfig;

/// How long an AuthnRequest may stay unanswered.
pub const PENDING_AUTHENTICATION_TTL_SECS: i64 = 10 * 60;

/// An authenticated browser session.
#[derive(Debug, Clone)]
pub struct SamlSession {
    pub id: Uuid,
    pub registration_id: String,
    /// NameID of the authenticated subject.
    pub name_id: String,
    /// SessionIndex from the AuthnStatement, sent back on logout.
    pub session_index: Option<String>,
    pub attributes: HashMap<String, Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SamlSession {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// First value of an assertion attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// An AuthnRequest awaiting the IdP's response, keyed by RelayState.
#[derive(Debug, Clone)]
pub struct PendingAuthentication {
    pub relay_state: String,
    pub request_id: String,
    pub registration_id: String,
    pub return_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingAuthentication {
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.created_at > Duration::seconds(PENDING_AUTHENTICATION_TTL_SECS)
    }
}

/// In-memory session store.
///
/// Sessions are lost on restart and not shared across processes.
#[derive(Debug)]
pub struct SessionStore {
    config: SessionConfig,
    sessions: DashMap<Uuid, SamlSession>,
    pending: DashMap<String, PendingAuthentication>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
            pending: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn create(
        &self,
        registration_id: &str,
        name_id: String,
        session_index: Option<String>,
        attributes: HashMap<String, Vec<String>>,
    ) -> SamlSession {
        let now = Utc::now();
        let session = SamlSession {
            id: Uuid::new_v4(),
            registration_id: registration_id.to_string(),
            name_id,
            session_index,
            attributes,
            created_at: now,
            expires_at: expiry_after(now, self.config.duration_secs),
        };
        self.sessions.insert(session.id, session.clone());
        session
    }

    /// Live session with the given id. Expired sessions are evicted.
    pub fn get(&self, id: Uuid) -> Option<SamlSession> {
        let session = self.sessions.get(&id).map(|s| s.clone())?;
        if session.is_expired() {
            self.sessions.remove(&id);
            return None;
        }
        Some(session)
    }

    pub fn remove(&self, id: Uuid) -> Option<SamlSession> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remember an outstanding AuthnRequest.
    ///
    /// At `max_pending` entries, stale entries are swept first and then the
    /// oldest request is evicted.
    pub fn store_pending(&self, pending: PendingAuthentication) {
        if self.pending.len() >= self.config.max_pending {
            self.pending.retain(|_, p| !p.is_expired());
        }
        while self.pending.len() >= self.config.max_pending {
            let oldest = self
                .pending
                .iter()
                .min_by_key(|entry| entry.created_at)
                .map(|entry| entry.key().clone());
            let Some(oldest) = oldest else { break };
            tracing::debug!(relay_state = %oldest, "Evicting oldest pending authentication");
            self.pending.remove(&oldest);
        }
        self.pending.insert(pending.relay_state.clone(), pending);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Remove and return a pending request. Stale entries yield `None`.
    pub fn take_pending(&self, relay_state: &str) -> Option<PendingAuthentication> {
        let (_, pending) = self.pending.remove(relay_state)?;
        if pending.is_expired() {
            tracing::debug!(relay_state, "Discarding expired pending authentication");
            return None;
        }
        Some(pending)
    }

    /// Drop expired sessions and stale pending requests.
    pub fn cleanup(&self) {
        self.sessions.retain(|_, s| !s.is_expired());
        self.pending.retain(|_, p| !p.is_expired());
    }

    /// Session referenced by the request's session cookie, if still live.
    pub fn session_from_cookies(&self, cookies: &Cookies) -> Option<SamlSession> {
        let cookie = cookies.get(&self.config.cookie_name)?;
        let id = cookie.value().parse::<Uuid>().ok()?;
        self.get(id)
    }

    pub fn session_cookie(&self, session: &SamlSession) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), session.id.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.config.secure)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(
                i64::try_from(self.config.duration_secs).unwrap_or(i64::MAX),
            ))
            .build()
    }

    /// Removal cookie with the same attributes as the session cookie.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build(self.config.cookie_name.clone())
            .path("/")
            .http_only(true)
            .secure(self.config.secure)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::ZERO)
            .build()
    }
}

/// `now + secs`, saturating at the latest representable instant.
fn expiry_after(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
