use serde::{Deserialize, Serialize};

/// Longest accepted session lifetime (one year).
pub const MAX_SESSION_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Browser session configuration for SAML-authenticated users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Session cookie name.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Session duration in seconds.
    #[serde(default = "default_session_duration")]
    pub duration_secs: u64,

    /// Set the `Secure` attribute on the session cookie.
    #[serde(default = "default_true")]
    pub secure: bool,

    /// Upper bound on unanswered AuthnRequests held in memory.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            duration_secs: default_session_duration(),
            secure: true,
            max_pending: default_max_pending(),
        }
    }
}

impl SessionConfig {
    pub(super) fn validate(&self) -> Result<(), String> {
        if self.cookie_name.trim().is_empty() {
            return Err("session.cookie_name must not be empty".into());
        }
        if self.duration_secs == 0 || self.duration_secs > MAX_SESSION_DURATION_SECS {
            return Err(format!(
                "session.duration_secs must be between 1 and {}, got {}",
                MAX_SESSION_DURATION_SECS, self.duration_secs
            ));
        }
        if self.max_pending == 0 {
            return Err("session.max_pending must be at least 1".into());
        }
        Ok(())
    }
}

fn default_cookie_name() -> String {
    "__kc_plugin_session".to_string()
}

fn default_session_duration() -> u64 {
    60 * 60 * 8 // 8 hours
}

fn default_max_pending() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}
