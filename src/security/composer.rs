//! Wraps application routes with SAML2 login, logout, metadata and an
//! authentication guard.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use http::HeaderMap;
use tower_cookies::{CookieManagerLayer, Cookies};

use super::{
    PathPattern, SecurityError, SessionStore,
    routes::{self, SecurityState},
};
use crate::{
    config::PluginConfig,
    saml::{
        RegistrationError, RelyingPartyRegistrationBuilder, RelyingPartyRegistrationRepository,
        repository_from_builder,
    },
    utils::join_path,
};

/// Composes the security chain around an application [`Router`].
///
/// Every application route requires a live session unless its path matches
/// one of the excluded patterns. The SAML endpoints themselves are public.
pub struct SecurityChainComposer {
    state: SecurityState,
    excluded: Vec<PathPattern>,
}

#[derive(Clone)]
struct GuardState {
    security: SecurityState,
    excluded: Arc<[PathPattern]>,
}

impl SecurityChainComposer {
    pub fn new(
        repository: Arc<dyn RelyingPartyRegistrationRepository>,
        registration_id: impl Into<String>,
        excluded_prefix: &str,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            state: SecurityState {
                repository,
                registration_id: registration_id.into(),
                sessions,
            },
            excluded: vec![PathPattern::new(excluded_prefix)],
        }
    }

    /// Wire the composer from one configuration: the registration comes from
    /// [`RelyingPartyRegistrationBuilder`] and the IdP's context path is
    /// excluded from authentication.
    pub fn from_config(config: &PluginConfig) -> Result<Self, RegistrationError> {
        let builder = RelyingPartyRegistrationBuilder::from_config(config);
        let registration_id = builder.registration_id().to_string();
        let repository = repository_from_builder(builder, config.saml.lazy)?;
        let excluded_prefix = join_path(&config.keycloak.context_path, &["/**"]);
        let sessions = Arc::new(SessionStore::new(config.session.clone()));

        let mut composer = Self::new(repository, registration_id, &excluded_prefix, sessions);
        if composer.excluded.iter().any(PathPattern::matches_all) {
            tracing::warn!(
                context_path = %config.keycloak.context_path,
                "IdP context path covers every route; not excluding it from authentication"
            );
            composer.excluded.retain(|pattern| !pattern.matches_all());
        }
        Ok(composer)
    }

    /// Bypass authentication for another path pattern.
    pub fn exclude(mut self, pattern: &str) -> Self {
        self.excluded.push(PathPattern::new(pattern));
        self
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.state.sessions)
    }

    pub fn compose(self, app: Router) -> Router {
        tracing::info!(
            registration_id = %self.state.registration_id,
            excluded = ?self.excluded.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Composing SAML2 security chain"
        );

        let guard = GuardState {
            security: self.state.clone(),
            excluded: self.excluded.into(),
        };

        let saml_routes = Router::new()
            .route(routes::METADATA_PATH, get(routes::metadata))
            .route(routes::AUTHENTICATE_PATH, get(routes::authenticate))
            .route(routes::ACS_PATH, post(routes::assertion_consumer))
            .route(routes::LOGOUT_PATH, post(routes::logout))
            .route(
                routes::SLO_PATH,
                get(routes::single_logout_redirect).post(routes::single_logout_post),
            )
            .with_state(self.state);

        app.layer(middleware::from_fn_with_state(guard, require_authentication))
            .merge(saml_routes)
            .layer(CookieManagerLayer::new())
    }
}

/// Require a live session on every non-excluded request.
///
/// Browsers are redirected to the login endpoint; XHR/API requests get 401.
async fn require_authentication(
    State(guard): State<GuardState>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if guard.excluded.iter().any(|pattern| pattern.matches(path)) {
        return next.run(req).await;
    }

    // Set by CookieManagerLayer
    let session = req
        .extensions()
        .get::<Cookies>()
        .and_then(|cookies| guard.security.sessions.session_from_cookies(cookies));

    if let Some(session) = session {
        tracing::trace!(session_id = %session.id, path, "Authenticated request");
        req.extensions_mut().insert(session);
        return next.run(req).await;
    }

    if is_xhr_request(req.headers()) {
        return SecurityError::Unauthenticated.into_response();
    }

    let return_to = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let login_url = format!(
        "{}?return_to={}",
        guard.security.login_path(),
        url::form_urlencoded::byte_serialize(return_to.as_bytes()).collect::<String>()
    );

    tracing::debug!(path = %req.uri().path(), "Redirecting unauthenticated request to SAML login");
    Redirect::to(&login_url).into_response()
}

fn is_xhr_request(headers: &HeaderMap) -> bool {
    if headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
    {
        return true;
    }

    // JSON without HTML is an API client
    headers
        .get(http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json") && !accept.contains("text/html"))
}
