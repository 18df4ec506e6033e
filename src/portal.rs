//!
//! Portal application object
//! -------------------------
//! Wires the session store, access guard, dispatcher and navigator together and
//! runs the flows that span them:
//! - bootstrap from configuration (and optional expiry enforcement),
//! - login: request, decode, extract, persist, then navigate,
//! - logout and forced logout on any 401,
//! - guarded navigation and role-specific dashboard loading.

use std::future::Future;

use chrono::Utc;
use tracing::{info, warn};

use crate::api::{self, AnalyticsSummary, BorrowRequest, Dispatcher, Equipment, UserDetails};
use crate::config::PortalConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{
    decode_claims, extract_role, AccessGuard, FileBackend, MemoryBackend, Navigation, Role, Session, SessionBackend,
    SessionContext,
};
use crate::navigation::{nav_links, NavLink, Navigator};

/// Data behind each role's dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Dashboard {
    Admin { user: UserDetails, analytics: AnalyticsSummary, pending: Vec<BorrowRequest> },
    Staff { user: UserDetails, pending: Vec<BorrowRequest> },
    Student { user: UserDetails, available: Vec<Equipment>, history: Vec<BorrowRequest> },
}

impl Dashboard {
    pub fn user(&self) -> &UserDetails {
        match self {
            Dashboard::Admin { user, .. } | Dashboard::Staff { user, .. } | Dashboard::Student { user, .. } => user,
        }
    }

    /// Pending count shown to reviewers: analytics when present, else the queue length.
    pub fn pending_count(&self) -> Option<u64> {
        match self {
            Dashboard::Admin { analytics, pending, .. } => {
                Some(analytics.pending_requests_count.unwrap_or(pending.len() as u64))
            }
            Dashboard::Staff { pending, .. } => Some(pending.len() as u64),
            Dashboard::Student { .. } => None,
        }
    }
}

pub struct Portal {
    config: PortalConfig,
    session: SessionContext,
    dispatcher: Dispatcher,
    guard: AccessGuard,
    navigator: Navigator,
}

impl Portal {
    /// Build the portal with the backend named by `config.session_file`.
    pub fn bootstrap(config: PortalConfig) -> AppResult<Self> {
        let backend: Box<dyn SessionBackend> = match &config.session_file {
            Some(path) => Box::new(FileBackend::new(path.clone())),
            None => Box::new(MemoryBackend::new()),
        };
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: PortalConfig, backend: Box<dyn SessionBackend>) -> AppResult<Self> {
        config.validate()?;
        let session = SessionContext::new(backend);
        let dispatcher = Dispatcher::new(&config, session.clone())?;
        let guard = AccessGuard::with_paths(session.clone(), &config.login_path, &config.landing_path);
        let navigator = Navigator::new("/");
        let portal = Self { config, session, dispatcher, guard, navigator };
        portal.revalidate_stored_session()?;
        info!(
            target: "lendportal",
            "portal.bootstrap api={} persisted={} active={}",
            portal.config.api_base_url,
            portal.config.session_file.is_some(),
            portal.session.is_active().unwrap_or(false)
        );
        Ok(portal)
    }

    /// Drop a stored session that no longer decodes, or that has expired when
    /// expiry is enforced.
    fn revalidate_stored_session(&self) -> AppResult<()> {
        let Some(token) = self.session.credential()? else { return Ok(()) };
        let claims = match decode_claims(&token) {
            Ok(c) => c,
            Err(e) => {
                warn!(target: "lendportal", "portal.session stored credential unreadable, clearing: {}", e);
                return self.session.clear();
            }
        };
        if self.config.enforce_expiry && claims.is_expired(Utc::now()) {
            info!(target: "lendportal", "portal.session stored credential expired, clearing");
            return self.session.clear();
        }
        Ok(())
    }

    pub fn config(&self) -> &PortalConfig { &self.config }
    pub fn session(&self) -> &SessionContext { &self.session }
    pub fn dispatcher(&self) -> &Dispatcher { &self.dispatcher }
    pub fn guard(&self) -> &AccessGuard { &self.guard }
    pub fn navigator(&self) -> &Navigator { &self.navigator }

    /// Run a service call scoped to the current route. A 401 ends the session.
    pub async fn call<F, T>(&self, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match self.navigator.scoped(fut).await {
            Err(e) if e.is_session_fatal() => {
                warn!(target: "lendportal", "portal.call credential rejected, ending session: {}", e);
                if let Err(clear_err) = self.session.clear() {
                    warn!(target: "lendportal", "portal.call could not clear session: {}", clear_err);
                }
                self.navigator.go(&self.config.login_path);
                Err(e)
            }
            other => other,
        }
    }

    /// Log in and persist the session. The session is fully written before the
    /// navigation to the landing page.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        let resp = self.call(api::auth::login(&self.dispatcher, email, password)).await?;
        let token = resp.access_token;

        let claims = match decode_claims(&token) {
            Ok(c) => c,
            Err(e) => {
                self.session.clear()?;
                warn!(target: "lendportal", "portal.login credential rejected: {}", e);
                return Err(e.into());
            }
        };
        let Some(role) = extract_role(Some(&claims)) else {
            self.session.clear()?;
            warn!(target: "lendportal", "portal.login credential carries no portal role");
            return Err(AppError::extraction(
                "no_portal_role".to_string(),
                "account has no ADMIN, STAFF or STUDENT role".to_string(),
            ));
        };
        if self.config.enforce_expiry && claims.is_expired(Utc::now()) {
            self.session.clear()?;
            return Err(AppError::auth("credential_expired".to_string(), "issued credential has already expired".to_string()));
        }
        self.session.save(&token, role, None)?;

        // The id is needed for "my requests"; a failed lookup leaves it empty and
        // does not undo the login.
        let user_id = match self.call(api::users::me(&self.dispatcher)).await {
            Ok(u) => u.id.map(|id| id.to_string()),
            Err(e) if e.is_session_fatal() => {
                return Err(AppError::auth("unauthorized".to_string(), "backend rejected the new credential".to_string()));
            }
            Err(e) => {
                warn!(target: "lendportal", "portal.login user lookup failed, user id left empty: {}", e);
                None
            }
        };
        if user_id.is_some() {
            self.session.save(&token, role, user_id.as_deref())?;
        }

        info!(
            target: "lendportal",
            "portal.login user={} role={}",
            claims.preferred_username().unwrap_or("<unknown>"),
            role
        );
        self.navigator.go(&self.config.landing_path);
        Ok(Session { credential: token, role, user_id })
    }

    pub fn logout(&self) -> AppResult<()> {
        self.session.clear()?;
        self.navigator.go(&self.config.login_path);
        info!(target: "lendportal", "portal.logout");
        Ok(())
    }

    /// Apply the guard to `path` and move to wherever it leads.
    pub fn navigate(&self, path: &str) -> Navigation {
        let outcome = self.guard.check_path(path);
        match &outcome {
            Navigation::Render(m) => { self.navigator.go(&m.path); }
            Navigation::Redirect { to, .. } => { self.navigator.go(to); }
            Navigation::NotFound(_) => {}
        }
        outcome
    }

    pub fn nav_links(&self) -> Vec<NavLink> {
        let active = self.session.is_active().unwrap_or(false);
        let role = self.session.get_role().unwrap_or(None);
        nav_links(active, role)
    }

    fn current_role(&self) -> AppResult<Role> {
        if !self.session.is_active()? {
            return Err(AppError::auth("not_logged_in".to_string(), "log in first".to_string()));
        }
        self.session.get_role()?.ok_or_else(|| {
            AppError::extraction("unknown_role".to_string(), "stored session has no recognized role".to_string())
        })
    }

    pub async fn dashboard(&self) -> AppResult<Dashboard> {
        let role = self.current_role()?;
        let user = self.call(api::users::me(&self.dispatcher)).await?;
        let user_id = match user.id.as_ref().map(|id| id.to_string()) {
            Some(id) => Some(id),
            None => self.session.user_id()?,
        };
        let dash = match role {
            Role::Student => {
                let available = self.call(api::equipment::available(&self.dispatcher)).await?;
                let history = self
                    .call(api::requests::queue_for(&self.dispatcher, role, user_id.as_deref()))
                    .await?;
                Dashboard::Student { user, available, history }
            }
            Role::Staff => {
                let pending = self.call(api::requests::queue_for(&self.dispatcher, role, None)).await?;
                Dashboard::Staff { user, pending }
            }
            Role::Admin => {
                let pending = self.call(api::requests::queue_for(&self.dispatcher, role, None)).await?;
                let analytics = self.call(api::analytics::summary(&self.dispatcher)).await?;
                Dashboard::Admin { user, analytics, pending }
            }
        };
        Ok(dash)
    }
}

impl std::fmt::Debug for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portal").field("config", &self.config).field("route", &self.navigator.current()).finish()
    }
}
