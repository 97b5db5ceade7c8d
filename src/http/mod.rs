//! HTTP boundary: axum router, session handling and error mapping.
//!
//! Every route lives under `/api`. All of them except health, registration
//! and login require an `X-Session-Token` header.

mod error;
mod routes;
pub mod session;


use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;

pub use error::{ApiError, ApiResult};
pub use session::{SessionStore, SESSION_HEADER};

use crate::application::{
    AccessWorkflow, AccountService, AuthorizationGuard, NotificationEmitter, RecordService,
};
use crate::config::PortalConfig;
use crate::domain::Account;
use crate::ports::RecordStore;
use crate::PortalError;

pub type SharedState<S> = Arc<AppState<S>>;

pub struct AppState<S: RecordStore> {
    pub accounts: AccountService<S>,
    pub records: RecordService<S>,
    pub access: AccessWorkflow<S>,
    pub notifications: NotificationEmitter<S>,
    pub sessions: SessionStore,
}

/// An authenticated request: the presented token and its account.
pub struct Caller {
    pub token: String,
    pub account: Account,
}

impl<S: RecordStore> AppState<S> {
    pub fn new(store: Arc<S>, config: &PortalConfig) -> Self {
        let notifications = NotificationEmitter::new(Arc::clone(&store))
            .with_strict_ownership(config.strict_notification_ownership);
        let access = AccessWorkflow::new(Arc::clone(&store), notifications.clone());
        let guard = AuthorizationGuard::new(access.clone());

        Self {
            accounts: AccountService::new(Arc::clone(&store)),
            records: RecordService::new(store, guard),
            access,
            notifications,
            sessions: SessionStore::new(config.session_ttl),
        }
    }

    async fn authorize(&self, headers: &HeaderMap) -> ApiResult<Caller> {
        let token = extract_session_token(headers)?;
        let account_id = self
            .sessions
            .resolve(&token)
            .await
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

        let account = self.accounts.get(account_id).map_err(session_account_error)?;

        Ok(Caller { token, account })
    }
}

/// A session whose account is gone is unauthenticated; a failing store is a
/// server error and goes through the logged 500 path.
fn session_account_error(err: PortalError) -> ApiError {
    match err {
        PortalError::NotFound(_) => ApiError::unauthorized("Unauthorized"),
        other => ApiError::from(other),
    }
}

fn extract_session_token(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(SESSION_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?
        .to_str()
        .map(str::to_string)
        .map_err(|_| ApiError::unauthorized("Invalid session token format"))
}

/// Build the `/api` router.
pub fn router<S: RecordStore + 'static>(state: SharedState<S>) -> Router {
    use routes::{access, auth, doctors, notifications, records};

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/register", post(auth::register::<S>))
        .route("/api/login", post(auth::login::<S>))
        .route("/api/logout", post(auth::logout::<S>))
        .route("/api/user", get(auth::current_user::<S>))
        .route("/api/doctors", get(doctors::list::<S>))
        .route("/api/doctors/register", post(auth::register_doctor::<S>))
        .route("/api/doctors/search/:license", get(doctors::search::<S>))
        .route(
            "/api/doctor-access",
            get(access::list_grants::<S>).post(access::request::<S>),
        )
        .route("/api/doctor-access/requests", get(access::pending::<S>))
        .route(
            "/api/doctor-access/:id",
            axum::routing::delete(access::revoke::<S>),
        )
        .route("/api/doctor-access/:id/respond", post(access::respond::<S>))
        .route("/api/patients", get(access::patients::<S>))
        .route(
            "/api/medical-history",
            get(records::own_history::<S>).post(records::add_history::<S>),
        )
        .route("/api/medical-history/:user_id", get(records::history_of::<S>))
        .route(
            "/api/vaccines",
            get(records::own_vaccines::<S>).post(records::add_vaccine::<S>),
        )
        .route("/api/vaccines/:user_id", get(records::vaccines_of::<S>))
        .route(
            "/api/family-members",
            get(records::family_members::<S>).post(records::add_family_member::<S>),
        )
        .route("/api/notifications", get(notifications::list::<S>))
        .route("/api/notifications/:id/read", post(notifications::mark_read::<S>))
        .with_state(state)
}
