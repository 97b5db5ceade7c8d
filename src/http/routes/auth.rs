//! Registration, login, logout and the current-user endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::domain::{Account, AccountView, ClinicianRegistration, Password, Registration};
use crate::http::{ApiError, ApiResult, SharedState, SESSION_HEADER};
use crate::ports::RecordStore;
use crate::PortalError;

type SessionResponse = ([(&'static str, String); 1], Json<AccountView>);

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: Password,
}

pub async fn register<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, SessionResponse)> {
    let Json(registration) = payload?;
    let accounts = state.accounts.clone();

    let account = tokio::task::spawn_blocking(move || accounts.register(registration))
        .await
        .map_err(ApiError::internal)??;

    Ok((StatusCode::CREATED, open_session(&state, &account).await))
}

pub async fn register_doctor<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<ClinicianRegistration>, JsonRejection>,
) -> ApiResult<(StatusCode, SessionResponse)> {
    let Json(registration) = payload?;
    let accounts = state.accounts.clone();

    let account = tokio::task::spawn_blocking(move || accounts.register_clinician(registration))
        .await
        .map_err(ApiError::internal)??;

    Ok((StatusCode::CREATED, open_session(&state, &account).await))
}

pub async fn login<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<SessionResponse> {
    let Json(request) = payload?;
    let accounts = state.accounts.clone();

    let account = tokio::task::spawn_blocking(move || {
        accounts.authenticate(&request.username, &request.password)
    })
    .await
    .map_err(ApiError::internal)?
    .map_err(|e| match e {
        PortalError::Unauthorized => ApiError::unauthorized("Invalid username or password"),
        other => other.into(),
    })?;

    Ok(open_session(&state, &account).await)
}

pub async fn logout<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let caller = state.authorize(&headers).await?;
    state.sessions.revoke(&caller.token).await;
    tracing::info!("Account {} logged out", caller.account.id);

    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}

pub async fn current_user<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<AccountView>> {
    let caller = state.authorize(&headers).await?;
    Ok(Json(AccountView::from(&caller.account)))
}

async fn open_session<S: RecordStore>(state: &SharedState<S>, account: &Account) -> SessionResponse {
    let token = state.sessions.create(account.id).await;
    ([(SESSION_HEADER, token)], Json(AccountView::from(account)))
}
