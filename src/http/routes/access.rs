//! Doctor access grants: request, respond, revoke and listings.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::parse_id;
use crate::application::PendingRequest;
use crate::domain::{AccessGrant, AccountId, AccountView, GrantId};
use crate::http::{ApiError, ApiResult, SharedState};
use crate::ports::RecordStore;

/// Target a clinician by license number (what the web client sends) or by
/// account id.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestBody {
    #[serde(default)]
    license_number: Option<String>,
    #[serde(default)]
    doctor_id: Option<i64>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct RespondBody {
    accepted: bool,
}

pub async fn request<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    payload: Result<Json<AccessRequestBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AccessGrant>)> {
    let caller = state.authorize(&headers).await?;
    if caller.account.is_clinician() {
        return Err(ApiError::forbidden("Doctors cannot grant access"));
    }
    let Json(body) = payload?;

    let grant = match (body.license_number.as_deref(), body.doctor_id) {
        (Some(license), None) => {
            state
                .access
                .request_access_by_license(&caller.account, license, body.expires_at)?
        }
        (None, Some(doctor_id)) => {
            state
                .access
                .request_access(&caller.account, AccountId(doctor_id), body.expires_at)?
        }
        _ => {
            return Err(ApiError::bad_request(
                "Provide exactly one of licenseNumber or doctorId",
            ))
        }
    };

    Ok((StatusCode::CREATED, Json(grant)))
}

pub async fn respond<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<RespondBody>, JsonRejection>,
) -> ApiResult<Json<AccessGrant>> {
    let caller = state.authorize(&headers).await?;
    if !caller.account.is_clinician() {
        return Err(ApiError::forbidden(
            "Only doctors can respond to access requests",
        ));
    }
    let grant_id = GrantId(parse_id(&id, "Invalid request ID")?);
    let Json(body) = payload?;

    let grant = state
        .access
        .respond(&caller.account, grant_id, body.accepted)?;
    Ok(Json(grant))
}

pub async fn revoke<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let caller = state.authorize(&headers).await?;
    if caller.account.is_clinician() {
        return Err(ApiError::forbidden("Doctors cannot revoke access"));
    }
    let doctor_id = AccountId(parse_id(&id, "Invalid doctor ID")?);

    let revoked = state.access.revoke(&caller.account, doctor_id)?;
    Ok(Json(serde_json::json!({
        "message": "Access revoked",
        "revoked": revoked,
    })))
}

pub async fn list_grants<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<AccessGrant>>> {
    let caller = state.authorize(&headers).await?;
    Ok(Json(state.access.grants_for(&caller.account)?))
}

pub async fn pending<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<PendingRequest>>> {
    let caller = state.authorize(&headers).await?;
    Ok(Json(state.access.pending_requests(&caller.account)?))
}

pub async fn patients<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<AccountView>>> {
    let caller = state.authorize(&headers).await?;
    let patients = state.access.patients(&caller.account)?;
    Ok(Json(patients.iter().map(AccountView::from).collect()))
}
