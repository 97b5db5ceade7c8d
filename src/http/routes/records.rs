//! Medical history, vaccine and family-member endpoints.
//!
//! `POST` always writes to the caller. `GET /{user_id}` reads another
//! account through the authorization guard.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::parse_id;
use crate::domain::{
    AccountId, FamilyMember, MedicalHistoryEntry, NewFamilyMember, NewMedicalHistory, NewVaccine,
    VaccineEntry,
};
use crate::http::{ApiResult, SharedState};
use crate::ports::RecordStore;

pub async fn own_history<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<MedicalHistoryEntry>>> {
    let caller = state.authorize(&headers).await?;
    Ok(Json(state.records.medical_history(&caller.account, None)?))
}

pub async fn history_of<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<MedicalHistoryEntry>>> {
    let caller = state.authorize(&headers).await?;
    let owner = AccountId(parse_id(&user_id, "Invalid user ID")?);
    Ok(Json(state.records.medical_history(&caller.account, Some(owner))?))
}

pub async fn add_history<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    payload: Result<Json<NewMedicalHistory>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MedicalHistoryEntry>)> {
    let caller = state.authorize(&headers).await?;
    let Json(entry) = payload?;
    let created = state.records.add_medical_history(&caller.account, entry)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn own_vaccines<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<VaccineEntry>>> {
    let caller = state.authorize(&headers).await?;
    Ok(Json(state.records.vaccines(&caller.account, None)?))
}

pub async fn vaccines_of<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<VaccineEntry>>> {
    let caller = state.authorize(&headers).await?;
    let owner = AccountId(parse_id(&user_id, "Invalid user ID")?);
    Ok(Json(state.records.vaccines(&caller.account, Some(owner))?))
}

pub async fn add_vaccine<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    payload: Result<Json<NewVaccine>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<VaccineEntry>)> {
    let caller = state.authorize(&headers).await?;
    let Json(vaccine) = payload?;
    let created = state.records.add_vaccine(&caller.account, vaccine)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn family_members<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<FamilyMember>>> {
    let caller = state.authorize(&headers).await?;
    Ok(Json(state.records.family_members(&caller.account)?))
}

pub async fn add_family_member<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    payload: Result<Json<NewFamilyMember>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<FamilyMember>)> {
    let caller = state.authorize(&headers).await?;
    let Json(member) = payload?;
    let created = state.records.add_family_member(&caller.account, member)?;
    Ok((StatusCode::CREATED, Json(created)))
}
