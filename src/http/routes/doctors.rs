use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::domain::AccountView;
use crate::http::{ApiResult, SharedState};
use crate::ports::RecordStore;

pub async fn list<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<AccountView>>> {
    state.authorize(&headers).await?;
    let doctors = state.accounts.list_clinicians()?;
    Ok(Json(doctors.iter().map(AccountView::from).collect()))
}

pub async fn search<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    Path(license): Path<String>,
) -> ApiResult<Json<AccountView>> {
    state.authorize(&headers).await?;
    let doctor = state.accounts.find_clinician_by_license(&license)?;
    Ok(Json(AccountView::from(&doctor)))
}
