use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use super::parse_id;
use crate::domain::{Notification, NotificationId};
use crate::http::{ApiResult, SharedState};
use crate::ports::RecordStore;

pub async fn list<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Notification>>> {
    let caller = state.authorize(&headers).await?;
    Ok(Json(state.notifications.list(caller.account.id)?))
}

/// Always 200: already-read and unknown ids are not errors.
pub async fn mark_read<S: RecordStore + 'static>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let caller = state.authorize(&headers).await?;
    let id = NotificationId(parse_id(&id, "Invalid notification ID")?);

    state.notifications.mark_read(caller.account.id, id)?;
    Ok(Json(serde_json::json!({ "message": "Notification marked as read" })))
}
