use axum::{
    extract::{Json, Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    responses::JsonResponse,
    routes::auth::session::{AuthSession, TeamSession},
    state::AppState,
};

pub async fn list_notices(
    State(state): State<AppState>,
    AuthSession(_claims): AuthSession,
) -> Response {
    match state.notices.list().await {
        Ok(notices) => Json(notices).into_response(),
        Err(e) => {
            tracing::error!(operation = "list_notices", error = ?e, "notice list failed");
            JsonResponse::server_error("Could not list notices").into_response()
        }
    }
}

pub async fn get_notice(
    State(state): State<AppState>,
    AuthSession(_claims): AuthSession,
    Path(notice_id): Path<Uuid>,
) -> Response {
    match state.notices.find(notice_id).await {
        Ok(Some(notice)) => Json(notice).into_response(),
        Ok(None) => JsonResponse::not_found("Notice not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "get_notice", %notice_id, error = ?e, "notice lookup failed");
            JsonResponse::server_error("Could not load the notice").into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct NoticePayload {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_pinned: bool,
}

pub async fn create_notice(
    State(state): State<AppState>,
    TeamSession(claims): TeamSession,
    Json(payload): Json<NoticePayload>,
) -> Response {
    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return JsonResponse::bad_request("Title and content are required").into_response();
    }

    let author_id = match Uuid::parse_str(&claims.id) {
        Ok(id) => id,
        Err(_) => return JsonResponse::unauthorized("Invalid user ID").into_response(),
    };

    match state
        .notices
        .insert(
            payload.title.trim(),
            payload.content.trim(),
            payload.is_pinned,
            author_id,
        )
        .await
    {
        Ok(notice) => (
            axum::http::StatusCode::CREATED,
            Json(json!({ "message": "Notice created", "notice": notice })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(operation = "create_notice", error = ?e, "notice insert failed");
            JsonResponse::server_error("Could not create the notice").into_response()
        }
    }
}

pub async fn update_notice(
    State(state): State<AppState>,
    TeamSession(_claims): TeamSession,
    Path(notice_id): Path<Uuid>,
    Json(payload): Json<NoticePayload>,
) -> Response {
    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return JsonResponse::bad_request("Title and content are required").into_response();
    }

    match state
        .notices
        .update(
            notice_id,
            payload.title.trim(),
            payload.content.trim(),
            payload.is_pinned,
        )
        .await
    {
        Ok(Some(notice)) => {
            Json(json!({ "message": "Notice updated", "notice": notice })).into_response()
        }
        Ok(None) => JsonResponse::not_found("Notice not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "update_notice", %notice_id, error = ?e, "notice update failed");
            JsonResponse::server_error("Could not update the notice").into_response()
        }
    }
}

pub async fn delete_notice(
    State(state): State<AppState>,
    TeamSession(_claims): TeamSession,
    Path(notice_id): Path<Uuid>,
) -> Response {
    match state.notices.delete(notice_id).await {
        Ok(true) => JsonResponse::success("Notice deleted").into_response(),
        Ok(false) => JsonResponse::not_found("Notice not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "delete_notice", %notice_id, error = ?e, "notice delete failed");
            JsonResponse::server_error("Could not delete the notice").into_response()
        }
    }
}
