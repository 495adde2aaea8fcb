use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    models::user::UserRole,
    responses::JsonResponse,
    routes::auth::session::{AuthSession, TeamSession},
    state::AppState,
};

/// Pulls the first file field out of the multipart body and pushes it to the
/// blob store. An upload failure here is fatal: nothing references the blob
/// yet, so the caller just retries.
async fn store_upload(state: &AppState, mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.file_name().is_none() {
            continue;
        }
        let original_name = field
            .file_name()
            .unwrap_or("upload")
            .to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(operation = "upload", error = %e, "failed to read upload body");
                return JsonResponse::bad_request("Could not read the uploaded file")
                    .into_response();
            }
        };

        return match state.blobs.store(bytes.to_vec(), &original_name).await {
            Ok(blob) => Json(blob).into_response(),
            Err(e) => {
                tracing::error!(operation = "upload", file = %original_name, error = %e, "blob store failed");
                JsonResponse::server_error("File upload failed").into_response()
            }
        };
    }

    JsonResponse::bad_request("A file field is required").into_response()
}

pub async fn upload_ticket_file(
    State(state): State<AppState>,
    AuthSession(_claims): AuthSession,
    multipart: Multipart,
) -> Response {
    store_upload(&state, multipart).await
}

pub async fn upload_reply_file(
    State(state): State<AppState>,
    AuthSession(_claims): AuthSession,
    multipart: Multipart,
) -> Response {
    store_upload(&state, multipart).await
}

/// Removes a ticket attachment. The blob delete is best-effort; the row goes
/// away regardless.
pub async fn delete_ticket_file(
    State(state): State<AppState>,
    TeamSession(_claims): TeamSession,
    Path(file_id): Path<Uuid>,
) -> Response {
    let file = match state.tickets.find_ticket_file(file_id).await {
        Ok(Some(file)) => file,
        Ok(None) => return JsonResponse::not_found("File not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "delete_ticket_file", %file_id, error = ?e, "file lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    if let Some(public_id) = &file.public_id {
        if let Err(e) = state.blobs.delete(public_id).await {
            tracing::error!(operation = "delete_ticket_file", %file_id, error = %e, "blob delete failed");
        }
    }

    if let Err(e) = state.tickets.delete_ticket_file(file_id).await {
        tracing::error!(operation = "delete_ticket_file", %file_id, error = ?e, "row delete failed");
        return JsonResponse::server_error("Could not delete the file").into_response();
    }

    JsonResponse::success("File deleted").into_response()
}

/// Reply attachments may be removed by the reply's author or an admin.
pub async fn delete_reply_file(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(file_id): Path<Uuid>,
) -> Response {
    let file = match state.tickets.find_reply_file(file_id).await {
        Ok(Some(file)) => file,
        Ok(None) => return JsonResponse::not_found("File not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "delete_reply_file", %file_id, error = ?e, "file lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    if claims.id != file.author_id.to_string() && claims.role != UserRole::Admin {
        return JsonResponse::forbidden("No permission to delete this file").into_response();
    }

    if let Some(public_id) = &file.public_id {
        if let Err(e) = state.blobs.delete(public_id).await {
            tracing::error!(operation = "delete_reply_file", %file_id, error = %e, "blob delete failed");
        }
    }

    if let Err(e) = state.tickets.delete_reply_file(file_id).await {
        tracing::error!(operation = "delete_reply_file", %file_id, error = ?e, "row delete failed");
        return JsonResponse::server_error("Could not delete the file").into_response();
    }

    JsonResponse::success("File deleted").into_response()
}
