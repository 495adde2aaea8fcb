use axum::{
    extract::{Json, Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    models::{ticket::FileRef, user::UserRole},
    responses::JsonResponse,
    routes::auth::claims::Claims,
    routes::auth::session::AuthSession,
    state::AppState,
};

#[derive(Deserialize)]
pub struct AddReplyPayload {
    pub message: Option<String>,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

/// A reply needs a message, at least one file, or both. Replies do not send
/// email; customers see them through the unread badge instead.
pub async fn add_reply(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<AddReplyPayload>,
) -> Response {
    let author_id = match Uuid::parse_str(&claims.id) {
        Ok(id) => id,
        Err(_) => return JsonResponse::unauthorized("Invalid user ID").into_response(),
    };

    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    if message.is_none() && payload.files.is_empty() {
        return JsonResponse::bad_request("A message or at least one file is required")
            .into_response();
    }

    let reply = match state.tickets.insert_reply(ticket_id, author_id, message).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(operation = "add_reply", %ticket_id, error = ?e, "reply insert failed");
            return JsonResponse::server_error("Could not add the reply").into_response();
        }
    };

    for file in &payload.files {
        if let Err(e) = state.tickets.attach_reply_file(reply.id, file).await {
            tracing::error!(
                operation = "add_reply",
                reply_id = %reply.id,
                file = %file.original_name,
                error = ?e,
                "file attach failed"
            );
        }
    }

    (
        axum::http::StatusCode::CREATED,
        Json(json!({ "message": "Reply added", "reply_id": reply.id })),
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct EditReplyPayload {
    pub message: String,
}

fn is_author_or_admin(claims: &Claims, author_id: Uuid) -> bool {
    claims.id == author_id.to_string() || claims.role == UserRole::Admin
}

pub async fn edit_reply(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path((ticket_id, reply_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<EditReplyPayload>,
) -> Response {
    if payload.message.trim().is_empty() {
        return JsonResponse::bad_request("Message is required").into_response();
    }

    let reply = match state.tickets.find_reply(ticket_id, reply_id).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return JsonResponse::not_found("Reply not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "edit_reply", %reply_id, error = ?e, "reply lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    // Author or admin; a non-author itsm_team member is refused.
    if !is_author_or_admin(&claims, reply.author_id) {
        return JsonResponse::forbidden("No permission to edit this reply").into_response();
    }

    if let Err(e) = state.tickets.update_reply(reply_id, payload.message.trim()).await {
        tracing::error!(operation = "edit_reply", %reply_id, error = ?e, "reply update failed");
        return JsonResponse::server_error("Could not update the reply").into_response();
    }

    JsonResponse::success("Reply updated").into_response()
}

pub async fn delete_reply(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path((ticket_id, reply_id)): Path<(Uuid, Uuid)>,
) -> Response {
    let reply = match state.tickets.find_reply(ticket_id, reply_id).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return JsonResponse::not_found("Reply not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "delete_reply", %reply_id, error = ?e, "reply lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    if !is_author_or_admin(&claims, reply.author_id) {
        return JsonResponse::forbidden("No permission to delete this reply").into_response();
    }

    if let Err(e) = state.tickets.delete_reply(reply_id).await {
        tracing::error!(operation = "delete_reply", %reply_id, error = ?e, "reply delete failed");
        return JsonResponse::server_error("Could not delete the reply").into_response();
    }

    JsonResponse::success("Reply deleted").into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::Request,
        http::{header, Method, StatusCode},
        routing::{post, put},
        Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::{
        db::mock_db::{user_fixture, MemoryTickets, MockAccessRequests, MockUsers},
        db::ticket_repository::TicketRepository,
        models::ticket::Urgency,
        models::user::UserRole,
        routes::auth::session::tests::make_jwt_for,
        routes::tickets::crud::tests::new_ticket,
        services::notifier::MockNotifier,
        state::test_support,
    };

    use super::{add_reply, delete_reply, edit_reply};

    fn build_app(tickets: Arc<MemoryTickets>) -> Router {
        let state = test_support::state(
            Arc::new(MockUsers::default()),
            Arc::new(MockAccessRequests::default()),
            tickets,
            Arc::new(MockNotifier::default()),
        );

        Router::new()
            .route("/tickets/{id}/replies", post(add_reply))
            .route(
                "/tickets/{id}/replies/{reply_id}",
                put(edit_reply).delete(delete_reply),
            )
            .with_state(state)
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        actor: uuid::Uuid,
        role: UserRole,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", make_jwt_for(actor, role)),
            );
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn reply_requires_message_or_files() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let tickets = Arc::new(MemoryTickets::default());
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        let app = build_app(tickets.clone());

        let res = send(
            app.clone(),
            Method::POST,
            &format!("/tickets/{}/replies", ticket.id),
            customer.id,
            UserRole::Customer,
            Some(json!({ "message": "   " })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(tickets.replies.lock().unwrap().is_empty());

        // Files alone are enough.
        let res = send(
            app,
            Method::POST,
            &format!("/tickets/{}/replies", ticket.id),
            customer.id,
            UserRole::Customer,
            Some(json!({
                "files": [{
                    "url": "https://cdn.example.com/reply_files/x",
                    "original_name": "log.txt",
                    "public_id": "reply_files/x",
                    "size": 99
                }]
            })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(tickets.replies.lock().unwrap().len(), 1);
        assert_eq!(tickets.reply_files.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn author_can_edit_own_reply() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let tickets = Arc::new(MemoryTickets::default());
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        let reply = tickets
            .insert_reply(ticket.id, customer.id, Some("첫 답변"))
            .await
            .unwrap();
        let app = build_app(tickets.clone());

        let res = send(
            app,
            Method::PUT,
            &format!("/tickets/{}/replies/{}", ticket.id, reply.id),
            customer.id,
            UserRole::Customer,
            Some(json!({ "message": "수정된 답변" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            tickets.replies.lock().unwrap()[0].message.as_deref(),
            Some("수정된 답변")
        );
    }

    #[tokio::test]
    async fn non_author_team_member_cannot_edit_or_delete() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let author = user_fixture("author@example.com", UserRole::Customer);
        let teammate = user_fixture("teammate@example.com", UserRole::ItsmTeam);
        let tickets = Arc::new(MemoryTickets::default());
        let ticket = tickets
            .insert_ticket(&new_ticket(&author, Urgency::Normal))
            .await
            .unwrap();
        let reply = tickets
            .insert_reply(ticket.id, author.id, Some("고객 답변"))
            .await
            .unwrap();
        let app = build_app(tickets.clone());

        let res = send(
            app.clone(),
            Method::PUT,
            &format!("/tickets/{}/replies/{}", ticket.id, reply.id),
            teammate.id,
            UserRole::ItsmTeam,
            Some(json!({ "message": "변조 시도" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = send(
            app,
            Method::DELETE,
            &format!("/tickets/{}/replies/{}", ticket.id, reply.id),
            teammate.id,
            UserRole::ItsmTeam,
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(tickets.replies.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn admin_can_delete_any_reply() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let author = user_fixture("author@example.com", UserRole::Customer);
        let admin = user_fixture("admin@example.com", UserRole::Admin);
        let tickets = Arc::new(MemoryTickets::default());
        let ticket = tickets
            .insert_ticket(&new_ticket(&author, Urgency::Normal))
            .await
            .unwrap();
        let reply = tickets
            .insert_reply(ticket.id, author.id, Some("고객 답변"))
            .await
            .unwrap();
        let app = build_app(tickets.clone());

        let res = send(
            app,
            Method::DELETE,
            &format!("/tickets/{}/replies/{}", ticket.id, reply.id),
            admin.id,
            UserRole::Admin,
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(tickets.replies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn editing_missing_reply_is_not_found() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let app = build_app(Arc::new(MemoryTickets::default()));

        let res = send(
            app,
            Method::PUT,
            &format!("/tickets/{}/replies/{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4()),
            customer.id,
            UserRole::Customer,
            Some(json!({ "message": "어디갔지" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
