use axum::{
    extract::{Json, Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    models::{
        ticket::{FileRef, NewTicket, TicketFilter, Urgency},
        user::UserRole,
    },
    responses::JsonResponse,
    routes::auth::session::{AuthSession, TeamSession},
    state::AppState,
};

const DEFAULT_TICKET_TYPE: &str = "문의";

#[derive(Deserialize)]
pub struct CreateTicketPayload {
    pub title: String,
    pub description: Option<String>,
    pub urgency: Urgency,
    pub product: Option<String>,
    pub platform: Option<String>,
    pub sw_version: Option<String>,
    pub os: Option<String>,
    pub ticket_type: Option<String>,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

/// New tickets always start in `접수`. The admin notification is
/// best-effort: its failure never fails the create.
pub async fn create_ticket(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(payload): Json<CreateTicketPayload>,
) -> Response {
    let customer_id = match Uuid::parse_str(&claims.id) {
        Ok(id) => id,
        Err(_) => return JsonResponse::unauthorized("Invalid user ID").into_response(),
    };

    if payload.title.trim().is_empty() {
        return JsonResponse::bad_request("Title is required").into_response();
    }

    let new = NewTicket {
        title: payload.title.trim().to_string(),
        description: payload.description.clone(),
        urgency: payload.urgency,
        product: payload.product.clone(),
        customer_id,
        platform: payload.platform.clone(),
        sw_version: payload.sw_version.clone(),
        os: payload.os.clone(),
        ticket_type: payload
            .ticket_type
            .clone()
            .unwrap_or_else(|| DEFAULT_TICKET_TYPE.to_string()),
    };

    let ticket = match state.tickets.insert_ticket(&new).await {
        Ok(ticket) => ticket,
        Err(e) => {
            tracing::error!(operation = "create_ticket", error = ?e, "ticket insert failed");
            return JsonResponse::server_error("Could not create the ticket").into_response();
        }
    };

    // No surrounding transaction: a failed attachment leaves the ticket
    // without that file, which is logged and visible to the caller later.
    for file in &payload.files {
        if let Err(e) = state.tickets.attach_ticket_file(ticket.id, file).await {
            tracing::error!(
                operation = "create_ticket",
                ticket_id = %ticket.id,
                file = %file.original_name,
                error = ?e,
                "file attach failed"
            );
        }
    }

    match state.users.admin_emails().await {
        Ok(admins) if !admins.is_empty() => {
            if let Err(e) = state
                .notifier
                .admin_new_ticket(&admins, &ticket, &claims.name)
                .await
            {
                tracing::error!(operation = "create_ticket", ticket_id = %ticket.id, error = %e, "admin notification failed");
            }
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(operation = "create_ticket", error = ?e, "admin email lookup failed");
        }
    }

    (
        axum::http::StatusCode::CREATED,
        Json(json!({ "message": "Ticket created", "ticket_id": ticket.id })),
    )
        .into_response()
}

pub async fn list_my_tickets(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Query(filter): Query<TicketFilter>,
) -> Response {
    let customer_id = match Uuid::parse_str(&claims.id) {
        Ok(id) => id,
        Err(_) => return JsonResponse::unauthorized("Invalid user ID").into_response(),
    };

    match state.tickets.list_for_customer(customer_id, &filter).await {
        Ok(tickets) => Json(tickets).into_response(),
        Err(e) => {
            tracing::error!(operation = "list_my_tickets", error = ?e, "ticket list failed");
            JsonResponse::server_error("Could not list tickets").into_response()
        }
    }
}

pub async fn list_all_tickets(
    State(state): State<AppState>,
    TeamSession(_claims): TeamSession,
    Query(filter): Query<TicketFilter>,
) -> Response {
    match state.tickets.list_all(&filter).await {
        Ok(tickets) => Json(tickets).into_response(),
        Err(e) => {
            tracing::error!(operation = "list_all_tickets", error = ?e, "ticket list failed");
            JsonResponse::server_error("Could not list tickets").into_response()
        }
    }
}

/// Ticket + files + replies. Customers may only read their own tickets;
/// staff may read any.
pub async fn ticket_detail(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(ticket_id): Path<Uuid>,
) -> Response {
    let detail = match state.tickets.find_detail(ticket_id).await {
        Ok(Some(detail)) => detail,
        Ok(None) => return JsonResponse::not_found("Ticket not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "ticket_detail", %ticket_id, error = ?e, "detail lookup failed");
            return JsonResponse::server_error("Could not load the ticket").into_response();
        }
    };

    if claims.role == UserRole::Customer && claims.id != detail.customer_id.to_string() {
        return JsonResponse::forbidden("Not your ticket").into_response();
    }

    let files = match state.tickets.ticket_files(ticket_id).await {
        Ok(files) => files,
        Err(e) => {
            tracing::error!(operation = "ticket_detail", %ticket_id, error = ?e, "file list failed");
            return JsonResponse::server_error("Could not load the ticket").into_response();
        }
    };

    let replies = match state.tickets.replies_with_files(ticket_id).await {
        Ok(replies) => replies,
        Err(e) => {
            tracing::error!(operation = "ticket_detail", %ticket_id, error = ?e, "reply list failed");
            return JsonResponse::server_error("Could not load the ticket").into_response();
        }
    };

    Json(json!({ "ticket": detail, "files": files, "replies": replies })).into_response()
}

#[derive(Deserialize)]
pub struct AssignPayload {
    pub assignee_id: Option<Uuid>,
}

/// Sets or clears the assignee. Mirrors the stored behavior: the assignee id
/// is not checked against the staff roster.
pub async fn assign_ticket(
    State(state): State<AppState>,
    TeamSession(_claims): TeamSession,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<AssignPayload>,
) -> Response {
    match state.tickets.assign(ticket_id, payload.assignee_id).await {
        Ok(Some(ticket)) => {
            Json(json!({ "message": "Assignee updated", "ticket": ticket })).into_response()
        }
        Ok(None) => JsonResponse::not_found("Ticket not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "assign_ticket", %ticket_id, error = ?e, "assign failed");
            JsonResponse::server_error("Could not update the assignee").into_response()
        }
    }
}
