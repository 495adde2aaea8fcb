use axum::{
    extract::{Json, Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    models::ticket::{Ticket, TicketDetail, TicketStatus},
    responses::JsonResponse,
    routes::auth::session::TeamSession,
    state::AppState,
};

#[derive(Deserialize)]
pub struct SetStatusPayload {
    pub status: String,
}

/// Staff-only status change. The allow-list checks membership only; any of
/// the four canonical labels may follow any other, including a direct
/// `접수` → `종결`.
pub async fn set_ticket_status(
    State(state): State<AppState>,
    TeamSession(_claims): TeamSession,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<SetStatusPayload>,
) -> Response {
    let Some(status) = TicketStatus::from_label(&payload.status) else {
        return JsonResponse::bad_request("Unknown ticket status").into_response();
    };

    let ticket = match state.tickets.set_status(ticket_id, status).await {
        Ok(Some(ticket)) => ticket,
        Ok(None) => return JsonResponse::not_found("Ticket not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "set_status", %ticket_id, error = ?e, "status update failed");
            return JsonResponse::server_error("Could not update the status").into_response();
        }
    };

    // Notification tails are fire-and-forget; the status change above stands
    // whatever happens below.
    match status {
        TicketStatus::InProgress => notify_in_progress(&state, &ticket).await,
        TicketStatus::Closed => notify_closed(&state, ticket_id).await,
        _ => {}
    }

    Json(json!({ "message": "Status updated", "ticket": ticket })).into_response()
}

async fn notify_in_progress(state: &AppState, ticket: &Ticket) {
    let customer = match state.users.find_public_user_by_id(ticket.customer_id).await {
        Ok(Some(customer)) => customer,
        Ok(None) => return,
        Err(e) => {
            tracing::error!(operation = "set_status", ticket_id = %ticket.id, error = ?e, "customer lookup failed");
            return;
        }
    };

    if let Err(e) = state
        .notifier
        .ticket_status_changed(&customer.email, ticket)
        .await
    {
        tracing::error!(operation = "set_status", ticket_id = %ticket.id, error = %e, "status notification failed");
    }
}

/// Close fan-out: customer, assignee and the whole staff roster, duplicates
/// removed. Shared with the auto-close sweep.
pub(crate) async fn notify_closed(state: &AppState, ticket_id: Uuid) {
    let detail = match state.tickets.find_detail(ticket_id).await {
        Ok(Some(detail)) => detail,
        Ok(None) => return,
        Err(e) => {
            tracing::error!(operation = "close_ticket", %ticket_id, error = ?e, "detail lookup failed");
            return;
        }
    };

    let staff = match state.users.staff_emails().await {
        Ok(staff) => staff,
        Err(e) => {
            tracing::error!(operation = "close_ticket", %ticket_id, error = ?e, "staff email lookup failed");
            return;
        }
    };

    let recipients = close_recipients(&detail, &staff);
    if recipients.is_empty() {
        return;
    }

    if let Err(e) = state.notifier.ticket_closed(&recipients, &detail).await {
        tracing::error!(operation = "close_ticket", %ticket_id, error = %e, "close notification failed");
    }
}

/// Order-preserving dedup of {customer, assignee, staff...}.
pub(crate) fn close_recipients(detail: &TicketDetail, staff: &[String]) -> Vec<String> {
    let mut recipients: Vec<String> = Vec::new();
    let candidates = detail
        .customer_email
        .iter()
        .chain(detail.assignee_email.iter())
        .map(String::as_str)
        .chain(staff.iter().map(String::as_str));

    for email in candidates {
        if !email.is_empty() && !recipients.iter().any(|r| r == email) {
            recipients.push(email.to_string());
        }
    }
    recipients
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::Request,
        http::{header, StatusCode},
        routing::patch,
        Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::{
        db::mock_db::{user_fixture, MemoryTickets, MockAccessRequests, MockUsers},
        db::ticket_repository::TicketRepository,
        models::ticket::{TicketStatus, Urgency},
        models::user::UserRole,
        routes::auth::session::tests::make_jwt_for,
        routes::tickets::crud::tests::new_ticket,
        services::notifier::MockNotifier,
        state::test_support,
    };

    use super::set_ticket_status;

    fn build_app(
        users: Arc<MockUsers>,
        tickets: Arc<MemoryTickets>,
        notifier: Arc<MockNotifier>,
    ) -> Router {
        let state = test_support::state(
            users,
            Arc::new(MockAccessRequests::default()),
            tickets,
            notifier,
        );

        Router::new()
            .route("/tickets/{id}/status", patch(set_ticket_status))
            .with_state(state)
    }

    async fn patch_status(
        app: Router,
        ticket_id: uuid::Uuid,
        actor: uuid::Uuid,
        role: UserRole,
        status: &str,
    ) -> axum::response::Response {
        app.oneshot(
            Request::patch(format!("/tickets/{}/status", ticket_id))
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", make_jwt_for(actor, role)),
                )
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "status": status }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn rejects_unknown_status_label() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let staff = user_fixture("staff@example.com", UserRole::ItsmTeam);
        let tickets = Arc::new(MemoryTickets::default());
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        let app = build_app(
            Arc::new(MockUsers::default()),
            tickets.clone(),
            Arc::new(MockNotifier::default()),
        );

        let res = patch_status(app, ticket.id, staff.id, UserRole::ItsmTeam, "보류").await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        // No mutation happened.
        assert_eq!(
            tickets.tickets.lock().unwrap()[0].status,
            TicketStatus::Received
        );
    }

    #[tokio::test]
    async fn customers_cannot_change_status() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let tickets = Arc::new(MemoryTickets::default());
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        let app = build_app(
            Arc::new(MockUsers::default()),
            tickets,
            Arc::new(MockNotifier::default()),
        );

        let res = patch_status(app, ticket.id, customer.id, UserRole::Customer, "종결").await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn received_to_closed_is_allowed_without_adjacency() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let staff = user_fixture("staff@example.com", UserRole::ItsmTeam);
        let users = Arc::new(MockUsers::with_users(vec![customer.clone(), staff.clone()]));
        let tickets = Arc::new(MemoryTickets::default());
        tickets.register_user(&customer);
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        let app = build_app(users, tickets.clone(), Arc::new(MockNotifier::default()));

        let res = patch_status(app, ticket.id, staff.id, UserRole::ItsmTeam, "종결").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            tickets.tickets.lock().unwrap()[0].status,
            TicketStatus::Closed
        );
    }

    #[tokio::test]
    async fn in_progress_notifies_the_customer() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let staff = user_fixture("staff@example.com", UserRole::ItsmTeam);
        let users = Arc::new(MockUsers::with_users(vec![customer.clone(), staff.clone()]));
        let tickets = Arc::new(MemoryTickets::default());
        tickets.register_user(&customer);
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        let notifier = Arc::new(MockNotifier::default());
        let app = build_app(users, tickets, notifier.clone());

        let res = patch_status(app, ticket.id, staff.id, UserRole::ItsmTeam, "진행중").await;
        assert_eq!(res.status(), StatusCode::OK);

        let sent = notifier.status_changes.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "customer@example.com");
        assert_eq!(sent[0].2, "진행중");
    }

    // End-to-end scenario: closing computes {customer, assignee, staff}
    // with duplicates removed.
    #[tokio::test]
    async fn closing_notifies_deduplicated_recipient_set() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let assignee = user_fixture("assignee@example.com", UserRole::ItsmTeam);
        let admin = user_fixture("admin@example.com", UserRole::Admin);
        // The assignee is also on the staff roster, so their address would
        // appear twice without dedup.
        let users = Arc::new(MockUsers::with_users(vec![
            customer.clone(),
            assignee.clone(),
            admin.clone(),
        ]));
        let tickets = Arc::new(MemoryTickets::default());
        tickets.register_user(&customer);
        tickets.register_user(&assignee);
        tickets.register_user(&admin);
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::High))
            .await
            .unwrap();
        tickets.assign(ticket.id, Some(assignee.id)).await.unwrap();
        tickets
            .set_status(ticket.id, TicketStatus::Answered)
            .await
            .unwrap();
        let notifier = Arc::new(MockNotifier::default());
        let app = build_app(users, tickets, notifier.clone());

        let res = patch_status(app, ticket.id, admin.id, UserRole::Admin, "종결").await;
        assert_eq!(res.status(), StatusCode::OK);

        let sent = notifier.closed_tickets.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let mut recipients = sent[0].0.clone();
        recipients.sort();
        assert_eq!(
            recipients,
            vec![
                "admin@example.com".to_string(),
                "assignee@example.com".to_string(),
                "customer@example.com".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn status_change_survives_notifier_failure() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let staff = user_fixture("staff@example.com", UserRole::ItsmTeam);
        let users = Arc::new(MockUsers::with_users(vec![customer.clone(), staff.clone()]));
        let tickets = Arc::new(MemoryTickets::default());
        tickets.register_user(&customer);
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        let notifier = Arc::new(MockNotifier {
            fail_send: true,
            ..Default::default()
        });
        let app = build_app(users, tickets.clone(), notifier);

        let res = patch_status(app, ticket.id, staff.id, UserRole::ItsmTeam, "진행중").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            tickets.tickets.lock().unwrap()[0].status,
            TicketStatus::InProgress
        );
    }

    #[tokio::test]
    async fn unknown_ticket_is_not_found() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let staff = user_fixture("staff@example.com", UserRole::ItsmTeam);
        let app = build_app(
            Arc::new(MockUsers::default()),
            Arc::new(MemoryTickets::default()),
            Arc::new(MockNotifier::default()),
        );

        let res = patch_status(app, uuid::Uuid::new_v4(), staff.id, UserRole::ItsmTeam, "종결").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
