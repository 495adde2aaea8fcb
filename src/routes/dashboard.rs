use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};

use crate::{
    models::{ticket::TicketStatus, user::UserRole},
    responses::JsonResponse,
    routes::auth::session::AdminSession,
    routes::tickets::status::notify_closed,
    state::AppState,
};

/// A ticket in `답변 완료` is closed once its latest reply is admin-authored
/// and older than this.
const AUTO_CLOSE_AFTER_DAYS: i64 = 7;

#[derive(Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
    pub ticket_type: Option<String>,
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    AdminSession(_claims): AdminSession,
    Query(query): Query<StatsQuery>,
) -> Response {
    let days = query.days.unwrap_or(30).max(1);
    let since = OffsetDateTime::now_utc() - Duration::days(days);

    let counts = match state
        .tickets
        .status_counts(since, query.ticket_type.as_deref())
        .await
    {
        Ok(counts) => counts,
        Err(e) => {
            tracing::error!(operation = "dashboard_stats", error = ?e, "ticket counts failed");
            return JsonResponse::server_error("Could not load dashboard stats").into_response();
        }
    };

    let customers = match state.users.list_customers().await {
        Ok(list) => list.len(),
        Err(e) => {
            tracing::error!(operation = "dashboard_stats", error = ?e, "customer count failed");
            return JsonResponse::server_error("Could not load dashboard stats").into_response();
        }
    };

    Json(json!({ "tickets": counts, "customers": customers })).into_response()
}

/// Reconciliation sweep, meant to be hit by an external scheduler. Walks the
/// answered tickets and closes the stale ones, with the same notification
/// fan-out as a manual close.
pub async fn auto_close(
    State(state): State<AppState>,
    AdminSession(_claims): AdminSession,
) -> Response {
    let ids = match state.tickets.answered_ticket_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(operation = "auto_close", error = ?e, "candidate scan failed");
            return JsonResponse::server_error("Auto-close sweep failed").into_response();
        }
    };

    let now = OffsetDateTime::now_utc();
    let mut closed = 0usize;

    for ticket_id in ids {
        let last = match state.tickets.latest_reply(ticket_id).await {
            Ok(Some(reply)) => reply,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(operation = "auto_close", %ticket_id, error = ?e, "latest reply lookup failed");
                continue;
            }
        };

        let is_admin = last.author_role == UserRole::Admin;
        let is_old = now - last.created_at > Duration::days(AUTO_CLOSE_AFTER_DAYS);
        if !(is_admin && is_old) {
            continue;
        }

        match state.tickets.set_status(ticket_id, TicketStatus::Closed).await {
            Ok(Some(_)) => {
                notify_closed(&state, ticket_id).await;
                closed += 1;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(operation = "auto_close", %ticket_id, error = ?e, "close failed");
            }
        }
    }

    Json(json!({ "message": format!("{}건 자동 종료 처리됨", closed), "closed": closed }))
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::Request,
        http::{header, StatusCode},
        routing::{get, post},
        Router,
    };
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;

    use crate::{
        db::mock_db::{user_fixture, MemoryTickets, MockAccessRequests, MockUsers},
        db::ticket_repository::TicketRepository,
        models::ticket::{TicketStatus, Urgency},
        models::user::UserRole,
        routes::auth::session::tests::make_jwt,
        routes::tickets::crud::tests::new_ticket,
        services::notifier::MockNotifier,
        state::test_support,
    };

    use super::{auto_close, dashboard_stats};

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
            .route("/dashboard/stats", get(dashboard_stats))
            .route("/dashboard/auto-close", post(auto_close))
            .with_state(state)
    }

    fn backdate_reply(tickets: &MemoryTickets, reply_id: uuid::Uuid, days: i64) {
        let mut replies = tickets.replies.lock().unwrap();
        if let Some(reply) = replies.iter_mut().find(|r| r.id == reply_id) {
            reply.created_at = OffsetDateTime::now_utc() - Duration::days(days);
        }
    }

    // Scenario: a stale admin-answered ticket closes; one whose latest reply
    // is customer-authored stays open.
    #[tokio::test]
    async fn sweep_closes_stale_admin_answered_tickets_only() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let admin = user_fixture("admin@example.com", UserRole::Admin);
        let users = Arc::new(MockUsers::with_users(vec![customer.clone(), admin.clone()]));
        let tickets = Arc::new(MemoryTickets::default());
        tickets.register_user(&customer);
        tickets.register_user(&admin);

        // Stale, last reply by admin -> should close.
        let stale = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        tickets
            .set_status(stale.id, TicketStatus::Answered)
            .await
            .unwrap();
        let reply = tickets
            .insert_reply(stale.id, admin.id, Some("해결되었습니다"))
            .await
            .unwrap();
        backdate_reply(&tickets, reply.id, 8);

        // Last reply by the customer -> must not close.
        let active = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        tickets
            .set_status(active.id, TicketStatus::Answered)
            .await
            .unwrap();
        let reply = tickets
            .insert_reply(active.id, customer.id, Some("아직 안 됩니다"))
            .await
            .unwrap();
        backdate_reply(&tickets, reply.id, 8);

        let notifier = Arc::new(MockNotifier::default());
        let app = build_app(users, tickets.clone(), notifier.clone());

        let res = app
            .oneshot(
                Request::post("/dashboard/auto-close")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", make_jwt(UserRole::Admin)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["closed"], 1);

        let stored = tickets.tickets.lock().unwrap();
        let stale_after = stored.iter().find(|t| t.id == stale.id).unwrap();
        let active_after = stored.iter().find(|t| t.id == active.id).unwrap();
        assert_eq!(stale_after.status, TicketStatus::Closed);
        assert_eq!(active_after.status, TicketStatus::Answered);
        drop(stored);

        // The close fan-out ran for the swept ticket.
        assert_eq!(notifier.closed_tickets.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sweep_ignores_recent_admin_replies() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let admin = user_fixture("admin@example.com", UserRole::Admin);
        let users = Arc::new(MockUsers::with_users(vec![customer.clone(), admin.clone()]));
        let tickets = Arc::new(MemoryTickets::default());
        tickets.register_user(&customer);
        tickets.register_user(&admin);

        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        tickets
            .set_status(ticket.id, TicketStatus::Answered)
            .await
            .unwrap();
        let reply = tickets
            .insert_reply(ticket.id, admin.id, Some("해결되었습니다"))
            .await
            .unwrap();
        backdate_reply(&tickets, reply.id, 3);

        let app = build_app(users, tickets.clone(), Arc::new(MockNotifier::default()));

        let res = app
            .oneshot(
                Request::post("/dashboard/auto-close")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", make_jwt(UserRole::Admin)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            tickets.tickets.lock().unwrap()[0].status,
            TicketStatus::Answered
        );
    }

    #[tokio::test]
    async fn sweep_skips_tickets_without_replies() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let tickets = Arc::new(MemoryTickets::default());
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        tickets
            .set_status(ticket.id, TicketStatus::Answered)
            .await
            .unwrap();
        let app = build_app(
            Arc::new(MockUsers::default()),
            tickets.clone(),
            Arc::new(MockNotifier::default()),
        );

        let res = app
            .oneshot(
                Request::post("/dashboard/auto-close")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", make_jwt(UserRole::Admin)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            tickets.tickets.lock().unwrap()[0].status,
            TicketStatus::Answered
        );
    }

    #[tokio::test]
    async fn sweep_is_admin_only() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let app = build_app(
            Arc::new(MockUsers::default()),
            Arc::new(MemoryTickets::default()),
            Arc::new(MockNotifier::default()),
        );

        let res = app
            .oneshot(
                Request::post("/dashboard/auto-close")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", make_jwt(UserRole::ItsmTeam)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn stats_count_by_status_within_window() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let users = Arc::new(MockUsers::with_users(vec![customer.clone()]));
        let tickets = Arc::new(MemoryTickets::default());
        let a = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        tickets
            .insert_ticket(&new_ticket(&customer, Urgency::High))
            .await
            .unwrap();
        tickets.set_status(a.id, TicketStatus::Closed).await.unwrap();

        let app = build_app(users, tickets, Arc::new(MockNotifier::default()));

        let res = app
            .oneshot(
                Request::get("/dashboard/stats?days=7")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", make_jwt(UserRole::Admin)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["tickets"]["total"], 2);
        assert_eq!(json["tickets"]["closed"], 1);
        assert_eq!(json["tickets"]["received"], 1);
        assert_eq!(json["customers"], 1);
    }
}
