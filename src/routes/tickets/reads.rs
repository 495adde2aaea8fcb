use axum::{
    extract::{Json, Path, State},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    responses::JsonResponse,
    routes::auth::session::{AuthSession, TeamSession},
    state::AppState,
};

/// Moves the caller's watermark for the ticket up to now. Safe to call from
/// several devices at once; the store resolves the conflict into one row.
pub async fn mark_ticket_read(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(ticket_id): Path<Uuid>,
) -> Response {
    let user_id = match Uuid::parse_str(&claims.id) {
        Ok(id) => id,
        Err(_) => return JsonResponse::unauthorized("Invalid user ID").into_response(),
    };

    match state.tickets.mark_read(ticket_id, user_id).await {
        Ok(()) => JsonResponse::success("Marked as read").into_response(),
        Err(e) => {
            tracing::error!(operation = "mark_read", %ticket_id, error = ?e, "watermark upsert failed");
            JsonResponse::server_error("Could not mark the ticket as read").into_response()
        }
    }
}

/// Customer badge: per owned ticket, admin-authored replies past the
/// caller's watermark.
pub async fn my_unread_counts(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Response {
    let user_id = match Uuid::parse_str(&claims.id) {
        Ok(id) => id,
        Err(_) => return JsonResponse::unauthorized("Invalid user ID").into_response(),
    };

    match state.tickets.customer_unread_counts(user_id).await {
        Ok(counts) => Json(counts).into_response(),
        Err(e) => {
            tracing::error!(operation = "my_unread_counts", error = ?e, "unread query failed");
            JsonResponse::server_error("Could not load unread counts").into_response()
        }
    }
}

/// Staff badge: per ticket across the whole board, customer-authored replies
/// past the caller's own watermark.
pub async fn admin_unread_counts(
    State(state): State<AppState>,
    TeamSession(claims): TeamSession,
) -> Response {
    let user_id = match Uuid::parse_str(&claims.id) {
        Ok(id) => id,
        Err(_) => return JsonResponse::unauthorized("Invalid user ID").into_response(),
    };

    match state.tickets.staff_unread_counts(user_id).await {
        Ok(counts) => Json(counts).into_response(),
        Err(e) => {
            tracing::error!(operation = "admin_unread_counts", error = ?e, "unread query failed");
            JsonResponse::server_error("Could not load unread counts").into_response()
        }
    }
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
    use time::Duration;
    use tower::ServiceExt;

    use crate::{
        db::mock_db::{user_fixture, MemoryTickets, MockAccessRequests, MockUsers},
        db::ticket_repository::TicketRepository,
        models::ticket::{UnreadCount, Urgency},
        models::user::UserRole,
        routes::auth::session::tests::make_jwt_for,
        routes::tickets::crud::tests::new_ticket,
        services::notifier::MockNotifier,
        state::test_support,
    };

    use super::{admin_unread_counts, mark_ticket_read, my_unread_counts};

    fn build_app(tickets: Arc<MemoryTickets>) -> Router {
        let state = test_support::state(
            Arc::new(MockUsers::default()),
            Arc::new(MockAccessRequests::default()),
            tickets,
            Arc::new(MockNotifier::default()),
        );

        Router::new()
            .route("/tickets/{id}/read", post(mark_ticket_read))
            .route("/tickets/my/unread-counts", get(my_unread_counts))
            .route("/tickets/admin/unread-counts", get(admin_unread_counts))
            .with_state(state)
    }

    async fn get_counts(
        app: Router,
        uri: &str,
        actor: uuid::Uuid,
        role: UserRole,
    ) -> Vec<UnreadCount> {
        let res = app
            .oneshot(
                Request::get(uri)
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", make_jwt_for(actor, role)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn marking_read_twice_keeps_one_watermark_row_at_the_later_time() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let tickets = Arc::new(MemoryTickets::default());
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        let app = build_app(tickets.clone());

        for _ in 0..2 {
            let res = app
                .clone()
                .oneshot(
                    Request::post(format!("/tickets/{}/read", ticket.id))
                        .header(
                            header::AUTHORIZATION,
                            format!("Bearer {}", make_jwt_for(customer.id, UserRole::Customer)),
                        )
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        assert_eq!(tickets.watermark_rows(ticket.id, customer.id), 1);
        let first = tickets.watermark(ticket.id, customer.id).unwrap();

        // Backdate the stored watermark, mark again, and check it moved up.
        tickets
            .reads
            .lock()
            .unwrap()
            .insert((ticket.id, customer.id), first - Duration::hours(1));
        let res = app
            .oneshot(
                Request::post(format!("/tickets/{}/read", ticket.id))
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", make_jwt_for(customer.id, UserRole::Customer)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(tickets.watermark(ticket.id, customer.id).unwrap() > first - Duration::hours(1));
        assert_eq!(tickets.watermark_rows(ticket.id, customer.id), 1);
    }

    #[tokio::test]
    async fn customer_with_no_watermark_sees_all_admin_replies_unread() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let admin = user_fixture("admin@example.com", UserRole::Admin);
        let tickets = Arc::new(MemoryTickets::default());
        tickets.register_user(&customer);
        tickets.register_user(&admin);
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        tickets
            .insert_reply(ticket.id, admin.id, Some("안내드립니다"))
            .await
            .unwrap();
        tickets
            .insert_reply(ticket.id, admin.id, Some("추가 안내"))
            .await
            .unwrap();
        // The customer's own reply never counts toward their badge.
        tickets
            .insert_reply(ticket.id, customer.id, Some("감사합니다"))
            .await
            .unwrap();
        let app = build_app(tickets);

        let counts = get_counts(
            app,
            "/tickets/my/unread-counts",
            customer.id,
            UserRole::Customer,
        )
        .await;
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].unread_count, 2);
    }

    #[tokio::test]
    async fn watermark_resets_customer_unread_count() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let admin = user_fixture("admin@example.com", UserRole::Admin);
        let tickets = Arc::new(MemoryTickets::default());
        tickets.register_user(&customer);
        tickets.register_user(&admin);
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        let early = tickets
            .insert_reply(ticket.id, admin.id, Some("안내드립니다"))
            .await
            .unwrap();
        tickets.mark_read(ticket.id, customer.id).await.unwrap();

        // One reply after the watermark.
        let late = tickets
            .insert_reply(ticket.id, admin.id, Some("추가 안내"))
            .await
            .unwrap();
        {
            let watermark = tickets.watermark(ticket.id, customer.id).unwrap();
            let mut replies = tickets.replies.lock().unwrap();
            for reply in replies.iter_mut() {
                if reply.id == early.id {
                    reply.created_at = watermark - Duration::minutes(5);
                } else if reply.id == late.id {
                    reply.created_at = watermark + Duration::minutes(5);
                }
            }
        }
        let app = build_app(tickets);

        let counts = get_counts(
            app,
            "/tickets/my/unread-counts",
            customer.id,
            UserRole::Customer,
        )
        .await;
        assert_eq!(counts[0].unread_count, 1);
    }

    // Documented current behavior, not necessarily correct: replies from
    // itsm_team members do not count toward the customer badge even though
    // tickets are commonly assigned to them.
    #[tokio::test]
    async fn unread_counts_ignore_itsm_team_replies() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let teammate = user_fixture("teammate@example.com", UserRole::ItsmTeam);
        let tickets = Arc::new(MemoryTickets::default());
        tickets.register_user(&customer);
        tickets.register_user(&teammate);
        let ticket = tickets
            .insert_ticket(&new_ticket(&customer, Urgency::Normal))
            .await
            .unwrap();
        tickets
            .insert_reply(ticket.id, teammate.id, Some("지원팀 답변"))
            .await
            .unwrap();
        let app = build_app(tickets);

        let counts = get_counts(
            app,
            "/tickets/my/unread-counts",
            customer.id,
            UserRole::Customer,
        )
        .await;
        assert_eq!(counts[0].unread_count, 0);
    }

    #[tokio::test]
    async fn staff_badge_counts_customer_replies_across_all_tickets() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer_a = user_fixture("a@example.com", UserRole::Customer);
        let customer_b = user_fixture("b@example.com", UserRole::Customer);
        let staff = user_fixture("staff@example.com", UserRole::ItsmTeam);
        let tickets = Arc::new(MemoryTickets::default());
        tickets.register_user(&customer_a);
        tickets.register_user(&customer_b);
        tickets.register_user(&staff);
        let ticket_a = tickets
            .insert_ticket(&new_ticket(&customer_a, Urgency::Normal))
            .await
            .unwrap();
        let ticket_b = tickets
            .insert_ticket(&new_ticket(&customer_b, Urgency::High))
            .await
            .unwrap();
        tickets
            .insert_reply(ticket_a.id, customer_a.id, Some("확인 부탁드립니다"))
            .await
            .unwrap();
        tickets
            .insert_reply(ticket_b.id, customer_b.id, Some("급합니다"))
            .await
            .unwrap();
        tickets
            .insert_reply(ticket_b.id, staff.id, Some("확인 중입니다"))
            .await
            .unwrap();
        let app = build_app(tickets);

        let counts = get_counts(
            app,
            "/tickets/admin/unread-counts",
            staff.id,
            UserRole::ItsmTeam,
        )
        .await;
        // Both tickets appear, even though neither is assigned to the caller.
        assert_eq!(counts.len(), 2);
        let total: i64 = counts.iter().map(|c| c.unread_count).sum();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn staff_badge_requires_team_role() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let customer = user_fixture("customer@example.com", UserRole::Customer);
        let app = build_app(Arc::new(MemoryTickets::default()));

        let res = app
            .oneshot(
                Request::get("/tickets/admin/unread-counts")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", make_jwt_for(customer.id, UserRole::Customer)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
