mod config;
mod db;
mod models;
mod responses;
mod routes;
mod services;
mod state;
mod utils;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::http::Method;
use axum::{
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Router,
};
use config::Config;
use db::postgres_access_request_repository::PostgresAccessRequestRepository;
use db::postgres_notice_repository::PostgresNoticeRepository;
use db::postgres_ticket_repository::PostgresTicketRepository;
use db::postgres_user_repository::PostgresUserRepository;
use responses::JsonResponse;
use routes::{
    access::{
        approve_request, list_requests, login_with_link, reject_request, request_access,
        request_login_link,
    },
    auth::{handle_login, handle_me, handle_send_code, handle_signup},
    dashboard::{auto_close, dashboard_stats},
    files::{delete_reply_file, delete_ticket_file, upload_reply_file, upload_ticket_file},
    notices::{create_notice, delete_notice, get_notice, list_notices, update_notice},
    tickets::{
        add_reply, admin_unread_counts, assign_ticket, create_ticket, delete_reply, edit_reply,
        list_all_tickets, list_my_tickets, mark_ticket_read, my_unread_counts, set_ticket_status,
        ticket_detail,
    },
    users::{
        approve_user, create_team_member, list_assignees, list_customers, list_team,
        update_profile,
    },
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::db::{
    access_request_repository::AccessRequestRepository, notice_repository::NoticeRepository,
    ticket_repository::TicketRepository, user_repository::UserRepository,
};
use crate::services::blob_store::{BlobStore, HttpBlobStore};
use crate::services::notifier::SmtpNotifier;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let rate_limit_ms: u64 = std::env::var("RATE_LIMITER_MILLISECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        // Default: 200ms/token (~5 req/sec)
        .unwrap_or(200);
    let rate_limit_burst: u32 = std::env::var("RATE_LIMITER_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(20);
    let global_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(rate_limit_ms)
            .burst_size(rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Stricter limiter for credential and magic-link endpoints.
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(1)
            .burst_size(10)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Cleanup of the limiter's per-IP map.
    let governor_limiter = global_governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let config = Config::from_env();

    let pg_pool = establish_connection(&config.database_url).await;
    let users = Arc::new(PostgresUserRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn UserRepository>;
    let access_requests = Arc::new(PostgresAccessRequestRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn AccessRequestRepository>;
    let tickets = Arc::new(PostgresTicketRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn TicketRepository>;
    let notices = Arc::new(PostgresNoticeRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn NoticeRepository>;

    let notifier = Arc::new(SmtpNotifier::new().expect("Failed to initialize notifier"));
    let blobs = Arc::new(
        HttpBlobStore::from_env(reqwest::Client::new())
            .expect("Failed to initialize blob store"),
    ) as Arc<dyn BlobStore>;

    let state = AppState {
        users,
        access_requests,
        tickets,
        notices,
        notifier,
        blobs,
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .frontend_origin
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/send-code", post(handle_send_code))
        .route("/signup", post(handle_signup))
        .route("/login", post(handle_login))
        .route("/me", get(handle_me))
        .layer(GovernorLayer {
            config: auth_governor_conf.clone(),
        });

    let access_routes = Router::new()
        .route("/request", post(request_access))
        .route("/login-link", post(request_login_link))
        .route("/login", post(login_with_link))
        .route("/requests", get(list_requests))
        .route("/requests/{id}/approve", post(approve_request))
        .route("/requests/{id}/reject", post(reject_request))
        .layer(GovernorLayer {
            config: auth_governor_conf.clone(),
        });

    let ticket_routes = Router::new()
        .route("/", post(create_ticket).get(list_all_tickets))
        .route("/my", get(list_my_tickets))
        .route("/my/unread-counts", get(my_unread_counts))
        .route("/admin/unread-counts", get(admin_unread_counts))
        .route("/{id}", get(ticket_detail))
        .route("/{id}/assignee", put(assign_ticket))
        .route("/{id}/status", patch(set_ticket_status))
        .route("/{id}/read", post(mark_ticket_read))
        .route("/{id}/replies", post(add_reply))
        .route(
            "/{id}/replies/{reply_id}",
            put(edit_reply).delete(delete_reply),
        );

    let file_routes = Router::new()
        .route("/ticket", post(upload_ticket_file))
        .route("/reply", post(upload_reply_file))
        .route("/ticket/{id}", delete(delete_ticket_file))
        .route("/reply/{id}", delete(delete_reply_file));

    let user_routes = Router::new()
        .route("/customers", get(list_customers))
        .route("/team", get(list_team).post(create_team_member))
        .route("/assignees", get(list_assignees))
        .route("/{id}", patch(update_profile))
        .route("/{id}/approve", patch(approve_user));

    let notice_routes = Router::new()
        .route("/", get(list_notices).post(create_notice))
        .route(
            "/{id}",
            get(get_notice).put(update_notice).delete(delete_notice),
        );

    let dashboard_routes = Router::new()
        .route("/stats", get(dashboard_stats))
        .route("/auto-close", post(auto_close));

    let app = Router::new()
        .route("/", get(root))
        .nest("/api/auth", auth_routes)
        .nest("/api/access", access_routes)
        .nest("/api/tickets", ticket_routes)
        .nest("/api/files", file_routes)
        .nest("/api/users", user_routes)
        .nest("/api/notices", notice_routes)
        .nest("/api/dashboard", dashboard_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: global_governor_conf.clone(),
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr = SocketAddr::from(([127, 0, 0, 1], 5000));

    let listener = TcpListener::bind(addr).await.unwrap();
    info!("ITSM backend listening at http://{}", addr);
    axum::serve(listener, make_service).await.unwrap();
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("BI ITSM backend").into_response()
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> PgPool {
    let pool = PgPool::connect(database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .expect("Failed to verify database connection");

    info!("Successfully connected to the database");
    pool
}
