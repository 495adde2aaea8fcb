use axum::{
    extract::{Json, Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    models::access_request::AccessRequestStatus,
    responses::JsonResponse,
    routes::auth::claims::Claims,
    routes::auth::session::AdminSession,
    state::AppState,
    utils::{jwt::create_jwt, password::random_password_hash, token::mint_magic_token},
};

/// Approval-path tokens are effectively permanent; this flow hands out
/// long-term access on an admin's say-so.
const APPROVAL_TOKEN_DAYS: i64 = 3650;
/// Re-issued login links are short-lived.
const LOGIN_LINK_MINUTES: i64 = 10;

#[derive(Deserialize)]
pub struct RequestAccessPayload {
    pub email: String,
    pub name: String,
    pub company_name: Option<String>,
}

pub async fn request_access(
    State(state): State<AppState>,
    Json(payload): Json<RequestAccessPayload>,
) -> Response {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') || payload.name.trim().is_empty() {
        return JsonResponse::bad_request("Email and name are required").into_response();
    }

    // One live (pending or approved) request per email.
    match state.access_requests.find_by_email(email).await {
        Ok(Some(existing)) if existing.status.is_live() => {
            return JsonResponse::conflict("An access request for this email is already open")
                .into_response();
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(operation = "request_access", error = ?e, "request lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    }

    let request = match state
        .access_requests
        .insert(email, payload.name.trim(), payload.company_name.as_deref())
        .await
    {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(operation = "request_access", error = ?e, "request insert failed");
            return JsonResponse::server_error("Could not submit the request").into_response();
        }
    };

    match state.users.admin_emails().await {
        Ok(admins) if !admins.is_empty() => {
            if let Err(e) = state
                .notifier
                .admin_new_access_request(&admins, &request)
                .await
            {
                tracing::error!(operation = "request_access", error = %e, "admin notification failed");
            }
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(operation = "request_access", error = ?e, "admin email lookup failed");
        }
    }

    JsonResponse::created("Access request submitted; you will be emailed once it is reviewed")
        .into_response()
}

#[derive(Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
}

pub async fn list_requests(
    State(state): State<AppState>,
    AdminSession(_claims): AdminSession,
    Query(query): Query<ListRequestsQuery>,
) -> Response {
    let result = match query.status.as_deref() {
        None | Some("all") => state.access_requests.list_all().await,
        Some(raw) => match raw.parse::<AccessRequestStatus>() {
            Ok(status) => state.access_requests.list_by_status(status).await,
            Err(()) => {
                return JsonResponse::bad_request("Unknown request status").into_response();
            }
        },
    };

    match result {
        Ok(requests) => Json(requests).into_response(),
        Err(e) => {
            tracing::error!(operation = "list_requests", error = ?e, "request list failed");
            JsonResponse::server_error("Something went wrong").into_response()
        }
    }
}

/// Approves the request, makes sure a user account exists for the email and
/// mails out a long-lived magic link. Approving twice simply re-mints the
/// token and re-sends the mail.
pub async fn approve_request(
    State(state): State<AppState>,
    AdminSession(_claims): AdminSession,
    Path(request_id): Path<Uuid>,
) -> Response {
    let request = match state.access_requests.approve(request_id).await {
        Ok(Some(request)) => request,
        Ok(None) => return JsonResponse::not_found("Request not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "approve_request", %request_id, error = ?e, "approve failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    // Make sure a user exists for this email; first approval creates one.
    let existing = match state.users.find_user_by_email(&request.email).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(operation = "approve_request", %request_id, error = ?e, "user lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    if existing.is_none() {
        let placeholder = match random_password_hash() {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!(operation = "approve_request", %request_id, error = %e, "placeholder hash failed");
                return JsonResponse::server_error("Something went wrong").into_response();
            }
        };
        if let Err(e) = state
            .users
            .create_magic_user(
                &request.email,
                &request.name,
                request.company_name.as_deref(),
                &placeholder,
            )
            .await
        {
            tracing::error!(operation = "approve_request", %request_id, error = ?e, "user creation failed");
            return JsonResponse::server_error("Could not create the user account")
                .into_response();
        }
    }

    let token = mint_magic_token();
    let expires_at = OffsetDateTime::now_utc() + Duration::days(APPROVAL_TOKEN_DAYS);
    if let Err(e) = state
        .access_requests
        .set_magic_token(&request.email, &token, expires_at)
        .await
    {
        // The request stays approved; re-approving re-mints the token.
        tracing::error!(operation = "approve_request", %request_id, error = ?e, "token store failed");
        return JsonResponse::server_error("Could not issue a login link").into_response();
    }

    let login_url = state.config.magic_login_url(&token);
    if let Err(e) = state.notifier.magic_link(&request.email, &login_url).await {
        tracing::error!(operation = "approve_request", %request_id, error = %e, "magic link mail failed");
    }

    JsonResponse::success("Request approved; a login link has been emailed").into_response()
}

pub async fn reject_request(
    State(state): State<AppState>,
    AdminSession(_claims): AdminSession,
    Path(request_id): Path<Uuid>,
) -> Response {
    let request = match state.access_requests.reject(request_id).await {
        Ok(Some(request)) => request,
        Ok(None) => return JsonResponse::not_found("Request not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "reject_request", %request_id, error = ?e, "reject failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    if let Err(e) = state
        .notifier
        .access_request_rejected(&request.email, &request.name)
        .await
    {
        tracing::error!(operation = "reject_request", %request_id, error = %e, "rejection mail failed");
    }

    JsonResponse::success("Request rejected; the requester has been notified").into_response()
}

#[derive(Deserialize)]
pub struct LoginLinkPayload {
    pub email: String,
}

/// Re-issuance path for recurring logins: a fresh short-lived token replaces
/// whatever token was stored before.
pub async fn request_login_link(
    State(state): State<AppState>,
    Json(payload): Json<LoginLinkPayload>,
) -> Response {
    let email = payload.email.trim();

    let request = match state.access_requests.find_by_email(email).await {
        Ok(Some(request)) if request.status == AccessRequestStatus::Approved => request,
        Ok(_) => {
            return JsonResponse::not_found("No approved access request for this email")
                .into_response();
        }
        Err(e) => {
            tracing::error!(operation = "request_login_link", error = ?e, "request lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    let token = mint_magic_token();
    let expires_at = OffsetDateTime::now_utc() + Duration::minutes(LOGIN_LINK_MINUTES);
    if let Err(e) = state
        .access_requests
        .set_magic_token(&request.email, &token, expires_at)
        .await
    {
        tracing::error!(operation = "request_login_link", error = ?e, "token store failed");
        return JsonResponse::server_error("Could not issue a login link").into_response();
    }

    let login_url = state.config.magic_login_url(&token);
    if let Err(e) = state.notifier.magic_link(&request.email, &login_url).await {
        tracing::error!(operation = "request_login_link", error = %e, "magic link mail failed");
    }

    JsonResponse::success("A login link has been emailed; it is valid for 10 minutes")
        .into_response()
}

#[derive(Deserialize)]
pub struct MagicLoginPayload {
    pub token: String,
}

/// Redeems a magic link for a signed credential.
pub async fn login_with_link(
    State(state): State<AppState>,
    Json(payload): Json<MagicLoginPayload>,
) -> Response {
    let now = OffsetDateTime::now_utc();

    let request = match state
        .access_requests
        .find_by_valid_token(&payload.token, now)
        .await
    {
        Ok(Some(request)) => request,
        Ok(None) => {
            return JsonResponse::bad_request("Invalid or expired login link").into_response()
        }
        Err(e) => {
            tracing::error!(operation = "login_with_link", error = ?e, "token lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    let user = match state.users.find_user_by_email(&request.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return JsonResponse::not_found("User not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "login_with_link", error = ?e, "user lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    if state.config.single_use_magic_links {
        // Policy switch; invalidation failure must not block the login.
        if let Err(e) = state.access_requests.invalidate_token(&payload.token).await {
            tracing::error!(operation = "login_with_link", error = ?e, "token invalidation failed");
        }
    }

    let claims = Claims::for_user(&user);
    match create_jwt(&claims) {
        Ok(token) => Json(json!({
            "token": token,
            "user": {
                "id": user.id,
                "email": user.email,
                "name": user.name,
                "role": user.role,
            }
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(operation = "login_with_link", error = ?e, "JWT issuance failed");
            JsonResponse::server_error("Token generation failed").into_response()
        }
    }
}
