use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use time::{Duration, OffsetDateTime};

use crate::{
    models::user::PublicUser,
    responses::JsonResponse,
    state::AppState,
    utils::{password::hash_password, token::verification_code},
};

#[derive(Deserialize)]
pub struct SendCodePayload {
    pub email: String,
}

/// First registration step: email a short-lived verification code.
pub async fn handle_send_code(
    State(state): State<AppState>,
    Json(payload): Json<SendCodePayload>,
) -> Response {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return JsonResponse::bad_request("A valid email address is required").into_response();
    }

    let code = verification_code();
    let expires_at = OffsetDateTime::now_utc() + Duration::minutes(10);

    if let Err(e) = state
        .users
        .insert_verification_code(email, &code, expires_at)
        .await
    {
        tracing::error!(operation = "send_code", error = ?e, "failed to store verification code");
        return JsonResponse::server_error("Could not issue a verification code").into_response();
    }

    if let Err(e) = state.notifier.verification_code(email, &code).await {
        tracing::error!(operation = "send_code", error = %e, "failed to send verification code");
    }

    JsonResponse::success("Verification code sent").into_response()
}

#[derive(Deserialize)]
pub struct SignupPayload {
    pub email: String,
    pub password: String,
    pub name: String,
    pub company_name: Option<String>,
    pub code: String,
}

/// Self-registration. The account starts unapproved; admins are notified and
/// must approve it before login succeeds.
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Response {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() || payload.name.trim().is_empty() {
        return JsonResponse::bad_request("Email, password and name are required").into_response();
    }

    match state
        .users
        .consume_verification_code(email, &payload.code, OffsetDateTime::now_utc())
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            return JsonResponse::bad_request("Invalid or expired verification code")
                .into_response()
        }
        Err(e) => {
            tracing::error!(operation = "signup", error = ?e, "verification code lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    }

    match state.users.find_user_by_email(email).await {
        Ok(Some(_)) => return JsonResponse::conflict("Email is already registered").into_response(),
        Ok(None) => {}
        Err(e) => {
            tracing::error!(operation = "signup", error = ?e, "user lookup failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(operation = "signup", error = %e, "password hashing failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    let user = match state
        .users
        .create_customer(
            email,
            &password_hash,
            payload.name.trim(),
            payload.company_name.as_deref(),
        )
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(operation = "signup", error = ?e, "user insert failed");
            return JsonResponse::server_error("Could not create the account").into_response();
        }
    };

    match state.users.admin_emails().await {
        Ok(admins) if !admins.is_empty() => {
            if let Err(e) = state
                .notifier
                .admin_approval_request(&admins, &PublicUser::from(&user))
                .await
            {
                tracing::error!(operation = "signup", error = %e, "admin notification failed");
            }
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(operation = "signup", error = ?e, "admin email lookup failed");
        }
    }

    JsonResponse::created("Account created; awaiting admin approval").into_response()
}
