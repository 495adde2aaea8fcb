use crate::routes::auth::claims::Claims;
use crate::{
    responses::JsonResponse,
    state::AppState,
    utils::{jwt::create_jwt, password::verify_password},
};

use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, to_value};
use uuid::Uuid;

use super::session::AuthSession;

#[derive(Deserialize, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

pub async fn handle_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let user = match state.users.find_user_by_email(payload.email.trim()).await {
        Ok(Some(record)) => record,
        Ok(None) => return JsonResponse::unauthorized("Invalid credentials").into_response(),
        Err(e) => {
            tracing::error!(operation = "login", error = ?e, "user lookup failed");
            return JsonResponse::server_error("Database error").into_response();
        }
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {
            if !user.is_approved {
                return JsonResponse::forbidden("Account is pending approval").into_response();
            }

            let claims = Claims::for_user(&user);
            match create_jwt(&claims) {
                Ok(token) => {
                    let user_json = to_value(&user).expect("User serialization failed");
                    Json(json!({
                        "success": true,
                        "token": token,
                        "user": user_json
                    }))
                    .into_response()
                }
                Err(e) => {
                    tracing::error!(operation = "login", error = ?e, "JWT issuance failed");
                    JsonResponse::server_error("Token generation failed").into_response()
                }
            }
        }
        Ok(false) => JsonResponse::unauthorized("Invalid credentials").into_response(),
        // Magic-link accounts carry an unusable placeholder hash; any parse
        // failure is treated the same as a wrong password.
        Err(_) => JsonResponse::unauthorized("Invalid credentials").into_response(),
    }
}

pub async fn handle_me(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Response {
    let user_id = match Uuid::parse_str(&claims.id) {
        Ok(id) => id,
        Err(_) => return JsonResponse::unauthorized("Invalid user ID").into_response(),
    };

    match state.users.find_public_user_by_id(user_id).await {
        Ok(Some(user)) => {
            let user_json = to_value(&user).expect("User serialization failed");
            Json(json!({ "success": true, "user": user_json })).into_response()
        }
        Ok(None) => JsonResponse::unauthorized("User not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "me", error = ?e, "user lookup failed");
            JsonResponse::server_error("Database error").into_response()
        }
    }
}
