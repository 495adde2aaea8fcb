use axum::{
    extract::{Json, Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    models::user::UserRole,
    responses::JsonResponse,
    routes::auth::session::{AdminSession, AuthSession, TeamSession},
    state::AppState,
    utils::password::hash_password,
};

pub async fn list_customers(
    State(state): State<AppState>,
    TeamSession(_claims): TeamSession,
) -> Response {
    match state.users.list_customers().await {
        Ok(users) => Json(users).into_response(),
        Err(e) => {
            tracing::error!(operation = "list_customers", error = ?e, "customer list failed");
            JsonResponse::server_error("Could not list customers").into_response()
        }
    }
}

pub async fn list_team(
    State(state): State<AppState>,
    TeamSession(_claims): TeamSession,
) -> Response {
    match state.users.list_team().await {
        Ok(users) => Json(users).into_response(),
        Err(e) => {
            tracing::error!(operation = "list_team", error = ?e, "team list failed");
            JsonResponse::server_error("Could not list team members").into_response()
        }
    }
}

pub async fn list_assignees(
    State(state): State<AppState>,
    TeamSession(_claims): TeamSession,
) -> Response {
    match state.users.list_assignees().await {
        Ok(users) => Json(users).into_response(),
        Err(e) => {
            tracing::error!(operation = "list_assignees", error = ?e, "assignee list failed");
            JsonResponse::server_error("Could not list assignees").into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct CreateTeamMemberPayload {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: UserRole,
}

/// Admin-only creation of staff accounts. Customer accounts go through
/// signup or the access-request flow, never through here.
pub async fn create_team_member(
    State(state): State<AppState>,
    AdminSession(_claims): AdminSession,
    Json(payload): Json<CreateTeamMemberPayload>,
) -> Response {
    if !payload.role.is_staff() {
        return JsonResponse::bad_request("Role must be admin or itsm_team").into_response();
    }
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return JsonResponse::bad_request("Email and password are required").into_response();
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(operation = "create_team_member", error = %e, "password hashing failed");
            return JsonResponse::server_error("Something went wrong").into_response();
        }
    };

    match state
        .users
        .create_team_member(
            payload.email.trim(),
            &password_hash,
            payload.name.trim(),
            payload.role,
        )
        .await
    {
        Ok(user) => (
            axum::http::StatusCode::CREATED,
            Json(json!({ "message": "Team member created", "user": user })),
        )
            .into_response(),
        Err(e) => {
            // Unique email violation surfaces as a distinct Conflict.
            if e.as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code == "23505")
            {
                return JsonResponse::conflict("Email is already in use").into_response();
            }
            tracing::error!(operation = "create_team_member", error = ?e, "user insert failed");
            JsonResponse::server_error("Could not create the team member").into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct ApprovePayload {
    pub approve: bool,
}

pub async fn approve_user(
    State(state): State<AppState>,
    AdminSession(_claims): AdminSession,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ApprovePayload>,
) -> Response {
    let user = match state.users.set_approved(user_id, payload.approve).await {
        Ok(Some(user)) => user,
        Ok(None) => return JsonResponse::not_found("User not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "approve_user", %user_id, error = ?e, "approval update failed");
            return JsonResponse::server_error("Could not update the user").into_response();
        }
    };

    if payload.approve {
        if let Err(e) = state.notifier.user_approved(&user.email, &user.name).await {
            tracing::error!(operation = "approve_user", %user_id, error = %e, "approval mail failed");
        }
    }

    Json(json!({
        "message": if payload.approve { "User approved" } else { "Approval revoked" },
        "user": user
    }))
    .into_response()
}

#[derive(Deserialize)]
pub struct UpdateProfilePayload {
    pub name: String,
    pub company_name: Option<String>,
}

/// Profile edits are allowed for the account owner or an admin.
pub async fn update_profile(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Response {
    if claims.id != user_id.to_string() && claims.role != UserRole::Admin {
        return JsonResponse::forbidden("No permission to edit this user").into_response();
    }
    if payload.name.trim().is_empty() {
        return JsonResponse::bad_request("Name is required").into_response();
    }

    match state
        .users
        .update_profile(user_id, payload.name.trim(), payload.company_name.as_deref())
        .await
    {
        Ok(Some(user)) => {
            Json(json!({ "message": "Profile updated", "user": user })).into_response()
        }
        Ok(None) => JsonResponse::not_found("User not found").into_response(),
        Err(e) => {
            tracing::error!(operation = "update_profile", %user_id, error = ?e, "profile update failed");
            JsonResponse::server_error("Could not update the profile").into_response()
        }
    }
}
