use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    fn body(success: bool, msg: &str) -> JsonResponse {
        JsonResponse {
            status: if success { "success" } else { "error" }.to_string(),
            success,
            message: msg.to_string(),
        }
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        (StatusCode::OK, Json(Self::body(true, msg)))
    }

    pub fn created(msg: &str) -> impl IntoResponse {
        (StatusCode::CREATED, Json(Self::body(true, msg)))
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        (StatusCode::BAD_REQUEST, Json(Self::body(false, msg)))
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        (StatusCode::UNAUTHORIZED, Json(Self::body(false, msg)))
    }

    pub fn forbidden(msg: &str) -> impl IntoResponse {
        (StatusCode::FORBIDDEN, Json(Self::body(false, msg)))
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        (StatusCode::NOT_FOUND, Json(Self::body(false, msg)))
    }

    pub fn conflict(msg: &str) -> impl IntoResponse {
        (StatusCode::CONFLICT, Json(Self::body(false, msg)))
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        (StatusCode::TOO_MANY_REQUESTS, Json(Self::body(false, msg)))
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(Self::body(false, msg)))
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use serde_json::from_slice;

    use crate::responses::JsonResponse;

    #[tokio::test]
    async fn test_success_response() {
        let resp = JsonResponse::success("ok").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: JsonResponse = from_slice(&body).unwrap();
        assert_eq!(json.status, "success");
        assert!(json.success);
        assert_eq!(json.message, "ok");
    }

    #[tokio::test]
    async fn test_conflict_response() {
        let resp = JsonResponse::conflict("duplicate").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::CONFLICT);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: JsonResponse = from_slice(&body).unwrap();
        assert_eq!(json.status, "error");
        assert!(!json.success);
        assert_eq!(json.message, "duplicate");
    }

    #[tokio::test]
    async fn test_forbidden_response() {
        let resp = JsonResponse::forbidden("nope").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: JsonResponse = from_slice(&body).unwrap();
        assert!(!json.success);
        assert_eq!(json.message, "nope");
    }
}
