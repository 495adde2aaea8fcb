use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::routes::auth::claims::Claims;
use crate::utils::jwt::decode_jwt;

/// Any authenticated principal.
#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| StatusCode::UNAUTHORIZED)?;

        let claims = decode_jwt(bearer.token()).map_err(|_| StatusCode::UNAUTHORIZED)?;

        Ok(AuthSession(claims.claims))
    }
}

/// itsm_team or admin.
#[derive(Debug, PartialEq)]
pub struct TeamSession(pub Claims);

impl<S> FromRequestParts<S> for TeamSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthSession(claims) = AuthSession::from_request_parts(parts, state).await?;
        if !claims.role.is_staff() {
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(TeamSession(claims))
    }
}

/// admin only.
#[derive(Debug, PartialEq)]
pub struct AdminSession(pub Claims);

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthSession(claims) = AuthSession::from_request_parts(parts, state).await?;
        if claims.role != crate::models::user::UserRole::Admin {
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(AdminSession(claims))
    }
}

#[cfg(test)]
pub mod tests {
    use axum::{
        extract::FromRequestParts,
        http::{header, Method, Request, StatusCode},
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::models::user::UserRole;
    use crate::routes::auth::claims::Claims;
    use crate::routes::auth::session::{AdminSession, AuthSession, TeamSession};
    use crate::utils::jwt::create_jwt;

    pub fn make_jwt(role: UserRole) -> String {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let claims = Claims {
            id: uuid::Uuid::new_v4().to_string(),
            email: "test@example.com".into(),
            name: "Test User".into(),
            role,
            exp: (SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs()
                + 3600) as usize,
        };
        create_jwt(&claims).expect("JWT should create successfully")
    }

    pub fn make_jwt_for(id: uuid::Uuid, role: UserRole) -> String {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let claims = Claims {
            id: id.to_string(),
            email: "test@example.com".into(),
            name: "Test User".into(),
            role,
            exp: (SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs()
                + 3600) as usize,
        };
        create_jwt(&claims).expect("JWT should create successfully")
    }

    fn parts_with_bearer(token: &str) -> axum::http::request::Parts {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[tokio::test]
    async fn test_valid_token_extracted() {
        let jwt = make_jwt(UserRole::Customer);
        let mut parts = parts_with_bearer(&jwt);

        let result = AuthSession::from_request_parts(&mut parts, &()).await;

        assert!(result.is_ok());
        let session = result.unwrap();
        assert_eq!(session.0.email, "test@example.com");
        assert_eq!(session.0.role, UserRole::Customer);
    }

    #[tokio::test]
    async fn test_missing_header_returns_unauthorized() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &()).await;

        assert_eq!(result, Err(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_invalid_token_returns_unauthorized() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let mut parts = parts_with_bearer("invalid.token.here");
        let result = AuthSession::from_request_parts(&mut parts, &()).await;

        assert_eq!(result, Err(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_team_gate_rejects_customer() {
        let jwt = make_jwt(UserRole::Customer);
        let mut parts = parts_with_bearer(&jwt);

        let result = TeamSession::from_request_parts(&mut parts, &()).await;
        assert_eq!(result, Err(StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn test_team_gate_admits_itsm_team_and_admin() {
        for role in [UserRole::ItsmTeam, UserRole::Admin] {
            let jwt = make_jwt(role);
            let mut parts = parts_with_bearer(&jwt);
            let result = TeamSession::from_request_parts(&mut parts, &()).await;
            assert!(result.is_ok());
        }
    }

    #[tokio::test]
    async fn test_admin_gate_rejects_itsm_team() {
        let jwt = make_jwt(UserRole::ItsmTeam);
        let mut parts = parts_with_bearer(&jwt);

        let result = AdminSession::from_request_parts(&mut parts, &()).await;
        assert_eq!(result, Err(StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn test_admin_gate_admits_admin() {
        let jwt = make_jwt(UserRole::Admin);
        let mut parts = parts_with_bearer(&jwt);

        let result = AdminSession::from_request_parts(&mut parts, &()).await;
        assert!(result.is_ok());
    }
}
