//! Directory administration: registering users and resetting personal
//! secret codes.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::email::{render_secret_email, render_secret_reset_email};
use crate::api::error::ApiError;
use crate::directory::{
    storage,
    storage::{CreateUserOutcome, NewUser},
    PublicUser, Role,
};
use crate::token;

use super::state::AuthState;
use super::types::{MessageResponse, RegisterUserRequest, RegisterUserResponse};
use super::utils::{
    bearer_token, generate_numeric_code, hash_secret, normalize_email, valid_email,
};

/// Register a new directory entry.
///
/// Roles verified by personal secret get one generated, hashed and emailed as
/// part of registration; the housing card number is mandatory for them. Other
/// roles are registered without a secret and verify by OTP later.
#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterUserResponse),
        (status = 400, description = "Validation error or duplicate email", body = crate::api::error::ErrorBody)
    ),
    tag = "users"
)]
pub async fn register_user(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterUserRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request: RegisterUserRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::Validation("Missing payload".to_string())),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".to_string()));
    }

    let firstname = request.firstname.trim();
    let lastname = request.lastname.trim();
    let phone = request.phone.trim();
    if firstname.is_empty() || lastname.is_empty() || phone.is_empty() {
        return Err(ApiError::Validation(
            "firstname, lastname and phone are required".to_string(),
        ));
    }

    let card_number = request
        .card_number
        .as_deref()
        .map(str::trim)
        .filter(|number| !number.is_empty());

    let secret = if request.role.requires_personal_secret() {
        if card_number.is_none() {
            return Err(ApiError::Validation(
                "card_number is required for this role".to_string(),
            ));
        }
        Some(generate_numeric_code(state.config().secret_length())?)
    } else {
        None
    };

    let secret_hash = secret
        .as_deref()
        .map(|plaintext| hash_secret(plaintext, state.config().bcrypt_cost()))
        .transpose()?;

    let new_user = NewUser {
        email: &email,
        firstname,
        lastname,
        card_number,
        phone,
        role: request.role,
        secret_hash: secret_hash.as_deref(),
    };

    let user_id = match storage::insert_user(&pool, &new_user).await? {
        CreateUserOutcome::Created(id) => id,
        CreateUserOutcome::DuplicateEmail => {
            return Err(ApiError::Validation("Email already registered".to_string()));
        }
        CreateUserOutcome::DuplicateCardNumber => {
            return Err(ApiError::Validation(
                "Card number already registered".to_string(),
            ));
        }
    };

    if let Some(secret) = secret.as_deref() {
        state
            .mailer()
            .send(&render_secret_email(&email, firstname, secret))?;
    }

    info!(email = %email, role = %request.role.as_str(), "user registered");

    let user = storage::find_user_by_id(&pool, user_id)
        .await?
        .ok_or_else(|| ApiError::from(anyhow::anyhow!("registered user {user_id} vanished")))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterUserResponse {
            code: StatusCode::CREATED.as_u16(),
            message: "User registered".to_string(),
            user: PublicUser::from(&user),
        }),
    ))
}

/// Reset a user's personal secret code. Admin-only; the caller authenticates
/// with a bearer session token. Non-admin callers get the same not-found as a
/// missing user, so the endpoint does not confirm which ids exist.
#[utoipa::path(
    post,
    path = "/v1/users/{id}/secret/reset",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Secret reset and emailed", body = MessageResponse),
        (status = 401, description = "Missing or invalid session token", body = crate::api::error::ErrorBody),
        (status = 404, description = "Unknown user or not permitted", body = crate::api::error::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn reset_secret(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = token::verify(&token, state.config().token_secret())
        .map_err(|_| ApiError::Unauthorized("Invalid session token".to_string()))?;

    if !matches!(claims.role, Role::Admin | Role::Superadmin) {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let user = storage::find_user_by_id(&pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !user.role.requires_personal_secret() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let secret = generate_numeric_code(state.config().secret_length())?;
    let secret_hash = hash_secret(&secret, state.config().bcrypt_cost())?;
    storage::set_user_secret(&pool, user.id, &secret_hash).await?;

    state
        .mailer()
        .send(&render_secret_reset_email(&user.email, &user.firstname, &secret))?;

    info!(user_id = %user.id, admin = %claims.sub, "personal secret reset");

    Ok(Json(MessageResponse {
        code: StatusCode::OK.as_u16(),
        message: "Secret reset and emailed".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    fn auth_state() -> Arc<AuthState> {
        Arc::new(AuthState::default())
    }

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    fn register_request(role: Role, card_number: Option<&str>) -> RegisterUserRequest {
        RegisterUserRequest {
            firstname: "Alice".to_string(),
            lastname: "Martin".to_string(),
            email: "alice@example.com".to_string(),
            phone: "0700000000".to_string(),
            role,
            card_number: card_number.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_register_missing_payload() -> Result<()> {
        let response = register_user(Extension(lazy_pool()?), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_rejects_blank_names() -> Result<()> {
        let mut request = register_request(Role::Admin, None);
        request.firstname = "   ".to_string();
        let response = register_user(
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(Json(request)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_student_requires_card_number() -> Result<()> {
        for card_number in [None, Some("  ")] {
            let response = register_user(
                Extension(lazy_pool()?),
                Extension(auth_state()),
                Some(Json(register_request(Role::Student, card_number))),
            )
            .await
            .into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_secret_requires_bearer_token() -> Result<()> {
        let response = reset_secret(
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Path(Uuid::new_v4()),
            HeaderMap::new(),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_secret_rejects_garbage_token() -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_static("Bearer not.a.jwt"),
        );
        let response = reset_secret(
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Path(Uuid::new_v4()),
            headers,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_secret_hides_endpoint_from_non_admins() -> Result<()> {
        // The default state signs with "dev-secret"; mint a student token
        // against the same secret so only the role check can fail.
        let secret = SecretString::from("dev-secret".to_string());
        let token = token::sign(Uuid::new_v4(), Role::Student, &secret, 60)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
        let response = reset_secret(
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Path(Uuid::new_v4()),
            headers,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }
}
