//! Sign-in against a bound account.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::directory::{storage, PublicUser};
use crate::token;

use super::state::AuthState;
use super::types::{SignInRequest, SignInResponse};
use super::utils::{normalize_email, valid_email, verify_secret};

/// Authenticate with email and password and mint a session token.
///
/// A user without a bound account cannot sign in regardless of the submitted
/// password; that state is reported as not-found rather than unauthorized so
/// the flow points back to registration instead of password retries.
#[utoipa::path(
    post,
    path = "/v1/account/signin",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Incorrect credentials", body = crate::api::error::ErrorBody),
        (status = 404, description = "Unknown user or no account bound", body = crate::api::error::ErrorBody)
    ),
    tag = "account"
)]
pub async fn sign_in(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignInRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request: SignInRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::Validation("Missing payload".to_string())),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".to_string()));
    }

    let user = storage::find_user_by_email(&pool, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let account_id = user.account_id.ok_or_else(|| {
        ApiError::NotFound("No account for this user, register or contact support".to_string())
    })?;

    let account = storage::find_account_by_id(&pool, account_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No account for this user, register or contact support".to_string())
        })?;

    let password_hash = account.password_hash.as_deref().ok_or_else(|| {
        ApiError::NotFound("No account for this user, register or contact support".to_string())
    })?;

    if !verify_secret(&request.password, password_hash)? {
        return Err(ApiError::Unauthorized("Incorrect credentials".to_string()));
    }

    let token = token::sign(
        user.id,
        user.role,
        state.config().token_secret(),
        state.config().session_ttl_seconds(),
    )?;

    Ok(Json(SignInResponse {
        user: PublicUser::from(&user),
        token,
    }))
}
