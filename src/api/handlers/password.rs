//! Password set-up: binds a verified identity to a sign-in account, or
//! rotates the password on the account it is already bound to.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiError;
use crate::directory::{storage, storage::CreateAccountOutcome, PublicUser};
use crate::token;

use super::state::AuthState;
use super::types::{SetPasswordRequest, SetPasswordResponse};
use super::utils::{hash_secret, normalize_email, valid_email};

const MIN_PASSWORD_LENGTH: usize = 6;

/// Create the sign-in account for a verified user, or update the password on
/// the linked account. At most one account ever gets linked to a user: the
/// link is claimed with a compare-and-swap on the nullable `account_id`
/// column, so a concurrent duplicate loses and its account row is rolled
/// back with the transaction.
#[utoipa::path(
    post,
    path = "/v1/account/password",
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Account created or password updated", body = SetPasswordResponse),
        (status = 400, description = "Validation error or unverified identity", body = crate::api::error::ErrorBody),
        (status = 404, description = "Unknown user", body = crate::api::error::ErrorBody)
    ),
    tag = "account"
)]
pub async fn set_password(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<SetPasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request: SetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(ApiError::Validation("Missing payload".to_string())),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".to_string()));
    }

    if request.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let user = storage::find_user_by_email(&pool, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let password_hash = hash_secret(&request.password, state.config().bcrypt_cost())?;

    let created = match user.account_id {
        None => {
            if !user.confirmed {
                return Err(ApiError::Validation(
                    "Identity not yet verified, restart the verification flow".to_string(),
                ));
            }

            let mut tx = pool.begin().await.map_err(anyhow::Error::from)?;

            let account_id =
                match storage::insert_account(&mut tx, &user.email, &password_hash).await? {
                    CreateAccountOutcome::Created(id) => id,
                    CreateAccountOutcome::DuplicateEmail => {
                        tx.rollback().await.map_err(anyhow::Error::from)?;
                        return Err(ApiError::Validation(
                            "An account already exists for this email".to_string(),
                        ));
                    }
                };

            // Claim the link; losing the race means another request already
            // bound an account to this user.
            if !storage::link_account(&mut tx, user.id, account_id).await? {
                tx.rollback().await.map_err(anyhow::Error::from)?;
                return Err(ApiError::Validation(
                    "An account is already linked to this user".to_string(),
                ));
            }

            tx.commit().await.map_err(anyhow::Error::from)?;
            info!(email = %email, account_id = %account_id, "account created and linked");
            true
        }
        Some(account_id) => {
            // Re-running the flow on a bound user rotates the password only.
            let account = storage::find_account_by_id(&pool, account_id)
                .await?
                .ok_or_else(|| {
                    ApiError::from(anyhow::anyhow!(
                        "account link {account_id} on user {} is dangling",
                        user.id
                    ))
                })?;

            storage::update_account_password(&pool, account.id, &password_hash).await?;
            info!(email = %email, "account password updated");
            false
        }
    };

    let token = token::sign(
        user.id,
        user.role,
        state.config().token_secret(),
        state.config().session_ttl_seconds(),
    )?;

    Ok(Json(SetPasswordResponse {
        created,
        user: PublicUser::from(&user),
        token,
    }))
}
