//! Session token issuer.
//!
//! Tokens are stateless HS256 JWTs asserting the user's durable id and role
//! for a bounded lifetime. There is no revocation list; downstream middleware
//! verifies the signature and expiry on each request.

use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::directory::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

fn unix_now() -> Result<i64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?;

    i64::try_from(now.as_secs()).context("system clock out of range")
}

/// Mint a fresh session token for the given user id and role.
///
/// # Errors
/// Returns an error if the clock is unusable or signing fails.
pub fn sign(user_id: Uuid, role: Role, secret: &SecretString, ttl_seconds: i64) -> Result<String> {
    let iat = unix_now()?;
    let claims = Claims {
        sub: user_id,
        role,
        iat,
        exp: iat + ttl_seconds,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .context("failed to sign session token")
}

/// Verify a session token's signature and expiry, returning its claims.
///
/// # Errors
/// Returns an error for malformed, tampered or expired tokens.
pub fn verify(token: &str, secret: &SecretString) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .context("invalid session token")?;

    Ok(data.claims)
}
