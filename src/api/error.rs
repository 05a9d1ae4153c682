//! Error taxonomy for the API surface.
//!
//! Handlers return `Result<_, ApiError>`; the kind decides the HTTP status
//! and the message is the stable, user-facing text. Internal faults keep
//! their detail server-side: the response body is generic and the cause is
//! logged in full.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Status used for invalid or expired one-time passcodes, kept distinct from
/// plain validation errors so clients can offer a "resend code" flow.
pub const STATUS_CODE_EXPIRED: u16 = 498;

#[derive(Debug)]
pub enum ApiError {
    /// Identity, account or resource absent or misconfigured.
    NotFound(String),
    /// A precondition was violated: unconfirmed account, malformed input,
    /// duplicate resource.
    Validation(String),
    /// Secret or password mismatch. Wording stays generic on purpose.
    Unauthorized(String),
    /// OTP invalid or past its window.
    Expired(String),
    /// Unanticipated fault; detail is logged, never returned to the caller.
    Internal(anyhow::Error),
}

/// Wire shape of every failure: a numeric code mirroring the HTTP status and
/// a human-readable message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Expired(_) => {
                StatusCode::from_u16(STATUS_CODE_EXPIRED).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::NotFound(message)
            | Self::Validation(message)
            | Self::Unauthorized(message)
            | Self::Expired(message) => message.clone(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref err) = self {
            error!("Internal error: {err:?}");
        }

        let status = self.status();
        let body = ErrorBody {
            code: status.as_u16(),
            message: self.message(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::NotFound("x".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Validation("x".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".to_string()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Expired("x".to_string()).status().as_u16(),
            STATUS_CODE_EXPIRED
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let response =
            ApiError::Internal(anyhow::anyhow!("dangling account link")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_expired_is_a_dedicated_status() {
        let response = ApiError::Expired("OTP invalid or expired".to_string()).into_response();
        assert_eq!(response.status().as_u16(), 498);
    }
}
