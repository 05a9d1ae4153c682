//! Request/response types for the verification and account endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::directory::{PublicUser, Role, User};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct BeginVerificationRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConfirmRequest {
    pub email: String,
    /// The submitted OTP or personal secret code.
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SetPasswordRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Registration payload. Unknown fields are rejected outright rather than
/// silently dropped.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct RegisterUserRequest {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    /// Housing card number; required for roles verified by personal secret.
    pub card_number: Option<String>,
}

/// How the caller should proceed after beginning verification.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum VerificationMode {
    /// The identity holds a personal secret; submit it to confirm.
    #[serde(rename = "secret-prompt")]
    SecretPrompt,
    /// A one-time passcode was emailed; submit it to confirm.
    #[serde(rename = "otp-sent")]
    OtpSent,
}

/// Non-sensitive identity summary returned by begin-verification. Never
/// carries the secret or its hash.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerificationSummary {
    pub email: String,
    pub card_number: Option<String>,
    pub role: Role,
}

impl From<&User> for VerificationSummary {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            card_number: user.card_number.clone(),
            role: user.role,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct BeginVerificationResponse {
    pub code: u16,
    pub message: String,
    pub mode: VerificationMode,
    pub user: VerificationSummary,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConfirmResponse {
    pub code: u16,
    pub message: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SetPasswordResponse {
    /// True when this call created the account, false when it rotated the
    /// password on the existing one.
    pub created: bool,
    pub user: PublicUser,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignInResponse {
    pub user: PublicUser,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterUserResponse {
    pub code: u16,
    pub message: String,
    pub user: PublicUser,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub code: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_mode_wire_names() -> anyhow::Result<()> {
        assert_eq!(
            serde_json::to_string(&VerificationMode::SecretPrompt)?,
            "\"secret-prompt\""
        );
        assert_eq!(
            serde_json::to_string(&VerificationMode::OtpSent)?,
            "\"otp-sent\""
        );
        Ok(())
    }

    #[test]
    fn test_register_request_rejects_unknown_fields() {
        let payload = r#"{
            "firstname": "Alice",
            "lastname": "Martin",
            "email": "alice@example.com",
            "phone": "0700000000",
            "role": "STUDENT",
            "card_number": "20230042",
            "is_admin": true
        }"#;
        assert!(serde_json::from_str::<RegisterUserRequest>(payload).is_err());
    }

    #[test]
    fn test_register_request_parses_role() -> anyhow::Result<()> {
        let payload = r#"{
            "firstname": "Alice",
            "lastname": "Martin",
            "email": "alice@example.com",
            "phone": "0700000000",
            "role": "STUDENT",
            "card_number": "20230042"
        }"#;
        let request: RegisterUserRequest = serde_json::from_str(payload)?;
        assert_eq!(request.role, Role::Student);
        Ok(())
    }
}
