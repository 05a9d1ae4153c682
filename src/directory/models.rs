use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Closed role enumeration.
///
/// The only capability the verification flow cares about is whether a role is
/// issued a long-lived personal secret at registration time instead of
/// receiving OTPs by email.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Teacher,
    Admin,
    Superadmin,
}

impl Role {
    /// Students and teachers verify with a personal secret code; staff roles
    /// verify with an emailed OTP.
    #[must_use]
    pub fn requires_personal_secret(self) -> bool {
        matches!(self, Self::Student | Self::Teacher)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Teacher => "TEACHER",
            Self::Admin => "ADMIN",
            Self::Superadmin => "SUPERADMIN",
        }
    }

    #[must_use]
    pub fn parse(role: &str) -> Option<Self> {
        match role.to_uppercase().as_str() {
            "STUDENT" => Some(Self::Student),
            "TEACHER" => Some(Self::Teacher),
            "ADMIN" => Some(Self::Admin),
            "SUPERADMIN" => Some(Self::Superadmin),
            _ => None,
        }
    }
}

/// A user directory entry. Holds the hashes but is never serialized to
/// callers; responses go through [`PublicUser`].
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub card_number: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub secret_hash: Option<String>,
    pub confirmed: bool,
    pub account_id: Option<Uuid>,
}

/// An account record: the login credential bound to exactly one user.
///
/// `registered` and `reserved` are status flags consumed by the booking
/// features outside this service; they are carried, not interpreted.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub registered: bool,
    pub reserved: bool,
    pub deleted: bool,
}

/// Public-safe projection of a user: no secret hash, no password, no account
/// internals.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub card_number: Option<String>,
    pub role: Role,
    pub confirmed: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            card_number: user.card_number.clone(),
            role: user.role,
            confirmed: user.confirmed,
        }
    }
}
