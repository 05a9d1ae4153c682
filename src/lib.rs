//! # Pavillon (Identity Verification & Account Provisioning)
//!
//! `pavillon` confirms registered identities for a student housing platform and
//! lets a confirmed identity bind a login credential.
//!
//! ## Verification flow
//!
//! A bare identity (an email known to the user directory) goes through:
//!
//! 1. **Begin verification** — depending on the identity's role, either a
//!    one-time passcode (OTP) is generated and emailed, or the caller is
//!    prompted for the personal secret code issued at registration time.
//! 2. **Confirm** — the submitted code is checked against the in-memory
//!    challenge store (OTP, single use, 10 minute expiry) or against the
//!    bcrypt hash of the personal secret (reusable, never expires). Success
//!    flips the identity's `confirmed` flag.
//! 3. **Set password** — a confirmed identity creates its account record
//!    (at most one per identity) or rotates the password on the existing one,
//!    and receives a signed session token.
//!
//! ## Roles
//!
//! Roles form a closed enum (`STUDENT`, `TEACHER`, `ADMIN`, `SUPERADMIN`).
//! Students and teachers are issued a personal secret and never receive OTPs;
//! staff roles verify by OTP. The capability lives in one table,
//! [`directory::Role::requires_personal_secret`].
//!
//! ## Security posture
//!
//! Passwords and personal secrets are stored as bcrypt hashes. OTP and
//! password mismatch messages are intentionally generic to avoid account
//! enumeration; an invalid or expired OTP is reported with a dedicated 498
//! status so clients can offer a "resend code" flow.

pub mod api;
pub mod cli;
pub mod directory;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
