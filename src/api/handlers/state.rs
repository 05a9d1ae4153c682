//! Shared handler state and configuration.

use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

use crate::api::email::{EmailSender, LogEmailSender};

use super::challenge::ChallengeStore;

const DEFAULT_OTP_TTL_SECONDS: u64 = 600;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_OTP_LENGTH: usize = 6;
const DEFAULT_SECRET_LENGTH: usize = 4;
const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    token_secret: SecretString,
    otp_ttl_seconds: u64,
    session_ttl_seconds: i64,
    otp_length: usize,
    secret_length: usize,
    bcrypt_cost: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(token_secret: SecretString) -> Self {
        Self {
            token_secret,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            otp_length: DEFAULT_OTP_LENGTH,
            secret_length: DEFAULT_SECRET_LENGTH,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: u64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_length(mut self, length: usize) -> Self {
        self.otp_length = length;
        self
    }

    #[must_use]
    pub fn with_secret_length(mut self, length: usize) -> Self {
        self.secret_length = length;
        self
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn token_secret(&self) -> &SecretString {
        &self.token_secret
    }

    #[must_use]
    pub fn otp_ttl_seconds(&self) -> u64 {
        self.otp_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn otp_length(&self) -> usize {
        self.otp_length
    }

    #[must_use]
    pub fn secret_length(&self) -> usize {
        self.secret_length
    }

    #[must_use]
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

/// Construction-time dependencies of the verification flow: configuration,
/// the challenge store and the mailer. Injected into handlers via
/// `Extension<Arc<AuthState>>` so tests can substitute a fresh store and a
/// recording sender.
pub struct AuthState {
    config: AuthConfig,
    challenges: ChallengeStore,
    mailer: Arc<dyn EmailSender>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, mailer: Arc<dyn EmailSender>) -> Self {
        let challenges = ChallengeStore::new(Duration::from_secs(config.otp_ttl_seconds()));
        Self {
            config,
            challenges,
            mailer,
        }
    }

    /// Like [`AuthState::new`] but with a caller-provided challenge store,
    /// so tests can seed challenges or drive a custom clock.
    #[must_use]
    pub fn with_challenge_store(
        config: AuthConfig,
        challenges: ChallengeStore,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            config,
            challenges,
            mailer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn EmailSender {
        self.mailer.as_ref()
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new(
            AuthConfig::new(SecretString::from("dev-secret".to_string())),
            Arc::new(LogEmailSender),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AuthConfig::new(SecretString::from("s".to_string()));
        assert_eq!(config.otp_ttl_seconds(), 600);
        assert_eq!(config.session_ttl_seconds(), 43_200);
        assert_eq!(config.otp_length(), 6);
        assert_eq!(config.secret_length(), 4);
        assert_eq!(config.bcrypt_cost(), 10);
    }

    #[test]
    fn test_config_builders() {
        let config = AuthConfig::new(SecretString::from("s".to_string()))
            .with_otp_ttl_seconds(60)
            .with_session_ttl_seconds(120)
            .with_otp_length(8)
            .with_secret_length(6)
            .with_bcrypt_cost(4);
        assert_eq!(config.otp_ttl_seconds(), 60);
        assert_eq!(config.session_ttl_seconds(), 120);
        assert_eq!(config.otp_length(), 8);
        assert_eq!(config.secret_length(), 6);
        assert_eq!(config.bcrypt_cost(), 4);
    }
}
