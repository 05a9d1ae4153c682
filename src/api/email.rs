//! Outbound mail seam.
//!
//! Verification and secret-provisioning flows render an [`EmailMessage`] and
//! hand it to an [`EmailSender`]. The sender decides how to deliver (SMTP,
//! API, etc.) and returns `Ok`/`Err`; a dispatch failure propagates to the
//! caller instead of being swallowed, so a verification is never reported as
//! sent when the mail never left.
//!
//! The default sender for local dev is [`LogEmailSender`], which logs and
//! returns `Ok(())`.

use anyhow::Result;
use tracing::info;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

/// Email delivery abstraction.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            body = %message.body,
            "email send stub"
        );
        Ok(())
    }
}

/// Verification email carrying a one-time passcode.
#[must_use]
pub fn render_otp_email(to_email: &str, firstname: &str, code: &str, ttl_minutes: u64) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Your verification code".to_string(),
        body: format!(
            "Hello {firstname},\n\n\
             Your verification code is: {code}\n\n\
             It expires in {ttl_minutes} minutes. If you did not request it, ignore this email.\n"
        ),
    }
}

/// Sent once at registration time for roles that use a personal secret code.
#[must_use]
pub fn render_secret_email(to_email: &str, firstname: &str, secret: &str) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Your personal secret code".to_string(),
        body: format!(
            "Hello {firstname},\n\n\
             Your personal secret code is: {secret}\n\n\
             Keep it safe: you will need it every time you verify your identity.\n"
        ),
    }
}

/// Sent when an administrator resets a personal secret code.
#[must_use]
pub fn render_secret_reset_email(to_email: &str, firstname: &str, secret: &str) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Your personal secret code was reset".to_string(),
        body: format!(
            "Hello {firstname},\n\n\
             Your personal secret code was reset. The new code is: {secret}\n\n\
             The previous code no longer works.\n"
        ),
    }
}
