//! Small helpers shared by the verification and account handlers.

use anyhow::{Context, Result};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Generate a numeric code (OTP or personal secret) from OS randomness.
///
/// Bytes >= 250 are discarded so every digit is uniformly distributed.
pub(super) fn generate_numeric_code(length: usize) -> Result<String> {
    let mut code = String::with_capacity(length);
    let mut buffer = [0u8; 16];

    while code.len() < length {
        OsRng
            .try_fill_bytes(&mut buffer)
            .context("failed to generate verification code")?;
        for byte in buffer {
            if code.len() == length {
                break;
            }
            if byte < 250 {
                code.push(char::from(b'0' + byte % 10));
            }
        }
    }

    Ok(code)
}

/// Hash a password or personal secret with bcrypt.
pub(super) fn hash_secret(plaintext: &str, cost: u32) -> Result<String> {
    bcrypt::hash(plaintext, cost).context("failed to hash secret")
}

/// Verify a password or personal secret against its stored bcrypt hash.
pub(super) fn verify_secret(plaintext: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(plaintext, hash).context("failed to verify secret")
}

/// Extract a bearer token from the Authorization header.
pub(super) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Bob@Example.COM "), "bob@example.com");
    }

    #[test]
    fn test_valid_email() {
        assert!(valid_email("bob@example.com"));
        assert!(!valid_email("bob@example"));
        assert!(!valid_email("bob example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_generate_numeric_code_shape() -> Result<()> {
        for length in [4, 6, 8] {
            let code = generate_numeric_code(length)?;
            assert_eq!(code.len(), length);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
        Ok(())
    }

    #[test]
    fn test_generate_numeric_code_varies() -> Result<()> {
        // Collisions over 8 digits are vanishingly unlikely across 5 draws.
        let mut codes = std::collections::HashSet::new();
        for _ in 0..5 {
            codes.insert(generate_numeric_code(8)?);
        }
        assert!(codes.len() > 1);
        Ok(())
    }

    #[test]
    fn test_hash_and_verify_secret() -> Result<()> {
        // Minimum cost keeps the test fast.
        let hash = hash_secret("4471", 4)?;
        assert!(verify_secret("4471", &hash)?);
        assert!(!verify_secret("0000", &hash)?);
        Ok(())
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
