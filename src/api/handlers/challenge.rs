//! In-memory store for outstanding OTP challenges.
//!
//! One entry per email, overwritten on re-issue (resend invalidates the
//! previous code) and removed on successful consumption. Expired entries are
//! rejected and dropped lazily on lookup; a wrong guess leaves the entry in
//! place so the real code stays usable until it expires.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Time source for challenge expiry, injected so tests can drive the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Clone, Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Clone, Debug)]
struct Challenge {
    code: String,
    expires_at: Instant,
}

pub struct ChallengeStore {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Challenge>>,
}

impl ChallengeStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record a challenge for `email`, overwriting any outstanding one.
    /// Returns the expiration instant.
    pub async fn issue(&self, email: &str, code: String) -> Instant {
        let expires_at = self.clock.now() + self.ttl;
        let mut entries = self.entries.lock().await;
        entries.insert(email.to_string(), Challenge { code, expires_at });
        expires_at
    }

    /// Validate `submitted` against the outstanding challenge for `email`.
    ///
    /// Valid means: an entry exists, the code matches and the current time is
    /// strictly before the expiration. Only a valid match consumes the entry.
    pub async fn consume(&self, email: &str, submitted: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let Some(challenge) = entries.get(email) else {
            return false;
        };

        if now >= challenge.expires_at {
            // Expired; drop it so the map does not accumulate dead entries.
            entries.remove(email);
            return false;
        }

        if challenge.code == submitted {
            entries.remove(email);
            return true;
        }

        false
    }

    /// Number of outstanding challenges, expired ones included.
    pub async fn outstanding(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct ManualClock {
        now: StdMutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: StdMutex::new(Instant::now()),
            })
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    fn store(clock: Arc<ManualClock>) -> ChallengeStore {
        ChallengeStore::with_clock(Duration::from_secs(600), clock)
    }

    #[tokio::test]
    async fn test_correct_code_consumes_exactly_once() {
        let clock = ManualClock::new();
        let store = store(clock);

        store.issue("bob@example.com", "123456".to_string()).await;
        assert!(store.consume("bob@example.com", "123456").await);
        // Entry is gone; the same code no longer validates.
        assert!(!store.consume("bob@example.com", "123456").await);
        assert_eq!(store.outstanding().await, 0);
    }

    #[tokio::test]
    async fn test_wrong_guess_does_not_consume() {
        let clock = ManualClock::new();
        let store = store(clock);

        store.issue("bob@example.com", "123456".to_string()).await;
        assert!(!store.consume("bob@example.com", "000000").await);
        // Real code is still usable after the bad guess.
        assert!(store.consume("bob@example.com", "123456").await);
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected() {
        let clock = ManualClock::new();
        let store = store(clock.clone());

        store.issue("bob@example.com", "123456".to_string()).await;
        clock.advance(Duration::from_secs(600));
        // At the expiration instant the code is already invalid.
        assert!(!store.consume("bob@example.com", "123456").await);
        assert_eq!(store.outstanding().await, 0);
    }

    #[tokio::test]
    async fn test_just_before_expiry_is_valid() {
        let clock = ManualClock::new();
        let store = store(clock.clone());

        store.issue("bob@example.com", "123456".to_string()).await;
        clock.advance(Duration::from_secs(599));
        assert!(store.consume("bob@example.com", "123456").await);
    }

    #[tokio::test]
    async fn test_reissue_overwrites_previous_code() {
        let clock = ManualClock::new();
        let store = store(clock);

        store.issue("bob@example.com", "111111".to_string()).await;
        store.issue("bob@example.com", "222222".to_string()).await;

        // The superseded code is rejected even though it never expired.
        assert!(!store.consume("bob@example.com", "111111").await);
        assert!(store.consume("bob@example.com", "222222").await);
    }

    #[tokio::test]
    async fn test_challenges_are_keyed_by_email() {
        let clock = ManualClock::new();
        let store = store(clock);

        store.issue("a@example.com", "111111".to_string()).await;
        store.issue("b@example.com", "222222".to_string()).await;

        assert!(!store.consume("a@example.com", "222222").await);
        assert!(store.consume("b@example.com", "222222").await);
        assert!(store.consume("a@example.com", "111111").await);
    }

    #[tokio::test]
    async fn test_issue_returns_expiration_at_ttl() {
        let clock = ManualClock::new();
        let issued_at = clock.now();
        let store = store(clock);

        let expires_at = store.issue("bob@example.com", "123456".to_string()).await;
        assert_eq!(expires_at - issued_at, Duration::from_secs(600));
    }
}
