//! Manually advanced clock
//!
//! Lets E2E tests move the server's notion of "now" past a token's expiry
//! without sleeping.

use chrono::{DateTime, Duration, Utc};
use songify_auth::clock::Clock;
use std::sync::atomic::{AtomicI64, Ordering};

/// Clock that only moves when told to. Second resolution.
///
/// # Example
/// ```rust,ignore
/// let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
/// let server = TestAuthServer::spawn_with_clock(clock.clone()).await?;
/// clock.advance(Duration::minutes(61));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    secs: AtomicI64,
}

impl ManualClock {
    pub fn at_timestamp(secs: i64) -> Self {
        Self {
            secs: AtomicI64::new(secs),
        }
    }

    /// Start at the current wall-clock second.
    pub fn starting_now() -> Self {
        Self::at_timestamp(Utc::now().timestamp())
    }

    pub fn timestamp(&self) -> i64 {
        self.secs.load(Ordering::SeqCst)
    }

    pub fn set(&self, secs: i64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.secs.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.timestamp(), 0).expect("test clock in range")
    }
}
