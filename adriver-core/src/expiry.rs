//! Cookie expiration timestamps.

use crate::ExpiryPolicy;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Produces the expiry attached to every cookie write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryClock {
    retention: TimeDelta,
    frozen: Option<DateTime<Utc>>,
}

impl ExpiryClock {
    /// Build a clock. Under [`ExpiryPolicy::FrozenAtLoad`] the expiry is fixed now.
    pub fn new(policy: ExpiryPolicy, retention: Duration) -> Self {
        let retention = TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX);
        let frozen = match policy {
            ExpiryPolicy::FrozenAtLoad => Some(add_saturating(Utc::now(), retention)),
            ExpiryPolicy::PerWrite => None,
        };
        Self { retention, frozen }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        if self.frozen.is_some() {
            ExpiryPolicy::FrozenAtLoad
        } else {
            ExpiryPolicy::PerWrite
        }
    }

    /// Expiry for a write happening now.
    pub fn expires_at(&self) -> DateTime<Utc> {
        match self.frozen {
            Some(at) => at,
            None => add_saturating(Utc::now(), self.retention),
        }
    }

    /// A timestamp already in the past, used to expire a cookie.
    pub fn expired() -> DateTime<Utc> {
        DateTime::from_timestamp(0, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

fn add_saturating(now: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frozen_expiry_is_stable() {
        let clock = ExpiryClock::new(ExpiryPolicy::FrozenAtLoad, Duration::from_secs(60));
        let first = clock.expires_at();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.expires_at(), first);
        assert_eq!(clock.policy(), ExpiryPolicy::FrozenAtLoad);
    }

    #[test]
    fn test_per_write_expiry_tracks_now() {
        let retention = Duration::from_secs(3600);
        let clock = ExpiryClock::new(ExpiryPolicy::PerWrite, retention);
        let window = TimeDelta::from_std(retention).expect("retention fits");

        let before = Utc::now();
        let at = clock.expires_at();
        let after = Utc::now();

        assert!(at >= before + window);
        assert!(at <= after + window);
    }

    #[test]
    fn test_expired_is_in_the_past() {
        assert!(ExpiryClock::expired() < Utc::now());
    }

    #[test]
    fn test_huge_retention_saturates() {
        let clock = ExpiryClock::new(ExpiryPolicy::PerWrite, Duration::MAX);
        assert_eq!(clock.expires_at(), DateTime::<Utc>::MAX_UTC);
    }
}
