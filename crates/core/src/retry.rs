//! Backoff schedule for retried Ollama requests.

use std::time::Duration;

/// Delay before the first retry, in milliseconds
pub const INITIAL_BACKOFF_MS: u64 = 100;

/// Longest single delay between attempts, in milliseconds
pub const MAX_BACKOFF_MS: u64 = 5_000;

/// Delay to wait after failed attempt number `attempt` (1-based).
///
/// Doubles from `INITIAL_BACKOFF_MS` and never exceeds `MAX_BACKOFF_MS`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let ms = 2_u64
        .checked_pow(attempt)
        .and_then(|factor| factor.checked_mul(INITIAL_BACKOFF_MS))
        .unwrap_or(MAX_BACKOFF_MS)
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(400));
        assert_eq!(backoff_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_delay(6), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(10), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn test_backoff_large_attempt_does_not_overflow() {
        assert_eq!(backoff_delay(64), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_millis(MAX_BACKOFF_MS));
    }
}
