//! Backoff helpers for polling and rate-limit reporting.

use std::time::Duration;

/// Delay before the next status check.
///
/// `streak` counts consecutive polls that saw the same status, starting at 0.
/// The delay is `base * factor^streak`, capped at `max`. Never shorter than
/// `base`, even when `max` is configured below it.
pub fn next_delay(streak: u32, base: Duration, factor: f64, max: Duration) -> Duration {
    let factor = if factor.is_finite() { factor.max(1.0) } else { 1.0 };
    let scaled = base.as_secs_f64() * factor.powi(streak.min(64) as i32);
    let capped = scaled.min(max.as_secs_f64().max(base.as_secs_f64()));
    Duration::from_secs_f64(capped)
}

/// Parse the Retry-After header value to get retry delay in seconds.
///
/// Only the integer seconds form is understood.
pub fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_poll_uses_base() {
        let delay = next_delay(0, Duration::from_secs(5), 1.5, Duration::from_secs(30));
        assert_eq!(delay, Duration::from_secs(5));
    }

    #[test]
    fn test_delay_grows_with_streak() {
        let base = Duration::from_secs(10);
        let max = Duration::from_secs(30);
        let first = next_delay(0, base, 1.5, max);
        let second = next_delay(1, base, 1.5, max);
        let third = next_delay(2, base, 1.5, max);
        assert_eq!(second, Duration::from_secs(15));
        assert_eq!(third, Duration::from_millis(22500));
        assert!(first < second && second < third);
    }

    #[test]
    fn test_delay_respects_max() {
        let delay = next_delay(20, Duration::from_secs(10), 1.5, Duration::from_secs(30));
        assert_eq!(delay, Duration::from_secs(30));
    }

    #[test]
    fn test_max_below_base_keeps_base() {
        let delay = next_delay(3, Duration::from_secs(10), 2.0, Duration::from_secs(1));
        assert_eq!(delay, Duration::from_secs(10));
    }

    #[test]
    fn test_factor_below_one_is_flat() {
        let delay = next_delay(4, Duration::from_secs(2), 0.5, Duration::from_secs(30));
        assert_eq!(delay, Duration::from_secs(2));
    }
}
