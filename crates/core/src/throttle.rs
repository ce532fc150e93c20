//! Throttle delay computation

use std::time::Duration;

/// Delay before re-issuing a throttled request.
///
/// The `x-amzn-ratelimit-limit` header (requests per second) wins when it is
/// numeric and positive: the delay is `1 / rate`. Otherwise the operation's
/// restore rate (seconds) is used. Returns `None` when neither applies.
pub fn restore_delay(rate_limit: Option<&str>, restore_rate: Option<f64>) -> Option<Duration> {
    let from_header = rate_limit
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|rate| rate.is_finite() && *rate > 0.0)
        .map(|rate| 1.0 / rate);
    from_header
        .or_else(|| restore_rate.filter(|seconds| seconds.is_finite() && *seconds > 0.0))
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
}
