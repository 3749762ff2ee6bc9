//! Retry spacing.

use std::time::Duration;

use rand::Rng;

/// Delay before the attempt following `failed_attempt` (1-based).
///
/// Doubles from `base_ms` per failed attempt, plus up to 10% jitter. The
/// result never exceeds `max_ms`.
pub fn retry_delay(failed_attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if failed_attempt == 0 || max_ms == 0 {
        return Duration::ZERO;
    }

    let shift = (failed_attempt - 1).min(63);
    let nominal = base_ms.saturating_mul(1u64 << shift).min(max_ms);

    let jitter = match nominal / 10 {
        0 => 0,
        spread => rand::thread_rng().gen_range(0..=spread),
    };

    Duration::from_millis((nominal + jitter).min(max_ms))
}
