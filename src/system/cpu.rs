//! CPU-time unit conversion
//!
//! Operating systems report accumulated CPU time in their own clock units.
//! These helpers turn them into `Duration`s. The results are elapsed
//! durations only; they are not valid wall-clock timestamps.

use std::time::Duration;

use crate::constants::{FILETIME_TICK_NANOS, NANOS_PER_SEC};

/// Combines the two halves of a FILETIME into one 100-nanosecond tick count
#[cfg_attr(not(windows), allow(dead_code))]
pub fn filetime_ticks(high: u32, low: u32) -> u64 {
    ((high as u64) << 32) | (low as u64)
}

/// Converts a FILETIME (high/low pair of 100ns ticks) to a duration.
#[cfg_attr(not(windows), allow(dead_code))]
pub fn filetime_to_duration(high: u32, low: u32) -> Duration {
    let nanos = filetime_ticks(high, low) as u128 * FILETIME_TICK_NANOS as u128;
    duration_from_nanos(nanos)
}

/// Converts scheduler clock ticks to a duration.
///
/// `ticks_per_second` comes from the kernel (`_SC_CLK_TCK`, usually 100).
/// A zero rate yields a zero duration rather than dividing by zero.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub fn clock_ticks_to_duration(ticks: u64, ticks_per_second: u64) -> Duration {
    if ticks_per_second == 0 {
        return Duration::ZERO;
    }
    let nanos = ticks as u128 * NANOS_PER_SEC as u128 / ticks_per_second as u128;
    duration_from_nanos(nanos)
}

fn duration_from_nanos(nanos: u128) -> Duration {
    let secs = nanos / NANOS_PER_SEC as u128;
    let subsec = (nanos % NANOS_PER_SEC as u128) as u32;
    match u64::try_from(secs) {
        Ok(secs) => Duration::new(secs, subsec),
        Err(_) => Duration::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filetime_ticks_combines_halves() {
        assert_eq!(filetime_ticks(0, 5), 5);
        assert_eq!(filetime_ticks(1, 0), 1 << 32);
        assert_eq!(filetime_ticks(1, 1), (1 << 32) | 1);
    }

    #[test]
    fn test_filetime_to_duration() {
        // 5_000_000 ticks of 100ns = 500ms
        assert_eq!(filetime_to_duration(0, 5_000_000), Duration::from_millis(500));
        // high word only: 2^32 * 100ns
        assert_eq!(
            filetime_to_duration(1, 0),
            Duration::from_nanos((1u64 << 32) * 100)
        );
    }

    #[test]
    fn test_filetime_max_does_not_overflow() {
        let d = filetime_to_duration(u32::MAX, u32::MAX);
        assert_eq!(d.as_nanos(), u64::MAX as u128 * 100);
    }

    #[test]
    fn test_clock_ticks_to_duration() {
        assert_eq!(clock_ticks_to_duration(250, 100), Duration::from_millis(2500));
        assert_eq!(clock_ticks_to_duration(1, 3), Duration::from_nanos(333_333_333));
        assert_eq!(clock_ticks_to_duration(10, 0), Duration::ZERO);
    }
}
