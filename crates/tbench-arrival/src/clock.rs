use std::sync::OnceLock;
use std::time::{Duration, Instant};

static START: OnceLock<Instant> = OnceLock::new();

fn start() -> Instant {
    *START.get_or_init(Instant::now)
}

/// Monotonic nanosecond clock. Anchored to first use
/// within the process so that samples are unaffected by wall-clock
/// adjustments; only relative ordering and deltas are ever compared.
pub fn now_ns() -> u64 {
    start().elapsed().as_nanos() as u64
}

/// Blocks the caller until the monotonic clock reaches `target_ns`.
/// Returns immediately if `target_ns <= now_ns()`. Loops to absorb
/// spurious early wakeups from `thread::sleep`.
pub fn sleep_until_ns(target_ns: u64) {
    loop {
        let now = now_ns();
        if now >= target_ns {
            return;
        }
        std::thread::sleep(Duration::from_nanos(target_ns - now));
    }
}

/// Closed-loop variant: sleeps until `max(target_ns, now_ns() + min_sleep_ns)`,
/// enforcing a minimum per-request sleep.
pub fn sleep_until_at_least(target_ns: u64, min_sleep_ns: u64) {
    let effective = target_ns.max(now_ns().saturating_add(min_sleep_ns));
    sleep_until_ns(effective);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_until_past_returns_immediately() {
        let before = now_ns();
        sleep_until_ns(0);
        let after = now_ns();
        // Should not have blocked for any meaningful duration.
        assert!(after - before < Duration::from_millis(50).as_nanos() as u64);
    }

    #[test]
    fn sleep_until_future_blocks_at_least_target() {
        let target = now_ns() + Duration::from_millis(5).as_nanos() as u64;
        sleep_until_ns(target);
        assert!(now_ns() >= target);
    }
}
