use std::sync::Arc;
use std::time::Duration;

use tbench_accum::ClientCore;
use tracing::info;

/// Periodic dumper policy: sleeps for `interval`, then
/// prints p50/p95/p99 and clears the accumulator. Logs a zero-count
/// notice and does nothing if no samples have been recorded yet.
pub fn run_periodic_dumper(core: Arc<ClientCore>, interval: Duration) -> ! {
    loop {
        std::thread::sleep(interval);
        match core.snapshot_percentiles() {
            None => {
                info!("# of reqs=0");
            }
            Some((p50, p95, p99)) => {
                println!("mean latency, {p50}, p95 latency, {p95}, p99 latency, {p99}");
                core.clear_accumulator();
            }
        }
    }
}
