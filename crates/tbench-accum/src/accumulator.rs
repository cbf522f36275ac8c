use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tbench_core::LatencySample;

/// Three parallel nanosecond sample sequences — queue, service, sojourn
/// — plus percentile computation and a raw binary dump.
/// Only the sojourn vector feeds `snapshot_percentiles`; queue and
/// service are retained solely for the binary log.
#[derive(Debug, Default)]
pub struct LatencyAccumulator {
    queue_ns: Vec<u64>,
    svc_ns: Vec<u64>,
    sjrn_ns: Vec<u64>,
}

impl LatencyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, sample: LatencySample) {
        self.queue_ns.push(sample.queue_ns);
        self.svc_ns.push(sample.svc_ns);
        self.sjrn_ns.push(sample.sojourn_ns);
    }

    pub fn len(&self) -> usize {
        self.sjrn_ns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sjrn_ns.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue_ns.clear();
        self.svc_ns.clear();
        self.sjrn_ns.clear();
    }

    /// p50/p95/p99 sojourn latency in milliseconds, `None` if empty.
    /// Indices are `floor(N * p / 100)` on the ascending-sorted sojourn
    /// vector, matching the original's integer truncation
    /// `(reqs * pr) / 100` exactly.
    pub fn snapshot_percentiles(&self) -> Option<(f64, f64, f64)> {
        if self.sjrn_ns.is_empty() {
            return None;
        }
        let mut sorted = self.sjrn_ns.clone();
        sorted.sort_unstable();
        let n = sorted.len();
        let idx = |p: u64| -> usize { ((n as u64 * p) / 100) as usize };
        let ns_to_ms = |ns: u64| ns as f64 / 1_000_000.0;
        Some((
            ns_to_ms(sorted[idx(50)]),
            ns_to_ms(sorted[idx(95)]),
            ns_to_ms(sorted[idx(99)]),
        ))
    }

    /// Writes `(queue_ns, svc_ns, sojourn_ns)` for each recorded sample
    /// as three consecutive little-endian u64s, in insertion order — no
    /// header, no footer.
    pub fn dump_binary(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        for r in 0..self.sjrn_ns.len() {
            out.write_all(&self.queue_ns[r].to_le_bytes())?;
            out.write_all(&self.svc_ns[r].to_le_bytes())?;
            out.write_all(&self.sjrn_ns[r].to_le_bytes())?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sample(q: u64, s: u64, j: u64) -> LatencySample {
        LatencySample::new(q, s, j).unwrap()
    }

    #[test]
    fn empty_accumulator_has_no_percentiles() {
        let acc = LatencyAccumulator::new();
        assert!(acc.snapshot_percentiles().is_none());
    }

    #[test]
    fn percentile_indexing_matches_floor_formula() {
        let mut acc = LatencyAccumulator::new();
        for i in 0..100u64 {
            let ns = (i + 1) * 1000;
            acc.append(sample(0, ns, ns));
        }
        let (p50, p95, p99) = acc.snapshot_percentiles().unwrap();
        assert_eq!(p50, 51_000.0 / 1_000_000.0);
        assert_eq!(p95, 96_000.0 / 1_000_000.0);
        assert_eq!(p99, 100_000.0 / 1_000_000.0);
    }

    #[test]
    fn clear_empties_all_three_vectors() {
        let mut acc = LatencyAccumulator::new();
        acc.append(sample(1, 2, 3));
        acc.clear();
        assert!(acc.is_empty());
        assert!(acc.snapshot_percentiles().is_none());
    }

    #[test]
    fn dump_binary_round_trips_exact_triples() {
        let mut acc = LatencyAccumulator::new();
        acc.append(sample(100, 200, 300));
        acc.append(sample(400, 100, 500));
        acc.append(sample(50, 50, 100));

        let dir = std::env::temp_dir();
        let path = dir.join(format!("tbench-test-{}.bin", std::process::id()));
        acc.dump_binary(&path).unwrap();

        let mut bytes = Vec::new();
        File::open(&path).unwrap().read_to_end(&mut bytes).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bytes.len(), 72);

        let mut decoded = Vec::new();
        for chunk in bytes.chunks_exact(24) {
            let q = u64::from_le_bytes(chunk[0..8].try_into().unwrap());
            let s = u64::from_le_bytes(chunk[8..16].try_into().unwrap());
            let j = u64::from_le_bytes(chunk[16..24].try_into().unwrap());
            decoded.push((q, s, j));
        }
        assert_eq!(
            decoded,
            vec![(100, 200, 300), (400, 100, 500), (50, 50, 100)]
        );
    }
}
