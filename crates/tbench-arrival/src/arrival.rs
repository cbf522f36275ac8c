use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};

/// Arrival-process generator: open-loop exponential or closed-loop
/// fixed-interval, sharing the contract "produce a non-decreasing
/// timestamp sequence". A tagged enum is the natural Rust rendition of
/// the original's small `Dist` class hierarchy (`dist.h`).
pub enum ArrivalDist {
    OpenLoop {
        rng: StdRng,
        lambda_per_ns: f64,
        exp: Exp<f64>,
        cur_ns: u64,
    },
    ClosedLoop {
        interval_ns: u64,
        cur_ns: u64,
    },
}

impl ArrivalDist {
    /// Open-loop exponential arrivals: `lambda_per_ns` requests per
    /// nanosecond, seeded PRNG, anchored at `start_ns`.
    pub fn open_loop(lambda_per_ns: f64, seed: u64, start_ns: u64) -> Self {
        let exp = Exp::new(lambda_per_ns).expect("lambda must be > 0");
        ArrivalDist::OpenLoop {
            rng: StdRng::seed_from_u64(seed),
            lambda_per_ns,
            exp,
            cur_ns: start_ns,
        }
    }

    /// Closed-loop fixed-interval arrivals, anchored at `start_ns`.
    pub fn closed_loop(interval_ns: u64, start_ns: u64) -> Self {
        ArrivalDist::ClosedLoop {
            interval_ns,
            cur_ns: start_ns,
        }
    }

    /// Draws the next arrival timestamp. Open-loop ignores `now`;
    /// closed-loop requires it — calling the closed-loop variant without
    /// `now` is a programming error, matching
    /// the original's `assert(false)` on the mismatched overload.
    pub fn next_arrival_ns(&mut self, now: Option<u64>) -> u64 {
        match self {
            ArrivalDist::OpenLoop { rng, exp, cur_ns, .. } => {
                let delta = exp.sample(rng) as u64;
                *cur_ns += delta;
                *cur_ns
            }
            ArrivalDist::ClosedLoop { interval_ns, cur_ns } => {
                let now = now.expect("closed-loop nextArrivalNs requires `now`");
                *cur_ns += *interval_ns;
                if *cur_ns < now {
                    *cur_ns = now;
                    return now;
                }
                *cur_ns
            }
        }
    }

    /// Rewrites the interval/rate in place; the next `next_arrival_ns`
    /// call uses the new value. The reference implementation only
    /// supports this for closed-loop; this implementation additionally
    /// supports it for open-loop by rebuilding the exponential
    /// distribution with a new λ derived from the same interval
    /// convention (`interval_ns` is `1e9 / qps`, so `λ = 1 / interval_ns`
    /// recovers the requests-per-ns rate), so a workload schedule
    /// applies to both arrival modes. See DESIGN.md.
    pub fn update_interval(&mut self, interval_ns: u64) {
        match self {
            ArrivalDist::ClosedLoop { interval_ns: i, .. } => {
                *i = interval_ns;
            }
            ArrivalDist::OpenLoop { lambda_per_ns, exp, .. } => {
                *lambda_per_ns = 1.0 / interval_ns as f64;
                *exp = Exp::new(*lambda_per_ns).expect("lambda must be > 0");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_loop_nondecreasing_and_no_pileup() {
        let mut dist = ArrivalDist::closed_loop(1_000_000, 0);
        let a = dist.next_arrival_ns(Some(0));
        assert_eq!(a, 1_000_000);
        // A huge jump in "now" must clamp without accumulating a backlog.
        let b = dist.next_arrival_ns(Some(10_000_000_000));
        assert_eq!(b, 10_000_000_000);
        let c = dist.next_arrival_ns(Some(10_000_000_000));
        assert_eq!(c, 10_001_000_000);
        assert!(c >= b);
    }

    #[test]
    fn closed_loop_without_now_panics() {
        let mut dist = ArrivalDist::closed_loop(1000, 0);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            dist.next_arrival_ns(None)
        }));
        assert!(result.is_err());
    }

    #[test]
    fn open_loop_nondecreasing() {
        let mut dist = ArrivalDist::open_loop(1e-3, 42, 0);
        let mut prev = 0;
        for _ in 0..1000 {
            let next = dist.next_arrival_ns(None);
            assert!(next >= prev);
            prev = next;
        }
    }

    #[test]
    fn open_loop_update_interval_shifts_mean() {
        let mut dist = ArrivalDist::open_loop(1e-3, 7, 0);
        dist.update_interval(10_000_000); // lambda = 1e-7 per ns, i.e. mean inter-arrival 10ms
        let mut prev = 0u64;
        let mut total = 0u64;
        for _ in 0..2000 {
            let next = dist.next_arrival_ns(None);
            total += next - prev;
            prev = next;
        }
        let mean = total as f64 / 2000.0;
        // Mean inter-arrival should be roughly 10ms with generous tolerance.
        assert!(mean > 5_000_000.0 && mean < 20_000_000.0);
    }
}
