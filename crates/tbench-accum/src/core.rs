use std::cell::Cell;
use std::sync::{Barrier, Mutex};

use tbench_arrival::{ArrivalDist, now_ns, sleep_until_at_least, sleep_until_ns};
use tbench_core::{ClientConfig, LatencySample, Phase, Request, Response, ResponseTag, Result, TbenchError};
use tracing::info;

use crate::accumulator::LatencyAccumulator;
use crate::request_table::RequestTable;

/// Which arrival policy this run uses — selected once at startup from
/// the binary's build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalMode {
    OpenLoop,
    ClosedLoop,
}

struct CoreState {
    phase: Phase,
    table: RequestTable,
    next_id: u64,
    dist: Option<ArrivalDist>,
    accum: LatencyAccumulator,
}

thread_local! {
    static PASSED_STARTUP: Cell<bool> = const { Cell::new(false) };
}

/// Coordinator owning the `RequestTable`, `LatencyAccumulator` and
/// `ArrivalDist` behind a single exclusive lock, plus the startup
/// barrier. A single instance is shared across worker
/// threads via `Arc<ClientCore>`.
pub struct ClientCore {
    state: Mutex<CoreState>,
    barrier: Barrier,
    mode: ArrivalMode,
    config: ClientConfig,
}

impl ClientCore {
    pub fn new(mode: ArrivalMode, config: ClientConfig) -> Self {
        let nthreads = config.nthreads;
        Self {
            state: Mutex::new(CoreState {
                phase: Phase::Init,
                table: RequestTable::new(),
                next_id: 0,
                dist: None,
                accum: LatencyAccumulator::new(),
            }),
            barrier: Barrier::new(nthreads),
            mode,
            config,
        }
    }

    /// First call on any worker thread: waits at the startup barrier,
    /// the first thread past it initializes `ArrivalDist` and
    /// transitions INIT -> WARMUP under the lock, then all threads wait
    /// at a second barrier before proceeding. Rust's `Barrier`
    /// is reusable across calls, so this collapses the original's
    /// destroy/reinitialize dance into two sequential `.wait()` calls on
    /// the same instance.
    fn ensure_started(&self) {
        if PASSED_STARTUP.with(|c| c.get()) {
            return;
        }
        self.barrier.wait();
        {
            let mut st = self.state.lock().expect("client core lock poisoned");
            if st.phase == Phase::Init {
                let cur_ns = now_ns();
                let dist = match self.mode {
                    ArrivalMode::OpenLoop => {
                        ArrivalDist::open_loop(self.config.lambda_per_ns(), self.config.rand_seed, cur_ns)
                    }
                    ArrivalMode::ClosedLoop => {
                        ArrivalDist::closed_loop(self.config.interval_ns(), cur_ns)
                    }
                };
                st.dist = Some(dist);
                st.phase = Phase::Warmup;
            }
        }
        self.barrier.wait();
        PASSED_STARTUP.with(|c| c.set(true));
    }

    /// Allocates a fresh ID, computes `gen_ns` from the shared
    /// `ArrivalDist`, inserts the request into the table, then sleeps
    /// until its generation timestamp before returning it to the caller
    ///. `gen_payload` — the external request-body
    /// generator — is invoked outside the lock (SPEC_FULL.md design
    /// note: "lock held across generator callback"); only ID allocation
    /// and `gen_ns` assignment are atomic with respect to each other.
    pub fn start_req<F>(&self, gen_payload: F) -> Request
    where
        F: FnOnce() -> Vec<u8>,
    {
        self.ensure_started();

        let payload = gen_payload();

        let (req, gen_ns) = {
            let mut st = self.state.lock().expect("client core lock poisoned");
            let id = st.next_id;
            st.next_id += 1;
            let cur_ns = now_ns();
            let now_arg = match self.mode {
                ArrivalMode::OpenLoop => None,
                ArrivalMode::ClosedLoop => Some(cur_ns),
            };
            let gen_ns = st
                .dist
                .as_mut()
                .expect("dist initialized by ensure_started")
                .next_arrival_ns(now_arg);
            let req = Request::new(id, gen_ns, payload).expect("payload within MAX_REQ_BYTES");
            st.table.insert(req.clone());
            (req, gen_ns)
        };

        match self.mode {
            ArrivalMode::OpenLoop => sleep_until_ns(gen_ns),
            ArrivalMode::ClosedLoop => sleep_until_at_least(gen_ns, self.config.min_sleep_ns),
        }

        req
    }

    /// Looks up the response's request by ID, computes and records the
    /// sample if `Phase::Roi` is active and `now` strictly exceeds
    /// `gen_ns`, then removes the table entry regardless of phase
    ///. Returns `TbenchError::Protocol` on lookup
    /// failure or a `svc_ns > sojourn_ns` inconsistency — both are
    /// fatal protocol errors.
    pub fn fini_req(&self, resp: &Response) -> Result<()> {
        let mut st = self.state.lock().expect("client core lock poisoned");
        let req = st
            .table
            .remove(resp.id)
            .ok_or_else(|| TbenchError::Protocol(format!("unknown request id {}", resp.id)))?;

        if st.phase == Phase::Roi {
            let now = now_ns();
            if now > req.gen_ns {
                let sojourn_ns = now - req.gen_ns;
                let queue_ns = sojourn_ns.checked_sub(resp.svc_ns).ok_or_else(|| {
                    TbenchError::Protocol(format!(
                        "svc_ns ({}) exceeds sojourn_ns ({sojourn_ns})",
                        resp.svc_ns
                    ))
                })?;
                let sample = LatencySample::new(queue_ns, resp.svc_ns, sojourn_ns)?;
                st.accum.append(sample);
            }
        }
        Ok(())
    }

    /// Transitions WARMUP -> ROI and clears the sample vectors. Calling
    /// outside WARMUP (including a second call) is fatal.
    pub fn start_roi(&self) -> Result<()> {
        let mut st = self.state.lock().expect("client core lock poisoned");
        if st.phase != Phase::Warmup {
            return Err(TbenchError::Protocol(
                "start_roi called outside WARMUP".to_string(),
            ));
        }
        st.phase = Phase::Roi;
        st.accum.clear();
        info!("entering region of interest");
        Ok(())
    }

    /// Blocks (polling) until `ArrivalDist` is initialized, then
    /// updates its interval/rate to `10^9 / qps`.
    /// `qps` must be strictly positive.
    pub fn update_qps(&self, qps: f64) {
        assert!(qps > 0.0, "update_qps requires qps > 0, got {qps}");
        let interval_ns = (1e9 / qps).round() as u64;
        loop {
            let mut st = self.state.lock().expect("client core lock poisoned");
            if let Some(dist) = st.dist.as_mut() {
                dist.update_interval(interval_ns);
                return;
            }
            drop(st);
            std::thread::yield_now();
        }
    }

    pub fn snapshot_percentiles(&self) -> Option<(f64, f64, f64)> {
        let st = self.state.lock().expect("client core lock poisoned");
        st.accum.snapshot_percentiles()
    }

    pub fn clear_accumulator(&self) {
        let mut st = self.state.lock().expect("client core lock poisoned");
        st.accum.clear();
    }

    pub fn dump_binary(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        let st = self.state.lock().expect("client core lock poisoned");
        st.accum.dump_binary(path)
    }

    pub fn sample_count(&self) -> usize {
        let st = self.state.lock().expect("client core lock poisoned");
        st.accum.len()
    }
}

/// Dispatches a response by tag: `Response` -> `fini_req`, `RoiBegin` ->
/// `start_roi`, `Finish` -> signals the caller to dump and terminate.
/// Returns `true` if the caller should continue dispatching, `false` on
/// `Finish`.
pub fn dispatch(core: &ClientCore, resp: Response) -> Result<bool> {
    match resp.tag {
        ResponseTag::Response => {
            core.fini_req(&resp)?;
            Ok(true)
        }
        ResponseTag::RoiBegin => {
            core.start_roi()?;
            Ok(true)
        }
        ResponseTag::Finish => Ok(false),
    }
}
