use std::sync::Arc;

use tbench_accum::ClientCore;
use tbench_core::ResponseTag;
use tbench_transport::TcpTransport;
use tracing::error;

use crate::codec::WorkloadCodec;

/// Persists the binary latency log and terminates the process
/// immediately, bypassing normal unwinding — other worker threads may
/// be holding the `ClientCore` lock or blocked in a syscall, so a
/// graceful shutdown is not attempted. This is the
/// Rust analogue of the original's direct `exit_group` syscall: the
/// dump happens first and the exit is unconditional afterwards.
pub fn terminal_exit(core: &ClientCore, lats_path: &str) -> ! {
    if let Err(e) = core.dump_binary(lats_path) {
        error!(error = %e, path = lats_path, "failed to persist binary latency log");
    }
    std::process::exit(0)
}

/// Open-loop sender: repeatedly generates a request and sends it,
/// never waiting for a reply. A transport error is
/// process-fatal after the binary log is dumped.
pub fn sender_loop(
    core: Arc<ClientCore>,
    transport: Arc<TcpTransport>,
    codec: Arc<dyn WorkloadCodec>,
    lats_path: Arc<str>,
) {
    loop {
        let req = core.start_req(|| codec.gen_request());
        if let Err(e) = transport.send(&req) {
            error!(error = %e, "send() failed, not sending further requests");
            terminal_exit(&core, &lats_path);
        }
    }
}

/// Open-loop receiver: blocks on `recv`, dispatches by response tag.
/// Protocol errors (unknown tag, unknown id, svc>sojourn) are fatal
/// assertions; transport errors dump the log and terminate.
pub fn receiver_loop(core: Arc<ClientCore>, transport: Arc<TcpTransport>, lats_path: Arc<str>) {
    loop {
        let resp = match transport.recv() {
            Ok(resp) => resp,
            Err(e) => {
                error!(error = %e, "recv() failed");
                terminal_exit(&core, &lats_path);
            }
        };

        match resp.tag {
            ResponseTag::Response => core
                .fini_req(&resp)
                .unwrap_or_else(|e| panic!("protocol error in fini_req: {e}")),
            ResponseTag::RoiBegin => core
                .start_roi()
                .unwrap_or_else(|e| panic!("protocol error in start_roi: {e}")),
            ResponseTag::Finish => terminal_exit(&core, &lats_path),
        }
    }
}

/// Closed-loop fused worker: issues the next request only after the
/// previous reply.
pub fn closed_loop_worker(
    core: Arc<ClientCore>,
    transport: Arc<TcpTransport>,
    codec: Arc<dyn WorkloadCodec>,
    lats_path: Arc<str>,
) {
    loop {
        let req = core.start_req(|| codec.gen_request());
        if let Err(e) = transport.send(&req) {
            error!(error = %e, "send() failed, not sending further requests");
            terminal_exit(&core, &lats_path);
        }

        let resp = match transport.recv() {
            Ok(resp) => resp,
            Err(e) => {
                error!(error = %e, "recv() failed");
                terminal_exit(&core, &lats_path);
            }
        };

        match resp.tag {
            ResponseTag::Response => core
                .fini_req(&resp)
                .unwrap_or_else(|e| panic!("protocol error in fini_req: {e}")),
            ResponseTag::RoiBegin => core
                .start_roi()
                .unwrap_or_else(|e| panic!("protocol error in start_roi: {e}")),
            ResponseTag::Finish => terminal_exit(&core, &lats_path),
        }
    }
}
