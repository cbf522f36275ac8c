use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tbench_accum::{ArrivalMode, ClientCore};
use tbench_client::{FixedPayloadCodec, WorkloadCodec};
use tbench_client::workers::{closed_loop_worker, receiver_loop, sender_loop};
use tbench_core::ClientConfig;
use tbench_transport::TcpTransport;
use tracing::{error, info};

/// Debug/override flags. The primary configuration surface is the
/// `TBENCH_*` environment family; these flags only cover
/// knobs that are not part of that contract.
#[derive(Parser, Debug)]
struct Args {
    /// Path to the binary latency log written at termination.
    #[arg(long, default_value = "lats.bin")]
    lats_path: String,

    /// Path used to derive the control-queue key via `ftok` (only used
    /// when built with the `control-channel` feature).
    #[arg(long, default_value = "/tmp/tbench-client-mq")]
    mq_path: String,

    /// Project id used to derive the control-queue key via `ftok`.
    #[arg(long, default_value_t = 0x7462)]
    mq_project_id: i32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::try_init().ok();

    let args = Args::parse();

    let config = ClientConfig::from_env().context("loading client configuration")?;

    let mode = if cfg!(feature = "closed-loop") {
        ArrivalMode::ClosedLoop
    } else {
        ArrivalMode::OpenLoop
    };

    info!(?mode, nthreads = config.nthreads, server = %config.server, port = config.server_port, "starting tbench client");

    let core = Arc::new(ClientCore::new(mode, config.clone()));

    let transport = Arc::new(
        TcpTransport::connect(&config.server, config.server_port)
            .context("connecting to server")?,
    );

    let codec: Arc<dyn WorkloadCodec> = Arc::new(FixedPayloadCodec::default());
    let lats_path: Arc<str> = Arc::from(args.lats_path.as_str());

    spawn_dumper(Arc::clone(&core), &config, &args);

    if let Some(path) = config.workload_dec.clone() {
        let core = Arc::clone(&core);
        let lats_path = lats_path.to_string();
        thread::spawn(move || {
            tbench_client::schedule::run_schedule_driver(core, &path, &lats_path);
        });
    }

    let mut handles = Vec::new();

    match mode {
        ArrivalMode::OpenLoop => {
            for _ in 0..config.nthreads {
                let core = Arc::clone(&core);
                let transport = Arc::clone(&transport);
                let codec = Arc::clone(&codec);
                let lats_path = Arc::clone(&lats_path);
                handles.push(thread::spawn(move || {
                    sender_loop(core, transport, codec, lats_path)
                }));
            }
            for _ in 0..config.nthreads {
                let core = Arc::clone(&core);
                let transport = Arc::clone(&transport);
                let lats_path = Arc::clone(&lats_path);
                handles.push(thread::spawn(move || receiver_loop(core, transport, lats_path)));
            }
        }
        ArrivalMode::ClosedLoop => {
            for _ in 0..config.nthreads {
                let core = Arc::clone(&core);
                let transport = Arc::clone(&transport);
                let codec = Arc::clone(&codec);
                let lats_path = Arc::clone(&lats_path);
                handles.push(thread::spawn(move || {
                    closed_loop_worker(core, transport, codec, lats_path)
                }));
            }
        }
    }

    // Join every sender AND every receiver handle — the original's
    // corresponding C loop had a `receiver[t]`/`receivers[t]` mismatch
    // that silently skipped joining the receiver array;
    // this implementation joins every handle spawned above, full stop.
    for h in handles {
        let _ = h.join();
    }

    Ok(())
}

#[cfg(feature = "control-channel")]
fn spawn_dumper(core: Arc<ClientCore>, _config: &ClientConfig, args: &Args) {
    let mq_path = args.mq_path.clone();
    let project_id = args.mq_project_id;
    thread::spawn(move || {
        if let Err(e) = tbench_control::run_control_channel_dumper(core, &mq_path, project_id) {
            error!(error = %e, "control channel dumper failed");
            std::process::exit(1);
        }
    });
}

#[cfg(not(feature = "control-channel"))]
fn spawn_dumper(core: Arc<ClientCore>, config: &ClientConfig, _args: &Args) {
    let interval = Duration::from_secs(config.measure_sleep_sec);
    thread::spawn(move || {
        tbench_control::run_periodic_dumper(core, interval);
    });
}
