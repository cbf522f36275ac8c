use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::time::Duration;

use tbench_accum::ClientCore;
use tbench_core::TbenchError;
use tracing::{error, info};

use crate::workers::terminal_exit;

/// Workload-schedule driver: reads `qps,seconds` lines from `path`
/// (`#`-prefixed lines ignored), calling `update_qps` then sleeping
/// `seconds` before advancing. On EOF or a malformed line, dumps the
/// binary log and terminates the process.
pub fn run_schedule_driver(core: Arc<ClientCore>, path: &str, lats_path: &str) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, path, "failed to open workload schedule file");
            terminal_exit(&core, lats_path);
        }
    };

    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!(error = %e, "failed to read workload schedule file");
                terminal_exit(&core, lats_path);
            }
        };

        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_schedule_line(&line) {
            Ok((qps, seconds)) => {
                info!(qps, seconds, "applying workload schedule step");
                core.update_qps(qps);
                std::thread::sleep(Duration::from_secs(seconds));
            }
            Err(e) => {
                error!(error = %e, line, "malformed workload schedule line");
                terminal_exit(&core, lats_path);
            }
        }
    }

    info!("finished all workload schedule steps, exiting");
    terminal_exit(&core, lats_path);
}

fn parse_schedule_line(line: &str) -> Result<(f64, u64), TbenchError> {
    let mut parts = line.split(',');
    let qps_str = parts
        .next()
        .ok_or_else(|| TbenchError::Schedule(format!("missing qps field: {line:?}")))?;
    let secs_str = parts
        .next()
        .ok_or_else(|| TbenchError::Schedule(format!("missing seconds field: {line:?}")))?;
    if parts.next().is_some() {
        return Err(TbenchError::Schedule(format!(
            "expected exactly two fields: {line:?}"
        )));
    }

    let qps: f64 = qps_str
        .trim()
        .parse()
        .map_err(|_| TbenchError::Schedule(format!("invalid qps: {qps_str:?}")))?;
    let seconds: u64 = secs_str
        .trim()
        .parse()
        .map_err(|_| TbenchError::Schedule(format!("invalid seconds: {secs_str:?}")))?;

    if qps <= 0.0 {
        return Err(TbenchError::Schedule(format!("qps must be > 0: {qps}")));
    }

    Ok((qps, seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_line() {
        let (qps, seconds) = parse_schedule_line("500,2").unwrap();
        assert_eq!(qps, 500.0);
        assert_eq!(seconds, 2);
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(parse_schedule_line("not-a-line").is_err());
        assert!(parse_schedule_line("500").is_err());
        assert!(parse_schedule_line("500,2,3").is_err());
        assert!(parse_schedule_line("0,2").is_err());
    }
}
