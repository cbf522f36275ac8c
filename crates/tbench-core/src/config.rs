use std::env;
use std::str::FromStr;

use crate::error::{Result, TbenchError};

/// Environment-variable configuration surface. This is the
/// harness's primary configuration mechanism, not a stand-in for a CLI —
/// TailBench-style clients are invoked with their tuning knobs set in the
/// process environment by the surrounding experiment driver.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub min_sleep_ns: u64,
    pub rand_seed: u64,
    pub qps: f64,
    pub nthreads: usize,
    pub server: String,
    pub server_port: u16,
    pub measure_sleep_sec: u64,
    pub workload_dec: Option<String>,
}

fn get_opt<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| TbenchError::Config(format!("{name}={raw:?} is not a valid value"))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => {
            Err(TbenchError::Config(format!("{name} is not valid UTF-8")))
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the `TBENCH_*` environment variables,
    /// applying the documented defaults. Rejects non-positive QPS and
    /// thread counts at startup.
    pub fn from_env() -> Result<Self> {
        let min_sleep_ns = get_opt("TBENCH_MINSLEEPNS", 0u64)?;
        let rand_seed = get_opt("TBENCH_RANDSEED", 0u64)?;
        let qps = get_opt("TBENCH_QPS", 1000.0f64)?;
        let nthreads = get_opt("TBENCH_CLIENT_THREADS", 1usize)?;
        let server = get_opt("TBENCH_SERVER", String::new())?;
        let server_port = get_opt("TBENCH_SERVER_PORT", 8080u16)?;
        let measure_sleep_sec = get_opt("TBENCH_MEASURE_SLEEP_SEC", 5u64)?;
        let workload_dec = {
            let raw = get_opt("TBENCH_WORKLOAD_DEC", String::new())?;
            if raw.is_empty() { None } else { Some(raw) }
        };

        if qps <= 0.0 {
            return Err(TbenchError::Config(format!("TBENCH_QPS must be > 0, got {qps}")));
        }
        if nthreads == 0 {
            return Err(TbenchError::Config(
                "TBENCH_CLIENT_THREADS must be > 0".to_string(),
            ));
        }

        Ok(Self {
            min_sleep_ns,
            rand_seed,
            qps,
            nthreads,
            server,
            server_port,
            measure_sleep_sec,
            workload_dec,
        })
    }

    /// The initial inter-arrival rate in requests/ns, as consumed by
    /// `ArrivalDist`'s open-loop exponential variant.
    pub fn lambda_per_ns(&self) -> f64 {
        self.qps * 1e-9
    }

    /// The initial closed-loop interval in ns, `1e9 / qps`.
    pub fn interval_ns(&self) -> u64 {
        (1e9 / self.qps).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        for var in [
            "TBENCH_MINSLEEPNS",
            "TBENCH_RANDSEED",
            "TBENCH_QPS",
            "TBENCH_CLIENT_THREADS",
            "TBENCH_SERVER",
            "TBENCH_SERVER_PORT",
            "TBENCH_MEASURE_SLEEP_SEC",
            "TBENCH_WORKLOAD_DEC",
        ] {
            unsafe { env::remove_var(var) };
        }
        let cfg = ClientConfig::from_env().unwrap();
        assert_eq!(cfg.min_sleep_ns, 0);
        assert_eq!(cfg.rand_seed, 0);
        assert_eq!(cfg.qps, 1000.0);
        assert_eq!(cfg.nthreads, 1);
        assert_eq!(cfg.server, "");
        assert_eq!(cfg.server_port, 8080);
        assert_eq!(cfg.measure_sleep_sec, 5);
        assert!(cfg.workload_dec.is_none());
    }

    #[test]
    fn rejects_non_positive_qps() {
        unsafe { env::set_var("TBENCH_QPS", "0") };
        let err = ClientConfig::from_env();
        unsafe { env::remove_var("TBENCH_QPS") };
        assert!(err.is_err());
    }

    #[test]
    fn interval_ns_matches_qps() {
        unsafe { env::set_var("TBENCH_QPS", "1000") };
        let cfg = ClientConfig::from_env().unwrap();
        unsafe { env::remove_var("TBENCH_QPS") };
        assert_eq!(cfg.interval_ns(), 1_000_000);
    }
}
