use thiserror::Error;

pub type Result<T> = std::result::Result<T, TbenchError>;

/// Error taxonomy: configuration, transport, protocol, schedule-file
/// and control-queue errors. Transport/schedule errors are recovered by
/// dumping the binary log and terminating the process; protocol errors
/// are fatal assertions (see `tbench_client`'s terminal paths for where
/// each variant is handled).
#[derive(Debug, Error)]
pub enum TbenchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("schedule file error: {0}")]
    Schedule(String),

    #[error("control queue error: {0}")]
    ControlQueue(String),
}
