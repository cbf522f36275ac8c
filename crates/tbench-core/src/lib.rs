mod config;
mod error;
mod model;

pub use config::ClientConfig;
pub use error::{Result, TbenchError};
pub use model::{LatencySample, Phase, Request, Response, ResponseTag, MAX_REQ_BYTES, MAX_RESP_BYTES};
