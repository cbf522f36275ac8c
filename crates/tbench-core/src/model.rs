use crate::error::{Result, TbenchError};

/// Maximum payload size for a request, mirroring the original's fixed
/// inline buffer in `Request`.
pub const MAX_REQ_BYTES: usize = 4096;

/// Maximum payload size for a response.
pub const MAX_RESP_BYTES: usize = 4096;

/// Discriminator carried by every response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseTag {
    Response = 0,
    RoiBegin = 1,
    Finish = 2,
}

impl ResponseTag {
    pub fn from_u8(b: u8) -> Result<Self> {
        match b {
            0 => Ok(ResponseTag::Response),
            1 => Ok(ResponseTag::RoiBegin),
            2 => Ok(ResponseTag::Finish),
            other => Err(TbenchError::Protocol(format!(
                "unknown response tag: {other}"
            ))),
        }
    }
}

/// An in-flight request: a unique monotonic ID, its intended emission
/// timestamp (`gen_ns`), and an opaque payload. Owned by the
/// `RequestTable` from generation until the matching response arrives.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: u64,
    pub gen_ns: u64,
    pub payload: Vec<u8>,
}

impl Request {
    pub fn new(id: u64, gen_ns: u64, payload: Vec<u8>) -> Result<Self> {
        if payload.len() > MAX_REQ_BYTES {
            return Err(TbenchError::Protocol(format!(
                "request payload too large: {} > {MAX_REQ_BYTES}",
                payload.len()
            )));
        }
        Ok(Self {
            id,
            gen_ns,
            payload,
        })
    }
}

/// A server response. Ephemeral — consumed immediately on receipt by
/// `ClientCore::fini_req` or the control dispatch in the worker loops.
#[derive(Debug, Clone)]
pub struct Response {
    pub tag: ResponseTag,
    pub id: u64,
    pub svc_ns: u64,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn new(tag: ResponseTag, id: u64, svc_ns: u64, payload: Vec<u8>) -> Result<Self> {
        if payload.len() > MAX_RESP_BYTES {
            return Err(TbenchError::Protocol(format!(
                "response payload too large: {} > {MAX_RESP_BYTES}",
                payload.len()
            )));
        }
        Ok(Self {
            tag,
            id,
            svc_ns,
            payload,
        })
    }
}

/// One recorded sample: `queue_ns + svc_ns == sojourn_ns`, all >= 0.
/// Appended to `LatencyAccumulator`'s three parallel sequences only
/// while `Phase::Roi` is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySample {
    pub queue_ns: u64,
    pub svc_ns: u64,
    pub sojourn_ns: u64,
}

impl LatencySample {
    pub fn new(queue_ns: u64, svc_ns: u64, sojourn_ns: u64) -> Result<Self> {
        if svc_ns > sojourn_ns {
            return Err(TbenchError::Protocol(format!(
                "svc_ns ({svc_ns}) exceeds sojourn_ns ({sojourn_ns})"
            )));
        }
        Ok(Self {
            queue_ns,
            svc_ns,
            sojourn_ns,
        })
    }
}

/// Client lifecycle phase. Monotonic: INIT -> WARMUP -> ROI, never
/// reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Warmup,
    Roi,
}
