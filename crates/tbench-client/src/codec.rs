/// The workload-specific request-body generator: an external
/// collaborator supplying opaque bytes, deliberately kept outside the
/// client core. Modeled as a trait so the worker loops and tests can be
/// exercised against a stand-in implementation without a real
/// latency-critical workload.
pub trait WorkloadCodec: Send + Sync {
    fn gen_request(&self) -> Vec<u8>;
}

/// Minimal stand-in codec: emits a fixed-size zeroed payload. Real
/// deployments swap this for a workload-specific generator (e.g. an
/// image, a SQL query, a search term) linked in at build time, exactly
/// as the original links a `tbench_client_networked.cpp`-style
/// workload object against `client.cpp`.
pub struct FixedPayloadCodec {
    len: usize,
}

impl FixedPayloadCodec {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl Default for FixedPayloadCodec {
    fn default() -> Self {
        Self::new(64)
    }
}

impl WorkloadCodec for FixedPayloadCodec {
    fn gen_request(&self) -> Vec<u8> {
        vec![0u8; self.len]
    }
}
