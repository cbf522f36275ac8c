pub mod codec;
pub mod schedule;
pub mod workers;

pub use codec::{FixedPayloadCodec, WorkloadCodec};
