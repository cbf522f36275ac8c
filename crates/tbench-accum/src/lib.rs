mod accumulator;
mod core;
mod request_table;

pub use accumulator::LatencyAccumulator;
pub use core::{dispatch, ArrivalMode, ClientCore};
pub use request_table::RequestTable;
