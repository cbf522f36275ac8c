mod arrival;
mod clock;

pub use arrival::ArrivalDist;
pub use clock::{now_ns, sleep_until_at_least, sleep_until_ns};
