#[cfg(feature = "periodic-dumper")]
mod periodic;

#[cfg(feature = "control-channel")]
mod control_channel;

#[cfg(feature = "periodic-dumper")]
pub use periodic::run_periodic_dumper;

#[cfg(feature = "control-channel")]
pub use control_channel::{run_control_channel_dumper, CMD_FINISH, CMD_GET_LAT, CMD_PUT_LAT};
