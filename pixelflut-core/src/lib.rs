pub mod counters;
pub mod framebuffer;
pub mod hex;
pub mod test_helpers;

pub const WIDTH: usize = 1920;
pub const HEIGHT: usize = 1080;

/// Max length of a well-formed command, used to size the per-connection carry buffer.
/// `PX 1234 1234 rrggbbaa\n` is the longest command we ever need to reassemble.
pub const CARRY_BUFFER_CAPACITY: usize = 50;
