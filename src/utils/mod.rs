pub mod format;
pub mod logging;
pub mod tty;

pub use format::format_duration;
pub use tty::find_serial_device;
