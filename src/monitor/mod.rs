pub mod controller;
pub mod loop_worker;
pub mod state;

pub use controller::MonitorController;
pub use loop_worker::Workmon;
pub use state::{Alert, Maximums, MonitorRuntimeState, MonitorSnapshot, Sample};
