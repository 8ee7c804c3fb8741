pub mod duration;

pub use duration::DurationTracker;
