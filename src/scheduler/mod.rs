// Scheduler module - schedule expressions, the run driver and its process guard

mod driver;
mod pid;
mod schedule;
mod signals;

pub use driver::{Driver, DriverState, TriggerOutcome};
pub use pid::PidGuard;
pub use schedule::Schedule;
pub use signals::shutdown_signal;
