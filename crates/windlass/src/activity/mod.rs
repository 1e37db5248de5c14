//! Activity execution: functions, options, and the runner

mod definition;
mod options;
pub(crate) mod runner;

pub use definition::{activity_fn, ActivityContext, ActivityError, ActivityFn};
pub use options::ActivityOptions;
