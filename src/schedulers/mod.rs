//! Concurrent, version-gated dispatch of a frontier of nodes within one superstep.

pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerError, SchedulerState, StepRunResult};
