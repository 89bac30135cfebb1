//! Background work off the command path.
//!
//! - [`BackgroundWorkers`] - one thread and FIFO queue per [`JobKind`]

mod workers;

pub use workers::{BackgroundWorkers, Job, JobKind};
