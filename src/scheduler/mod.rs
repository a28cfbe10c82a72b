//! Job admission: the job model, the bounded work queue and the producer.

pub mod job;
pub mod queue;
pub mod source;

pub use job::{CategorySet, Job};
pub use queue::WorkQueue;
pub use source::{produce, JobSource, RandomJobSource};
