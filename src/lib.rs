pub mod config;
pub mod dashboard;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod shutdown;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, Result};
