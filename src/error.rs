use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Metrics encoding produced invalid UTF-8: {0}")]
    MetricsEncoding(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Work queue closed")]
    QueueClosed,

    #[error("Task {0} exited unexpectedly")]
    TaskExited(String),

    #[error("Task panicked: {0}")]
    TaskPanicked(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
