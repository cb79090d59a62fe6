use window_limit::LimitError;

/// Errors that abort a stress run.
#[derive(Debug, thiserror::Error)]
pub enum StressError {
    #[error("invalid limiter configuration: {0}")]
    Limit(#[from] LimitError),

    /// The string contains the `Debug` representation of the histogram error.
    #[error("latency histogram error: {0}")]
    Histogram(String),

    #[error("worker thread {0} panicked")]
    WorkerPanicked(usize),
}
