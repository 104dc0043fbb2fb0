//! Error types and handling for RStream
//!
//! Every fallible operation in the engine reports a [`StreamError`]. User
//! callbacks that fail are wrapped into [`StreamError::Callback`]; failures of
//! release callbacks registered with `on_close` are aggregated into
//! [`StreamError::CloseFailed`].

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Boxed error accepted from user callbacks.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Error raised by a caller-supplied predicate, function or accumulator.
#[derive(Clone)]
pub struct CallbackError(Arc<dyn Error + Send + Sync + 'static>);

impl CallbackError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        CallbackError(Arc::from(err.into()))
    }

    /// The error returned by the callback.
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Debug for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

/// Main error type for RStream operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamError {
    /// Negative counts, non-positive step or window sizes, zero thread counts
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A cursor was pulled past its end
    #[error("cursor exhausted")]
    Exhausted,
    /// A user callback returned an error
    #[error("callback failed: {0}")]
    Callback(CallbackError),
    /// A user callback panicked on a worker thread
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
    /// One or more close handlers failed; the first failure is reported and
    /// the rest are attached as suppressed failures
    #[error("close failed: {first}{}", suppressed_suffix(.suppressed))]
    CloseFailed {
        first: Box<StreamError>,
        suppressed: Vec<StreamError>,
    },
    /// The worker pool could not be created
    #[error("IO error: {0}")]
    IO(String),
    /// A task could not be submitted to or joined from the executor
    #[error("executor error: {0}")]
    Executor(String),
}

fn suppressed_suffix(suppressed: &[StreamError]) -> String {
    if suppressed.is_empty() {
        String::new()
    } else {
        format!(" ({} suppressed)", suppressed.len())
    }
}

impl StreamError {
    /// Wrap an error returned by user code.
    pub fn callback<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        StreamError::Callback(CallbackError::new(err))
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        StreamError::InvalidArgument(msg.into())
    }

    /// Failures attached to a [`StreamError::CloseFailed`]; empty for every
    /// other kind.
    pub fn suppressed(&self) -> &[StreamError] {
        match self {
            StreamError::CloseFailed { suppressed, .. } => suppressed,
            _ => &[],
        }
    }

    /// Convert a panic payload caught on a worker thread.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        StreamError::WorkerPanicked(msg)
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::IO(err.to_string())
    }
}

/// Result type for rstream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Reject a non-positive size argument.
pub(crate) fn check_positive(name: &str, value: usize) -> StreamResult<()> {
    if value == 0 {
        Err(StreamError::invalid_argument(format!(
            "{} must be positive, got 0",
            name
        )))
    } else {
        Ok(())
    }
}
