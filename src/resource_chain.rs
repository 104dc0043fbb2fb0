//! Release callbacks accumulated as streams are derived from one another.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{BoxError, StreamError, StreamResult};

/// A release callback registered with `on_close`. Identity is the `Arc`
/// allocation: registering the same handler twice keeps one entry.
pub type CloseHandler = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync + 'static>;

/// Ordered, identity-deduplicated set of close handlers.
#[derive(Clone, Default)]
pub struct ResourceChain {
    handlers: Vec<CloseHandler>,
}

impl ResourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Append a handler unless the same handler is already registered.
    pub fn push(&mut self, handler: CloseHandler) {
        if !self.handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            self.handlers.push(handler);
        }
    }

    /// Append every handler of `other`, preserving its order and skipping
    /// handlers already present.
    pub fn extend(&mut self, other: ResourceChain) {
        for handler in other.handlers {
            self.push(handler);
        }
    }

    pub(crate) fn take(&mut self) -> ResourceChain {
        std::mem::take(self)
    }

    /// Run every handler in registration order.
    ///
    /// All handlers run even when earlier ones fail or panic. The first
    /// failure is reported; later ones are attached as suppressed failures.
    pub fn close(self) -> StreamResult<()> {
        let mut failures = Vec::new();
        for handler in self.handlers {
            match catch_unwind(AssertUnwindSafe(|| handler())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(StreamError::callback(e)),
                Err(payload) => failures.push(StreamError::from_panic(payload)),
            }
        }

        let mut failures = failures.into_iter();
        match failures.next() {
            None => Ok(()),
            Some(first) => Err(StreamError::CloseFailed {
                first: Box::new(first),
                suppressed: failures.collect(),
            }),
        }
    }
}

impl fmt::Debug for ResourceChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
