//! Partitioning primitives used by the parallel strategy: contiguous slicing
//! of buffers and a lock-guarded cursor shared between workers.

use std::sync::{Arc, Mutex};

use crate::error::{StreamError, StreamResult};
use crate::stream::core::Cursor;

/// Divide `items` into at most `parts` near-equal contiguous chunks, in
/// order. The first `len % parts` chunks are one element longer. Never
/// returns empty chunks unless `items` is empty, in which case one empty
/// chunk is returned.
pub(crate) fn split_contiguous<T>(mut items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    let len = items.len();
    let parts = parts.clamp(1, len.max(1));
    let base = len / parts;
    let extra = len % parts;

    let mut chunks = Vec::with_capacity(parts);
    // Split from the back so each split_off moves only the tail.
    for index in (0..parts).rev() {
        let size = base + usize::from(index < extra);
        let tail = items.split_off(items.len() - size);
        chunks.push(tail);
    }
    chunks.reverse();
    chunks
}

// ================================
// SharedCursor
// ================================

/// One worker's handle on an upstream cursor shared by all workers.
///
/// The lock is held for exactly one pull; the element is parked in the
/// handle's own slot and user code runs after the lock is released.
pub struct SharedCursor<T> {
    shared: Arc<Mutex<Box<dyn Cursor<T>>>>,
    slot: Option<T>,
    drained: bool,
}

impl<T: Send + 'static> SharedCursor<T> {
    /// Produce `workers` handles over one upstream cursor.
    pub fn fan_out(upstream: Box<dyn Cursor<T>>, workers: usize) -> Vec<Box<dyn Cursor<T>>> {
        let shared = Arc::new(Mutex::new(upstream));
        (0..workers.max(1))
            .map(|_| {
                Box::new(SharedCursor {
                    shared: Arc::clone(&shared),
                    slot: None,
                    drained: false,
                }) as Box<dyn Cursor<T>>
            })
            .collect()
    }

    fn pull(&mut self) -> StreamResult<()> {
        let mut upstream = self
            .shared
            .lock()
            .map_err(|_| StreamError::Executor("shared cursor lock poisoned".to_string()))?;
        self.slot = upstream.next()?;
        self.drained = self.slot.is_none();
        Ok(())
    }
}

impl<T: Send + 'static> Cursor<T> for SharedCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        if self.slot.is_none() && !self.drained {
            self.pull()?;
        }
        Ok(self.slot.is_some())
    }

    fn take(&mut self) -> StreamResult<T> {
        self.has_more()?;
        self.slot.take().ok_or(StreamError::Exhausted)
    }
}
