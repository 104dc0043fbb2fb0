//! The two shapes a stream's data can take.

use std::ops::Range;

use crate::error::StreamResult;
use crate::stream::core::{Cursor, VecCursor};

/// Where a stream's elements come from.
///
/// A materialized source can be re-sliced without touching its elements,
/// which keeps `limit`/`skip` on buffers O(1) and lets the contiguous
/// splitor partition them by index.
pub enum Source<T> {
    Materialized { buffer: Vec<T>, range: Range<usize> },
    Generated(Box<dyn Cursor<T>>),
}

impl<T: Send + 'static> Source<T> {
    pub fn from_vec(buffer: Vec<T>) -> Self {
        let range = 0..buffer.len();
        Source::Materialized { buffer, range }
    }

    pub fn empty() -> Self {
        Source::from_vec(Vec::new())
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self, Source::Materialized { .. })
    }

    /// Remaining length when known without pulling.
    pub fn exact_len(&self) -> Option<u64> {
        match self {
            Source::Materialized { range, .. } => Some(range.len() as u64),
            Source::Generated(cursor) => cursor.exact_len(),
        }
    }

    /// Narrow to at most `limit` elements after skipping `skip`. Only
    /// materialized sources can do this in place.
    pub(crate) fn try_slice(self, skip: u64, limit: u64) -> Result<Self, Self> {
        match self {
            Source::Materialized { buffer, range } => {
                let len = range.len() as u64;
                let start = range.start + skip.min(len) as usize;
                let end = start + limit.min(len - skip.min(len)) as usize;
                Ok(Source::Materialized {
                    buffer,
                    range: start..end,
                })
            }
            generated => Err(generated),
        }
    }

    /// The elements in range, as an owned buffer. Drains a generated
    /// source on the calling thread.
    pub fn into_vec(self) -> StreamResult<Vec<T>> {
        match self {
            Source::Materialized { mut buffer, range } => {
                buffer.truncate(range.end);
                buffer.drain(..range.start);
                Ok(buffer)
            }
            Source::Generated(mut cursor) => cursor.drain_to_vec(),
        }
    }

    pub fn into_cursor(self) -> Box<dyn Cursor<T>> {
        match self {
            Source::Materialized { mut buffer, range } => {
                buffer.truncate(range.end);
                buffer.drain(..range.start);
                Box::new(VecCursor::new(buffer))
            }
            Source::Generated(cursor) => cursor,
        }
    }
}
