//! Order-rearranging stages. Both are barriers: the first pull drains the
//! upstream into a buffer.
use std::cmp::Ordering;
use std::sync::Arc;

use crate::coordinator::{self, Encounter};
use crate::error::{StreamError, StreamResult};
use crate::stream::core::{Cursor, VecCursor};
use crate::stream::parallel::split_contiguous;
use crate::stream_configuration::Splitor;

pub(crate) type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync + 'static>;

// ================================
// Sorted
// ================================

enum SortState<T> {
    Pending {
        upstream: Box<dyn Cursor<T>>,
        compare: Comparator<T>,
    },
    Ready(VecCursor<T>),
}

/// Stable sort by `compare`, materialized on first use.
///
/// When the driving terminal operation is parallel the upstream is drained
/// across its pool in encounter order and large buffers are sorted in runs
/// on the workers. Under the shared-cursor splitor encounter order is lost,
/// so equal elements come out in arbitrary order.
pub struct SortedCursor<T> {
    state: SortState<T>,
}

impl<T: Send + 'static> SortedCursor<T> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, compare: Comparator<T>) -> Self {
        Self {
            state: SortState::Pending { upstream, compare },
        }
    }

    fn ready(&mut self) -> StreamResult<&mut VecCursor<T>> {
        let state = std::mem::replace(&mut self.state, SortState::Ready(VecCursor::new(Vec::new())));
        let sorted = match state {
            SortState::Ready(cursor) => cursor,
            SortState::Pending { upstream, compare } => {
                let context = coordinator::driving_context();
                let items = coordinator::collect_vec(context.as_ref(), upstream, Encounter::Preserved)?;
                VecCursor::new(coordinator::sort_vec(context.as_ref(), items, compare)?)
            }
        };
        self.state = SortState::Ready(sorted);
        match &mut self.state {
            SortState::Ready(cursor) => Ok(cursor),
            SortState::Pending { .. } => Err(StreamError::Exhausted),
        }
    }
}

impl<T: Send + 'static> Cursor<T> for SortedCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        self.ready()?.has_more()
    }

    fn take(&mut self) -> StreamResult<T> {
        self.ready()?.take()
    }

    fn remaining_count(&mut self) -> StreamResult<u64> {
        match &mut self.state {
            // Sorting does not change the count.
            SortState::Pending { upstream, .. } => upstream.remaining_count(),
            SortState::Ready(cursor) => cursor.remaining_count(),
        }
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        self.ready()?.skip(n)
    }

    fn drain_to_vec(&mut self) -> StreamResult<Vec<T>> {
        self.ready()?.drain_to_vec()
    }

    fn exact_len(&self) -> Option<u64> {
        match &self.state {
            SortState::Pending { upstream, .. } => upstream.exact_len(),
            SortState::Ready(cursor) => cursor.exact_len(),
        }
    }

    fn splits_contiguously(&self) -> bool {
        true
    }

    fn try_split(
        &mut self,
        parts: usize,
        splitor: Splitor,
    ) -> StreamResult<Option<Vec<Box<dyn Cursor<T>>>>> {
        self.ready()?.try_split(parts, splitor)
    }
}

// ================================
// Reversed
// ================================

enum ReverseState<T> {
    Pending(Box<dyn Cursor<T>>),
    Ready(Vec<T>),
}

/// Serves the upstream back to front. The buffer is filled on the calling
/// thread so encounter order survives any splitor.
pub struct ReversedCursor<T> {
    state: ReverseState<T>,
}

impl<T: Send + 'static> ReversedCursor<T> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>) -> Self {
        Self {
            state: ReverseState::Pending(upstream),
        }
    }

    fn buffer(&mut self) -> StreamResult<&mut Vec<T>> {
        if let ReverseState::Pending(upstream) = &mut self.state {
            let items = upstream.drain_to_vec()?;
            self.state = ReverseState::Ready(items);
        }
        match &mut self.state {
            ReverseState::Ready(items) => Ok(items),
            ReverseState::Pending(_) => Err(StreamError::Exhausted),
        }
    }
}

impl<T: Send + 'static> Cursor<T> for ReversedCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(!self.buffer()?.is_empty())
    }

    fn take(&mut self) -> StreamResult<T> {
        self.buffer()?.pop().ok_or(StreamError::Exhausted)
    }

    fn remaining_count(&mut self) -> StreamResult<u64> {
        match &mut self.state {
            ReverseState::Pending(upstream) => upstream.remaining_count(),
            ReverseState::Ready(items) => Ok(std::mem::take(items).len() as u64),
        }
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        let items = self.buffer()?;
        let skipped = n.min(items.len() as u64);
        items.truncate(items.len() - skipped as usize);
        Ok(skipped)
    }

    fn drain_to_vec(&mut self) -> StreamResult<Vec<T>> {
        let mut items = std::mem::take(self.buffer()?);
        items.reverse();
        Ok(items)
    }

    fn exact_len(&self) -> Option<u64> {
        match &self.state {
            ReverseState::Pending(upstream) => upstream.exact_len(),
            ReverseState::Ready(items) => Some(items.len() as u64),
        }
    }

    fn splits_contiguously(&self) -> bool {
        true
    }

    fn try_split(
        &mut self,
        parts: usize,
        splitor: Splitor,
    ) -> StreamResult<Option<Vec<Box<dyn Cursor<T>>>>> {
        if splitor != Splitor::Contiguous {
            return Ok(None);
        }
        let items = self.drain_to_vec()?;
        Ok(Some(
            split_contiguous(items, parts)
                .into_iter()
                .map(|chunk| Box::new(VecCursor::new(chunk)) as Box<dyn Cursor<T>>)
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_skip_drops_from_the_back() {
        let mut cursor = ReversedCursor::new(Box::new(VecCursor::new(vec![1, 2, 3, 4])));
        assert_eq!(cursor.skip(1).unwrap(), 1);
        assert_eq!(cursor.drain_to_vec().unwrap(), vec![3, 2, 1]);
    }

    #[test]
    fn test_sorted_is_stable() {
        let compare: Comparator<(i32, char)> = Arc::new(|a, b| a.0.cmp(&b.0));
        let items = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];
        let mut cursor = SortedCursor::new(Box::new(VecCursor::new(items)), compare);
        assert_eq!(
            cursor.drain_to_vec().unwrap(),
            vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]
        );
    }
}
