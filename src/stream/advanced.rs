//! Stateful combinators: distinct, scan, collapse and the multiset
//! operators (intersection, difference, symmetric difference).
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{StreamError, StreamResult};
use crate::stream::core::{Cursor, Lookahead};

pub(crate) type KeyFn<T, K> = Arc<dyn Fn(&T) -> StreamResult<K> + Send + Sync + 'static>;
pub(crate) type Accumulator<A, T> = Arc<dyn Fn(A, T) -> StreamResult<A> + Send + Sync + 'static>;
pub(crate) type BiPredicate<T> = Arc<dyn Fn(&T, &T) -> StreamResult<bool> + Send + Sync + 'static>;

// ================================
// Distinct
// ================================

/// Keeps the first occurrence of every key, in encounter order.
pub struct DistinctCursor<T, K> {
    upstream: Box<dyn Cursor<T>>,
    key: KeyFn<T, K>,
    seen: HashSet<K>,
    slot: Option<T>,
}

impl<T, K> DistinctCursor<T, K> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, key: KeyFn<T, K>) -> Self {
        Self {
            upstream,
            key,
            seen: HashSet::new(),
            slot: None,
        }
    }
}

impl<T, K> Cursor<T> for DistinctCursor<T, K>
where
    T: Send + 'static,
    K: Hash + Eq + Send + 'static,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        while self.slot.is_none() {
            let Some(item) = self.upstream.next()? else {
                return Ok(false);
            };
            if self.seen.insert((self.key)(&item)?) {
                self.slot = Some(item);
            }
        }
        Ok(true)
    }

    fn take(&mut self) -> StreamResult<T> {
        self.has_more()?;
        self.slot.take().ok_or(StreamError::Exhausted)
    }
}

// ================================
// Scan
// ================================

/// Running fold without a seed: the first element is emitted unchanged and
/// every later emission is `accumulate(previous_emission, next)`.
pub struct ScanCursor<T> {
    upstream: Box<dyn Cursor<T>>,
    accumulate: Accumulator<T, T>,
    previous: Option<T>,
}

impl<T> ScanCursor<T> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, accumulate: Accumulator<T, T>) -> Self {
        Self {
            upstream,
            accumulate,
            previous: None,
        }
    }
}

impl<T: Clone + Send + 'static> Cursor<T> for ScanCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        self.upstream.has_more()
    }

    fn take(&mut self) -> StreamResult<T> {
        let item = self.upstream.take()?;
        let emitted = match self.previous.take() {
            Some(previous) => (self.accumulate)(previous, item)?,
            None => item,
        };
        self.previous = Some(emitted.clone());
        Ok(emitted)
    }
}

/// Running fold whose first emission is the seed.
pub struct SeededScanCursor<A, T> {
    upstream: Box<dyn Cursor<T>>,
    accumulate: Accumulator<A, T>,
    previous: Option<A>,
    seed_pending: bool,
}

impl<A, T> SeededScanCursor<A, T> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, seed: A, accumulate: Accumulator<A, T>) -> Self {
        Self {
            upstream,
            accumulate,
            previous: Some(seed),
            seed_pending: true,
        }
    }
}

impl<A, T> Cursor<A> for SeededScanCursor<A, T>
where
    A: Clone + Send + 'static,
    T: Send + 'static,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        if self.seed_pending {
            return Ok(true);
        }
        self.upstream.has_more()
    }

    fn take(&mut self) -> StreamResult<A> {
        if self.seed_pending {
            self.seed_pending = false;
            return self.previous.clone().ok_or(StreamError::Exhausted);
        }
        let item = self.upstream.take()?;
        let previous = self.previous.take().ok_or(StreamError::Exhausted)?;
        let emitted = (self.accumulate)(previous, item)?;
        self.previous = Some(emitted.clone());
        Ok(emitted)
    }
}

// ================================
// Collapse
// ================================

/// Merges runs of adjacent elements where `mergeable(previous, next)` holds,
/// folding each run with `combine`.
pub struct CollapseCursor<T> {
    upstream: Lookahead<T>,
    mergeable: BiPredicate<T>,
    combine: Accumulator<T, T>,
}

impl<T: Send + 'static> CollapseCursor<T> {
    pub(crate) fn new(
        upstream: Box<dyn Cursor<T>>,
        mergeable: BiPredicate<T>,
        combine: Accumulator<T, T>,
    ) -> Self {
        Self {
            upstream: Lookahead::new(upstream),
            mergeable,
            combine,
        }
    }
}

impl<T: Clone + Send + 'static> Cursor<T> for CollapseCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        self.upstream.has_more()
    }

    fn take(&mut self) -> StreamResult<T> {
        let first = self.upstream.take()?;
        let mut previous = first.clone();
        let mut run = first;
        loop {
            let merge = match self.upstream.peek()? {
                Some(next) => (self.mergeable)(&previous, next)?,
                None => false,
            };
            if !merge {
                return Ok(run);
            }
            let next = self.upstream.take()?;
            previous = next.clone();
            run = (self.combine)(run, next)?;
        }
    }
}

// ================================
// Multiset operators
// ================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetOp {
    Intersection,
    Difference,
    SymmetricDifference,
}

/// Bag-semantics set operators against a frequency table built from
/// `other`.
pub struct SetOpCursor<T> {
    upstream: Box<dyn Cursor<T>>,
    op: SetOp,
    counts: HashMap<T, usize>,
    other: Vec<T>,
    /// Frequencies of elements read from `upstream`, for the second half of a
    /// symmetric difference.
    seen: HashMap<T, usize>,
    slot: Option<T>,
    draining_other: bool,
}

impl<T: Hash + Eq + Clone> SetOpCursor<T> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, op: SetOp, other: Vec<T>) -> Self {
        let mut counts = HashMap::new();
        for item in &other {
            *counts.entry(item.clone()).or_insert(0) += 1;
        }
        let other = if op == SetOp::SymmetricDifference {
            other
        } else {
            Vec::new()
        };
        Self {
            upstream,
            op,
            counts,
            other: other.into_iter().rev().collect(),
            seen: HashMap::new(),
            slot: None,
            draining_other: false,
        }
    }

    /// Decrement the count of `item` in `table`, reporting whether it was
    /// positive.
    fn consume(table: &mut HashMap<T, usize>, item: &T) -> bool {
        match table.get_mut(item) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    fn keep_from_upstream(&mut self, item: &T) -> bool {
        let matched = Self::consume(&mut self.counts, item);
        match self.op {
            SetOp::Intersection => matched,
            SetOp::Difference => !matched,
            SetOp::SymmetricDifference => {
                *self.seen.entry(item.clone()).or_insert(0) += 1;
                !matched
            }
        }
    }
}

impl<T> Cursor<T> for SetOpCursor<T>
where
    T: Hash + Eq + Clone + Send + 'static,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        while self.slot.is_none() {
            if !self.draining_other {
                match self.upstream.next()? {
                    Some(item) => {
                        if self.keep_from_upstream(&item) {
                            self.slot = Some(item);
                        }
                    }
                    None => self.draining_other = true,
                }
            } else {
                let Some(item) = self.other.pop() else {
                    return Ok(false);
                };
                if !Self::consume(&mut self.seen, &item) {
                    self.slot = Some(item);
                }
            }
        }
        Ok(true)
    }

    fn take(&mut self) -> StreamResult<T> {
        self.has_more()?;
        self.slot.take().ok_or(StreamError::Exhausted)
    }
}
