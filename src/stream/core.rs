//! The pull-based [`Cursor`] trait and the per-element stage cursors
//! (map, filter, flat_map, peek).
//!
//! Stage cursors are stateless with respect to their position, so they know
//! how to split themselves: a parallel terminal operation splits the
//! upstream and re-wraps every partition with the same stage, which runs the
//! user callback on the worker thread that pulled the element.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{StreamError, StreamResult};
use crate::stream::parallel::{split_contiguous, SharedCursor};
use crate::stream_configuration::Splitor;

pub(crate) type MapFn<T, U> = Arc<dyn Fn(T) -> StreamResult<U> + Send + Sync + 'static>;
pub(crate) type Predicate<T> = Arc<dyn Fn(&T) -> StreamResult<bool> + Send + Sync + 'static>;
pub(crate) type Action<T> = Arc<dyn Fn(&T) -> StreamResult<()> + Send + Sync + 'static>;
pub(crate) type CursorFn<T, U> =
    Arc<dyn Fn(T) -> StreamResult<Box<dyn Cursor<U>>> + Send + Sync + 'static>;

/// Single-pass, pull-based reader over a sequence of `T`.
///
/// A cursor is fresh until first pulled, then active, then exhausted; once
/// exhausted it never yields again. The acceleration hooks default to
/// repeated [`Cursor::take`]; cursors that can do better override them.
pub trait Cursor<T>: Send {
    fn has_more(&mut self) -> StreamResult<bool>;

    /// Pull the next element. Fails with [`StreamError::Exhausted`] when
    /// [`Cursor::has_more`] would return `false`.
    fn take(&mut self) -> StreamResult<T>;

    fn next(&mut self) -> StreamResult<Option<T>> {
        if self.has_more()? {
            self.take().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Number of elements left. Consumes the cursor.
    fn remaining_count(&mut self) -> StreamResult<u64> {
        let mut count = 0;
        while self.has_more()? {
            self.take()?;
            count += 1;
        }
        Ok(count)
    }

    /// Advance past up to `n` elements, returning how many were skipped.
    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        let mut skipped = 0;
        while skipped < n && self.has_more()? {
            self.take()?;
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Move every remaining element into a buffer.
    fn drain_to_vec(&mut self) -> StreamResult<Vec<T>> {
        let mut out = Vec::new();
        while self.has_more()? {
            out.push(self.take()?);
        }
        Ok(out)
    }

    /// Remaining length when it is known without pulling.
    fn exact_len(&self) -> Option<u64> {
        None
    }

    /// True when [`Cursor::try_split`] with [`Splitor::Contiguous`] yields
    /// index-ordered ranges instead of falling back to a shared cursor.
    fn splits_contiguously(&self) -> bool {
        false
    }

    /// Split the remaining elements into at most `parts` independent cursors
    /// whose concatenation, in order, is the remaining sequence.
    ///
    /// Returns `None` when the cursor cannot split itself; the caller then
    /// shares it between workers behind a lock.
    fn try_split(
        &mut self,
        _parts: usize,
        _splitor: Splitor,
    ) -> StreamResult<Option<Vec<Box<dyn Cursor<T>>>>> {
        Ok(None)
    }
}

impl<T, C> Cursor<T> for Box<C>
where
    C: Cursor<T> + ?Sized,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        (**self).has_more()
    }

    fn take(&mut self) -> StreamResult<T> {
        (**self).take()
    }

    fn next(&mut self) -> StreamResult<Option<T>> {
        (**self).next()
    }

    fn remaining_count(&mut self) -> StreamResult<u64> {
        (**self).remaining_count()
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        (**self).skip(n)
    }

    fn drain_to_vec(&mut self) -> StreamResult<Vec<T>> {
        (**self).drain_to_vec()
    }

    fn exact_len(&self) -> Option<u64> {
        (**self).exact_len()
    }

    fn splits_contiguously(&self) -> bool {
        (**self).splits_contiguously()
    }

    fn try_split(
        &mut self,
        parts: usize,
        splitor: Splitor,
    ) -> StreamResult<Option<Vec<Box<dyn Cursor<T>>>>> {
        (**self).try_split(parts, splitor)
    }
}

/// Split `upstream` into `parts` cursors, sharing it behind a lock when it
/// cannot split itself.
pub(crate) fn split_upstream<T>(
    upstream: &mut Box<dyn Cursor<T>>,
    parts: usize,
    splitor: Splitor,
) -> StreamResult<Vec<Box<dyn Cursor<T>>>>
where
    T: Send + 'static,
{
    if let Some(split) = upstream.try_split(parts, splitor)? {
        return Ok(split);
    }
    let shared = std::mem::replace(upstream, Box::new(EmptyCursor::new()));
    Ok(SharedCursor::fan_out(shared, parts))
}

// ================================
// EmptyCursor
// ================================

pub struct EmptyCursor<T> {
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> EmptyCursor<T> {
    pub fn new() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> Default for EmptyCursor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Cursor<T> for EmptyCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(false)
    }

    fn take(&mut self) -> StreamResult<T> {
        Err(StreamError::Exhausted)
    }

    fn remaining_count(&mut self) -> StreamResult<u64> {
        Ok(0)
    }

    fn skip(&mut self, _n: u64) -> StreamResult<u64> {
        Ok(0)
    }

    fn exact_len(&self) -> Option<u64> {
        Some(0)
    }
}

// ================================
// VecCursor
// ================================

/// Cursor over an owned buffer. The only cursor that can split into
/// contiguous index ranges.
pub struct VecCursor<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> VecCursor<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }

    pub(crate) fn into_vec(self) -> Vec<T> {
        self.items.collect()
    }
}

impl<T: Send + 'static> Cursor<T> for VecCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(!self.items.as_slice().is_empty())
    }

    fn take(&mut self) -> StreamResult<T> {
        self.items.next().ok_or(StreamError::Exhausted)
    }

    fn next(&mut self) -> StreamResult<Option<T>> {
        Ok(self.items.next())
    }

    fn remaining_count(&mut self) -> StreamResult<u64> {
        let len = self.items.len() as u64;
        self.items = Vec::new().into_iter();
        Ok(len)
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        let skipped = n.min(self.items.len() as u64);
        if skipped > 0 {
            self.items.nth(skipped as usize - 1);
        }
        Ok(skipped)
    }

    fn drain_to_vec(&mut self) -> StreamResult<Vec<T>> {
        Ok(std::mem::replace(&mut self.items, Vec::new().into_iter()).collect())
    }

    fn exact_len(&self) -> Option<u64> {
        Some(self.items.len() as u64)
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

// ================================
// IterCursor
// ================================

/// Adapts a standard iterator. Generated sources start here.
pub struct IterCursor<I: Iterator> {
    iter: I,
    peeked: Option<I::Item>,
    done: bool,
}

impl<I: Iterator> IterCursor<I> {
    pub fn new(iter: I) -> Self {
        Self {
            iter,
            peeked: None,
            done: false,
        }
    }
}

impl<I> Cursor<I::Item> for IterCursor<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        if self.peeked.is_none() && !self.done {
            self.peeked = self.iter.next();
            self.done = self.peeked.is_none();
        }
        Ok(self.peeked.is_some())
    }

    fn take(&mut self) -> StreamResult<I::Item> {
        self.has_more()?;
        self.peeked.take().ok_or(StreamError::Exhausted)
    }
}

// ================================
// Lookahead
// ================================

/// A cursor with at most one element pulled ahead of its consumer.
///
/// Replaces memoized head fields with explicit states: the head is either
/// not yet pulled, or cached together with the remainder.
pub enum Lookahead<T> {
    Unconsumed(Box<dyn Cursor<T>>),
    Cached {
        head: T,
        remainder: Box<dyn Cursor<T>>,
    },
    Exhausted,
}

impl<T: Send + 'static> Lookahead<T> {
    pub fn new(cursor: Box<dyn Cursor<T>>) -> Self {
        Lookahead::Unconsumed(cursor)
    }

    /// A cursor yielding `head` followed by `remainder`.
    pub fn prepend(head: T, remainder: Box<dyn Cursor<T>>) -> Self {
        Lookahead::Cached { head, remainder }
    }

    /// Borrow the next element without consuming it.
    pub fn peek(&mut self) -> StreamResult<Option<&T>> {
        if let Lookahead::Unconsumed(cursor) = self {
            if cursor.has_more()? {
                let head = cursor.take()?;
                if let Lookahead::Unconsumed(remainder) =
                    std::mem::replace(self, Lookahead::Exhausted)
                {
                    *self = Lookahead::Cached { head, remainder };
                }
            } else {
                *self = Lookahead::Exhausted;
            }
        }
        match self {
            Lookahead::Cached { head, .. } => Ok(Some(head)),
            _ => Ok(None),
        }
    }
}

impl<T: Send + 'static> Cursor<T> for Lookahead<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        match self {
            Lookahead::Cached { .. } => Ok(true),
            Lookahead::Unconsumed(cursor) => {
                if cursor.has_more()? {
                    Ok(true)
                } else {
                    *self = Lookahead::Exhausted;
                    Ok(false)
                }
            }
            Lookahead::Exhausted => Ok(false),
        }
    }

    fn take(&mut self) -> StreamResult<T> {
        match std::mem::replace(self, Lookahead::Exhausted) {
            Lookahead::Cached { head, remainder } => {
                *self = Lookahead::Unconsumed(remainder);
                Ok(head)
            }
            Lookahead::Unconsumed(mut cursor) => {
                let item = cursor.take();
                *self = Lookahead::Unconsumed(cursor);
                item
            }
            Lookahead::Exhausted => Err(StreamError::Exhausted),
        }
    }

    fn exact_len(&self) -> Option<u64> {
        match self {
            Lookahead::Cached { remainder, .. } => remainder.exact_len().map(|n| n + 1),
            Lookahead::Unconsumed(cursor) => cursor.exact_len(),
            Lookahead::Exhausted => Some(0),
        }
    }
}

// ================================
// Map
// ================================

pub struct MapCursor<T, U> {
    upstream: Box<dyn Cursor<T>>,
    f: MapFn<T, U>,
}

impl<T, U> MapCursor<T, U> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, f: MapFn<T, U>) -> Self {
        Self { upstream, f }
    }
}

impl<T, U> Cursor<U> for MapCursor<T, U>
where
    T: Send + 'static,
    U: Send + 'static,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        self.upstream.has_more()
    }

    fn take(&mut self) -> StreamResult<U> {
        let item = self.upstream.take()?;
        (self.f)(item)
    }

    fn remaining_count(&mut self) -> StreamResult<u64> {
        self.upstream.remaining_count()
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        self.upstream.skip(n)
    }

    fn exact_len(&self) -> Option<u64> {
        self.upstream.exact_len()
    }

    fn splits_contiguously(&self) -> bool {
        self.upstream.splits_contiguously()
    }

    fn try_split(
        &mut self,
        parts: usize,
        splitor: Splitor,
    ) -> StreamResult<Option<Vec<Box<dyn Cursor<U>>>>> {
        let split = split_upstream(&mut self.upstream, parts, splitor)?;
        Ok(Some(
            split
                .into_iter()
                .map(|part| Box::new(MapCursor::new(part, Arc::clone(&self.f))) as Box<dyn Cursor<U>>)
                .collect(),
        ))
    }
}

// ================================
// Filter
// ================================

pub struct FilterCursor<T> {
    upstream: Box<dyn Cursor<T>>,
    predicate: Predicate<T>,
    slot: Option<T>,
}

impl<T> FilterCursor<T> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, predicate: Predicate<T>) -> Self {
        Self {
            upstream,
            predicate,
            slot: None,
        }
    }
}

impl<T: Send + 'static> Cursor<T> for FilterCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        while self.slot.is_none() {
            if !self.upstream.has_more()? {
                return Ok(false);
            }
            let item = self.upstream.take()?;
            if (self.predicate)(&item)? {
                self.slot = Some(item);
            }
        }
        Ok(true)
    }

    fn take(&mut self) -> StreamResult<T> {
        self.has_more()?;
        self.slot.take().ok_or(StreamError::Exhausted)
    }

    fn splits_contiguously(&self) -> bool {
        self.slot.is_none() && self.upstream.splits_contiguously()
    }

    fn try_split(
        &mut self,
        parts: usize,
        splitor: Splitor,
    ) -> StreamResult<Option<Vec<Box<dyn Cursor<T>>>>> {
        if self.slot.is_some() {
            return Ok(None);
        }
        let split = split_upstream(&mut self.upstream, parts, splitor)?;
        Ok(Some(
            split
                .into_iter()
                .map(|part| {
                    Box::new(FilterCursor::new(part, Arc::clone(&self.predicate)))
                        as Box<dyn Cursor<T>>
                })
                .collect(),
        ))
    }
}

// ================================
// FlatMap
// ================================

pub struct FlatMapCursor<T, U> {
    upstream: Box<dyn Cursor<T>>,
    f: CursorFn<T, U>,
    inner: Option<Box<dyn Cursor<U>>>,
}

impl<T, U> FlatMapCursor<T, U> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, f: CursorFn<T, U>) -> Self {
        Self {
            upstream,
            f,
            inner: None,
        }
    }
}

impl<T, U> Cursor<U> for FlatMapCursor<T, U>
where
    T: Send + 'static,
    U: Send + 'static,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        loop {
            if let Some(inner) = self.inner.as_mut() {
                if inner.has_more()? {
                    return Ok(true);
                }
                self.inner = None;
            }
            if !self.upstream.has_more()? {
                return Ok(false);
            }
            let item = self.upstream.take()?;
            self.inner = Some((self.f)(item)?);
        }
    }

    fn take(&mut self) -> StreamResult<U> {
        if !self.has_more()? {
            return Err(StreamError::Exhausted);
        }
        match self.inner.as_mut() {
            Some(inner) => inner.take(),
            None => Err(StreamError::Exhausted),
        }
    }

    fn splits_contiguously(&self) -> bool {
        self.inner.is_none() && self.upstream.splits_contiguously()
    }

    fn try_split(
        &mut self,
        parts: usize,
        splitor: Splitor,
    ) -> StreamResult<Option<Vec<Box<dyn Cursor<U>>>>> {
        if self.inner.is_some() {
            return Ok(None);
        }
        let split = split_upstream(&mut self.upstream, parts, splitor)?;
        Ok(Some(
            split
                .into_iter()
                .map(|part| {
                    Box::new(FlatMapCursor::new(part, Arc::clone(&self.f))) as Box<dyn Cursor<U>>
                })
                .collect(),
        ))
    }
}

// ================================
// Peek
// ================================

/// Reports no exact length, so counting still runs `action` on every element.
pub struct PeekCursor<T> {
    upstream: Box<dyn Cursor<T>>,
    action: Action<T>,
}

impl<T> PeekCursor<T> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, action: Action<T>) -> Self {
        Self { upstream, action }
    }
}

impl<T: Send + 'static> Cursor<T> for PeekCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        self.upstream.has_more()
    }

    fn take(&mut self) -> StreamResult<T> {
        let item = self.upstream.take()?;
        (self.action)(&item)?;
        Ok(item)
    }

    fn splits_contiguously(&self) -> bool {
        self.upstream.splits_contiguously()
    }

    fn try_split(
        &mut self,
        parts: usize,
        splitor: Splitor,
    ) -> StreamResult<Option<Vec<Box<dyn Cursor<T>>>>> {
        let split = split_upstream(&mut self.upstream, parts, splitor)?;
        Ok(Some(
            split
                .into_iter()
                .map(|part| {
                    Box::new(PeekCursor::new(part, Arc::clone(&self.action))) as Box<dyn Cursor<T>>
                })
                .collect(),
        ))
    }
}

// ================================
// Concat
// ================================

/// Drains each cursor in turn.
pub struct ConcatCursor<T> {
    cursors: VecDeque<Box<dyn Cursor<T>>>,
}

impl<T> ConcatCursor<T> {
    pub fn new(cursors: Vec<Box<dyn Cursor<T>>>) -> Self {
        Self {
            cursors: cursors.into(),
        }
    }
}

impl<T: Send + 'static> Cursor<T> for ConcatCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        while let Some(front) = self.cursors.front_mut() {
            if front.has_more()? {
                return Ok(true);
            }
            self.cursors.pop_front();
        }
        Ok(false)
    }

    fn take(&mut self) -> StreamResult<T> {
        if !self.has_more()? {
            return Err(StreamError::Exhausted);
        }
        match self.cursors.front_mut() {
            Some(front) => front.take(),
            None => Err(StreamError::Exhausted),
        }
    }

    fn remaining_count(&mut self) -> StreamResult<u64> {
        let mut total = 0;
        while let Some(mut front) = self.cursors.pop_front() {
            total += front.remaining_count()?;
        }
        Ok(total)
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        let mut skipped = 0;
        while skipped < n {
            let Some(front) = self.cursors.front_mut() else {
                break;
            };
            let step = front.skip(n - skipped)?;
            skipped += step;
            if skipped < n {
                self.cursors.pop_front();
            }
        }
        Ok(skipped)
    }

    fn exact_len(&self) -> Option<u64> {
        self.cursors.iter().map(|c| c.exact_len()).sum()
    }
}
