//! Windowing combinators: fixed-size chunks, predicate-delimited chunks,
//! sliding windows and the two-way splits `split_at` / `split_by`.
use std::collections::VecDeque;

use crate::error::{StreamError, StreamResult};
use crate::stream::core::{Cursor, Lookahead, Predicate};

// ================================
// Chunks
// ================================

/// Consecutive chunks of `size` elements; the last may be shorter.
pub struct ChunkCursor<T> {
    upstream: Box<dyn Cursor<T>>,
    size: usize,
}

impl<T> ChunkCursor<T> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, size: usize) -> Self {
        Self { upstream, size }
    }
}

impl<T: Send + 'static> Cursor<Vec<T>> for ChunkCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        self.upstream.has_more()
    }

    fn take(&mut self) -> StreamResult<Vec<T>> {
        if !self.upstream.has_more()? {
            return Err(StreamError::Exhausted);
        }
        let mut chunk = Vec::with_capacity(self.size);
        while chunk.len() < self.size {
            match self.upstream.next()? {
                Some(item) => chunk.push(item),
                None => break,
            }
        }
        Ok(chunk)
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        let mut skipped = 0;
        while skipped < n && self.upstream.has_more()? {
            self.upstream.skip(self.size as u64)?;
            skipped += 1;
        }
        Ok(skipped)
    }

    fn exact_len(&self) -> Option<u64> {
        let size = self.size as u64;
        self.upstream.exact_len().map(|n| n.div_ceil(size))
    }
}

// ================================
// SplitOn
// ================================

/// Groups consecutive elements for which the predicate gives the same answer.
pub struct SplitOnCursor<T> {
    upstream: Lookahead<T>,
    predicate: Predicate<T>,
}

impl<T: Send + 'static> SplitOnCursor<T> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, predicate: Predicate<T>) -> Self {
        Self {
            upstream: Lookahead::new(upstream),
            predicate,
        }
    }
}

impl<T: Send + 'static> Cursor<Vec<T>> for SplitOnCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        self.upstream.has_more()
    }

    fn take(&mut self) -> StreamResult<Vec<T>> {
        let first = self.upstream.take()?;
        let group = (self.predicate)(&first)?;
        let mut chunk = vec![first];
        loop {
            let same = match self.upstream.peek()? {
                Some(next) => (self.predicate)(next)? == group,
                None => false,
            };
            if !same {
                return Ok(chunk);
            }
            chunk.push(self.upstream.take()?);
        }
    }
}

// ================================
// Sliding
// ================================

/// Windows of `size` elements whose starts are `increment` apart.
///
/// A window is emitted only while it contains elements not seen in the
/// previous window, so the last window may be shorter than `size`.
pub struct SlidingCursor<T> {
    upstream: Box<dyn Cursor<T>>,
    size: usize,
    increment: usize,
    window: VecDeque<T>,
    pending: Option<Vec<T>>,
    started: bool,
    done: bool,
}

impl<T> SlidingCursor<T> {
    pub(crate) fn new(upstream: Box<dyn Cursor<T>>, size: usize, increment: usize) -> Self {
        Self {
            upstream,
            size,
            increment,
            window: VecDeque::with_capacity(size),
            pending: None,
            started: false,
            done: false,
        }
    }
}

impl<T: Clone + Send + 'static> SlidingCursor<T> {
    /// Pull up to `n` elements into the window, returning how many arrived.
    fn fill(&mut self, n: usize) -> StreamResult<usize> {
        let mut pulled = 0;
        while pulled < n {
            match self.upstream.next()? {
                Some(item) => {
                    self.window.push_back(item);
                    pulled += 1;
                }
                None => break,
            }
        }
        Ok(pulled)
    }

    fn advance(&mut self) -> StreamResult<()> {
        let fresh = if !self.started {
            self.started = true;
            self.fill(self.size)?
        } else if self.increment < self.size {
            if self.window.len() < self.size {
                // The previous window already reached the end.
                0
            } else {
                self.window.drain(..self.increment);
                self.fill(self.increment)?
            }
        } else {
            self.window.clear();
            self.upstream.skip((self.increment - self.size) as u64)?;
            self.fill(self.size)?
        };

        if fresh == 0 {
            self.done = true;
        } else {
            self.pending = Some(self.window.iter().cloned().collect());
        }
        Ok(())
    }
}

impl<T: Clone + Send + 'static> Cursor<Vec<T>> for SlidingCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        if self.pending.is_none() && !self.done {
            self.advance()?;
        }
        Ok(self.pending.is_some())
    }

    fn take(&mut self) -> StreamResult<Vec<T>> {
        self.has_more()?;
        self.pending.take().ok_or(StreamError::Exhausted)
    }
}

// ================================
// Two-way splits
// ================================

/// One half of a two-way split.
pub enum Segment<T> {
    /// The prefix, already pulled into a buffer.
    Buffered(Vec<T>),
    /// Everything after the prefix, still lazy.
    Remainder(Box<dyn Cursor<T>>),
}

enum SplitState<T> {
    Prefix(Box<dyn Cursor<T>>),
    Suffix(Box<dyn Cursor<T>>),
    Done,
}

enum SplitRule<T> {
    At(u64),
    While(Predicate<T>),
}

/// Yields exactly two segments: a buffered prefix and the lazy remainder.
pub struct SplitCursor<T> {
    state: SplitState<T>,
    rule: SplitRule<T>,
}

impl<T: Send + 'static> SplitCursor<T> {
    /// Prefix `[0, n)`, remainder `[n, len)`.
    pub(crate) fn at(upstream: Box<dyn Cursor<T>>, n: u64) -> Self {
        Self {
            state: SplitState::Prefix(upstream),
            rule: SplitRule::At(n),
        }
    }

    /// Prefix while `predicate` holds; the first element failing it leads
    /// the remainder.
    pub(crate) fn by(upstream: Box<dyn Cursor<T>>, predicate: Predicate<T>) -> Self {
        Self {
            state: SplitState::Prefix(upstream),
            rule: SplitRule::While(predicate),
        }
    }

    fn take_prefix(&self, upstream: Box<dyn Cursor<T>>) -> StreamResult<(Vec<T>, Box<dyn Cursor<T>>)> {
        let mut upstream = upstream;
        let mut prefix = Vec::new();
        match &self.rule {
            SplitRule::At(n) => {
                while (prefix.len() as u64) < *n {
                    match upstream.next()? {
                        Some(item) => prefix.push(item),
                        None => break,
                    }
                }
                Ok((prefix, upstream))
            }
            SplitRule::While(predicate) => {
                while let Some(item) = upstream.next()? {
                    if predicate(&item)? {
                        prefix.push(item);
                    } else {
                        let remainder = Lookahead::prepend(item, upstream);
                        return Ok((prefix, Box::new(remainder)));
                    }
                }
                Ok((prefix, upstream))
            }
        }
    }
}

impl<T: Send + 'static> Cursor<Segment<T>> for SplitCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(!matches!(self.state, SplitState::Done))
    }

    fn take(&mut self) -> StreamResult<Segment<T>> {
        match std::mem::replace(&mut self.state, SplitState::Done) {
            SplitState::Prefix(upstream) => {
                let (prefix, remainder) = self.take_prefix(upstream)?;
                self.state = SplitState::Suffix(remainder);
                Ok(Segment::Buffered(prefix))
            }
            SplitState::Suffix(remainder) => Ok(Segment::Remainder(remainder)),
            SplitState::Done => Err(StreamError::Exhausted),
        }
    }

    fn exact_len(&self) -> Option<u64> {
        Some(match self.state {
            SplitState::Prefix(_) => 2,
            SplitState::Suffix(_) => 1,
            SplitState::Done => 0,
        })
    }
}
