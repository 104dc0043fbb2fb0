//! Two-input combinators: selector-driven merge and the zip family.
use std::sync::Arc;

use crate::error::{StreamError, StreamResult};
use crate::stream::core::{Cursor, Lookahead};

/// Which head a merge selector picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeResult {
    TakeFirst,
    TakeSecond,
}

pub(crate) type Selector<T> =
    Arc<dyn Fn(&T, &T) -> StreamResult<MergeResult> + Send + Sync + 'static>;
pub(crate) type Zipper2<A, B, R> = Arc<dyn Fn(A, B) -> StreamResult<R> + Send + Sync + 'static>;
pub(crate) type Zipper3<A, B, C, R> =
    Arc<dyn Fn(A, B, C) -> StreamResult<R> + Send + Sync + 'static>;

// ================================
// Merge
// ================================

/// Interleaves two inputs. While both have a head the selector decides
/// which one is emitted; once either runs dry the other is drained as is.
pub struct MergeCursor<T> {
    first: Lookahead<T>,
    second: Lookahead<T>,
    selector: Selector<T>,
}

impl<T: Send + 'static> MergeCursor<T> {
    pub(crate) fn new(
        first: Box<dyn Cursor<T>>,
        second: Box<dyn Cursor<T>>,
        selector: Selector<T>,
    ) -> Self {
        Self {
            first: Lookahead::new(first),
            second: Lookahead::new(second),
            selector,
        }
    }
}

impl<T: Send + 'static> Cursor<T> for MergeCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(self.first.has_more()? || self.second.has_more()?)
    }

    fn take(&mut self) -> StreamResult<T> {
        let pick = match (self.first.peek()?, self.second.peek()?) {
            (Some(a), Some(b)) => (self.selector)(a, b)?,
            (Some(_), None) => MergeResult::TakeFirst,
            (None, Some(_)) => MergeResult::TakeSecond,
            (None, None) => return Err(StreamError::Exhausted),
        };
        match pick {
            MergeResult::TakeFirst => self.first.take(),
            MergeResult::TakeSecond => self.second.take(),
        }
    }

    fn exact_len(&self) -> Option<u64> {
        Some(self.first.exact_len()? + self.second.exact_len()?)
    }
}

// ================================
// Zip
// ================================

/// Pairs elements positionally, stopping at the shorter input.
pub struct ZipCursor<A, B, R> {
    a: Box<dyn Cursor<A>>,
    b: Box<dyn Cursor<B>>,
    zipper: Zipper2<A, B, R>,
}

impl<A, B, R> ZipCursor<A, B, R> {
    pub(crate) fn new(a: Box<dyn Cursor<A>>, b: Box<dyn Cursor<B>>, zipper: Zipper2<A, B, R>) -> Self {
        Self { a, b, zipper }
    }
}

impl<A, B, R> Cursor<R> for ZipCursor<A, B, R>
where
    A: Send + 'static,
    B: Send + 'static,
    R: Send + 'static,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(self.a.has_more()? && self.b.has_more()?)
    }

    fn take(&mut self) -> StreamResult<R> {
        if !self.has_more()? {
            return Err(StreamError::Exhausted);
        }
        let a = self.a.take()?;
        let b = self.b.take()?;
        (self.zipper)(a, b)
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        let mut skipped = 0;
        while skipped < n && self.has_more()? {
            self.a.take()?;
            self.b.take()?;
            skipped += 1;
        }
        Ok(skipped)
    }

    fn exact_len(&self) -> Option<u64> {
        Some(self.a.exact_len()?.min(self.b.exact_len()?))
    }
}

/// Pairs elements positionally until both inputs are exhausted, filling the
/// shorter side with a clone of its padding value.
pub struct ZipPaddedCursor<A, B, R> {
    a: Box<dyn Cursor<A>>,
    b: Box<dyn Cursor<B>>,
    pad_a: A,
    pad_b: B,
    zipper: Zipper2<A, B, R>,
}

impl<A, B, R> ZipPaddedCursor<A, B, R> {
    pub(crate) fn new(
        a: Box<dyn Cursor<A>>,
        b: Box<dyn Cursor<B>>,
        pad_a: A,
        pad_b: B,
        zipper: Zipper2<A, B, R>,
    ) -> Self {
        Self {
            a,
            b,
            pad_a,
            pad_b,
            zipper,
        }
    }
}

impl<A, B, R> Cursor<R> for ZipPaddedCursor<A, B, R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    R: Send + 'static,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(self.a.has_more()? || self.b.has_more()?)
    }

    fn take(&mut self) -> StreamResult<R> {
        if !self.has_more()? {
            return Err(StreamError::Exhausted);
        }
        let a = self.a.next()?.unwrap_or_else(|| self.pad_a.clone());
        let b = self.b.next()?.unwrap_or_else(|| self.pad_b.clone());
        (self.zipper)(a, b)
    }

    fn exact_len(&self) -> Option<u64> {
        Some(self.a.exact_len()?.max(self.b.exact_len()?))
    }
}

// ================================
// Zip3
// ================================

pub struct Zip3Cursor<A, B, C, R> {
    a: Box<dyn Cursor<A>>,
    b: Box<dyn Cursor<B>>,
    c: Box<dyn Cursor<C>>,
    zipper: Zipper3<A, B, C, R>,
}

impl<A, B, C, R> Zip3Cursor<A, B, C, R> {
    pub(crate) fn new(
        a: Box<dyn Cursor<A>>,
        b: Box<dyn Cursor<B>>,
        c: Box<dyn Cursor<C>>,
        zipper: Zipper3<A, B, C, R>,
    ) -> Self {
        Self { a, b, c, zipper }
    }
}

impl<A, B, C, R> Cursor<R> for Zip3Cursor<A, B, C, R>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    R: Send + 'static,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(self.a.has_more()? && self.b.has_more()? && self.c.has_more()?)
    }

    fn take(&mut self) -> StreamResult<R> {
        if !self.has_more()? {
            return Err(StreamError::Exhausted);
        }
        let a = self.a.take()?;
        let b = self.b.take()?;
        let c = self.c.take()?;
        (self.zipper)(a, b, c)
    }

    fn exact_len(&self) -> Option<u64> {
        let ab = self.a.exact_len()?.min(self.b.exact_len()?);
        Some(ab.min(self.c.exact_len()?))
    }
}

pub struct Zip3PaddedCursor<A, B, C, R> {
    a: Box<dyn Cursor<A>>,
    b: Box<dyn Cursor<B>>,
    c: Box<dyn Cursor<C>>,
    pads: (A, B, C),
    zipper: Zipper3<A, B, C, R>,
}

impl<A, B, C, R> Zip3PaddedCursor<A, B, C, R> {
    pub(crate) fn new(
        a: Box<dyn Cursor<A>>,
        b: Box<dyn Cursor<B>>,
        c: Box<dyn Cursor<C>>,
        pads: (A, B, C),
        zipper: Zipper3<A, B, C, R>,
    ) -> Self {
        Self {
            a,
            b,
            c,
            pads,
            zipper,
        }
    }
}

impl<A, B, C, R> Cursor<R> for Zip3PaddedCursor<A, B, C, R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
    R: Send + 'static,
{
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(self.a.has_more()? || self.b.has_more()? || self.c.has_more()?)
    }

    fn take(&mut self) -> StreamResult<R> {
        if !self.has_more()? {
            return Err(StreamError::Exhausted);
        }
        let a = self.a.next()?.unwrap_or_else(|| self.pads.0.clone());
        let b = self.b.next()?.unwrap_or_else(|| self.pads.1.clone());
        let c = self.c.next()?.unwrap_or_else(|| self.pads.2.clone());
        (self.zipper)(a, b, c)
    }

    fn exact_len(&self) -> Option<u64> {
        let ab = self.a.exact_len()?.max(self.b.exact_len()?);
        Some(ab.max(self.c.exact_len()?))
    }
}
