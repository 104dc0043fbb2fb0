//! Generated sources: numeric ranges, repetition and iteration.

use std::sync::Arc;

use crate::error::{StreamError, StreamResult};
use crate::numeric::Numeric;
use crate::stream::core::Cursor;

// ================================
// Range
// ================================

/// Half-open numeric range `[start, end)` stepping by one.
pub struct RangeCursor<T> {
    next: T,
    end: T,
}

impl<T: Numeric> RangeCursor<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { next: start, end }
    }
}

impl<T: Numeric> Cursor<T> for RangeCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(self.next < self.end)
    }

    fn take(&mut self) -> StreamResult<T> {
        if self.next >= self.end {
            return Err(StreamError::Exhausted);
        }
        let current = self.next;
        self.next = current + T::one();
        Ok(current)
    }

    fn exact_len(&self) -> Option<u64> {
        if self.next >= self.end {
            return Some(0);
        }
        span_len(self.next, self.end)
    }

    fn remaining_count(&mut self) -> StreamResult<u64> {
        match self.exact_len() {
            Some(len) => {
                self.next = self.end;
                Ok(len)
            }
            None => {
                let mut count = 0;
                while self.has_more()? {
                    self.take()?;
                    count += 1;
                }
                Ok(count)
            }
        }
    }
}

/// Number of unit steps from `from` up to, but excluding, `to`, for
/// `from < to`. Each endpoint is widened before subtracting so spans wider
/// than `T::MAX` do not overflow.
fn span_len<T: Numeric>(from: T, to: T) -> Option<u64> {
    let two = T::one() + T::one();
    if T::one() / two == T::zero() {
        let span = to.to_i128()?.checked_sub(from.to_i128()?)?;
        return u64::try_from(span).ok();
    }
    let span = to.to_f64()? - from.to_f64()?;
    Some(span.ceil() as u64)
}

// ================================
// Repeat
// ================================

pub struct RepeatCursor<T> {
    value: T,
    remaining: u64,
}

impl<T: Clone> RepeatCursor<T> {
    pub fn new(value: T, times: u64) -> Self {
        Self {
            value,
            remaining: times,
        }
    }
}

impl<T: Clone + Send + 'static> Cursor<T> for RepeatCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(self.remaining > 0)
    }

    fn take(&mut self) -> StreamResult<T> {
        if self.remaining == 0 {
            return Err(StreamError::Exhausted);
        }
        self.remaining -= 1;
        Ok(self.value.clone())
    }

    fn remaining_count(&mut self) -> StreamResult<u64> {
        Ok(std::mem::take(&mut self.remaining))
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        let skipped = n.min(self.remaining);
        self.remaining -= skipped;
        Ok(skipped)
    }

    fn exact_len(&self) -> Option<u64> {
        Some(self.remaining)
    }
}

// ================================
// Iterate
// ================================

type HasNext<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type NextFn<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;

/// `seed, next(seed), next(next(seed)), ...` while `has_next` holds for the
/// element about to be emitted.
pub struct IterateCursor<T> {
    current: Option<T>,
    has_next: HasNext<T>,
    next: NextFn<T>,
    started: bool,
}

impl<T> IterateCursor<T> {
    pub(crate) fn new(seed: T, has_next: HasNext<T>, next: NextFn<T>) -> Self {
        Self {
            current: Some(seed),
            has_next,
            next,
            started: false,
        }
    }
}

impl<T: Send + 'static> Cursor<T> for IterateCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        if !self.started {
            self.started = true;
            if let Some(seed) = &self.current {
                if !(self.has_next)(seed) {
                    self.current = None;
                }
            }
        }
        Ok(self.current.is_some())
    }

    fn take(&mut self) -> StreamResult<T> {
        self.has_more()?;
        let current = self.current.take().ok_or(StreamError::Exhausted)?;
        let following = (self.next)(&current);
        if (self.has_next)(&following) {
            self.current = Some(following);
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_len_spans_whole_integer_domain() {
        let cursor = RangeCursor::new(i32::MIN, i32::MAX);
        assert_eq!(cursor.exact_len(), Some(u32::MAX as u64));

        let cursor = RangeCursor::new(i64::MIN, i64::MAX);
        assert_eq!(cursor.exact_len(), Some(u64::MAX));

        let cursor = RangeCursor::new(u8::MIN, u8::MAX);
        assert_eq!(cursor.exact_len(), Some(255));
    }

    #[test]
    fn test_range_len_of_fractional_bounds() {
        let mut cursor = RangeCursor::new(0.1_f64, 1.9);
        assert_eq!(cursor.exact_len(), Some(2));
        assert_eq!(cursor.drain_to_vec().unwrap().len(), 2);

        assert_eq!(RangeCursor::new(3, 3).exact_len(), Some(0));
    }
}
