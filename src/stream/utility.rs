//! Positional combinators: limit, skip, step, take_while, drop_while.
use crate::error::{StreamError, StreamResult};
use crate::stream::core::{Cursor, Predicate};

// Limit
pub struct LimitCursor<T> {
    pub(crate) upstream: Box<dyn Cursor<T>>,
    pub(crate) remaining: u64,
}

impl<T: Send + 'static> Cursor<T> for LimitCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        Ok(self.remaining > 0 && self.upstream.has_more()?)
    }

    fn take(&mut self) -> StreamResult<T> {
        if self.remaining == 0 {
            return Err(StreamError::Exhausted);
        }
        let item = self.upstream.take()?;
        self.remaining -= 1;
        Ok(item)
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        let skipped = self.upstream.skip(n.min(self.remaining))?;
        self.remaining -= skipped;
        Ok(skipped)
    }

    fn exact_len(&self) -> Option<u64> {
        self.upstream.exact_len().map(|n| n.min(self.remaining))
    }
}

// Skip
pub struct SkipCursor<T> {
    pub(crate) upstream: Box<dyn Cursor<T>>,
    pub(crate) pending: u64,
}

impl<T: Send + 'static> SkipCursor<T> {
    fn settle(&mut self) -> StreamResult<()> {
        if self.pending > 0 {
            let n = std::mem::take(&mut self.pending);
            self.upstream.skip(n)?;
        }
        Ok(())
    }
}

impl<T: Send + 'static> Cursor<T> for SkipCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        self.settle()?;
        self.upstream.has_more()
    }

    fn take(&mut self) -> StreamResult<T> {
        self.settle()?;
        self.upstream.take()
    }

    fn remaining_count(&mut self) -> StreamResult<u64> {
        self.settle()?;
        self.upstream.remaining_count()
    }

    fn skip(&mut self, n: u64) -> StreamResult<u64> {
        self.settle()?;
        self.upstream.skip(n)
    }

    fn exact_len(&self) -> Option<u64> {
        self.upstream
            .exact_len()
            .map(|n| n.saturating_sub(self.pending))
    }
}

// Step
/// Emits the first element, then every `step`-th after it.
pub struct StepCursor<T> {
    pub(crate) upstream: Box<dyn Cursor<T>>,
    pub(crate) step: u64,
    pub(crate) started: bool,
}

impl<T: Send + 'static> StepCursor<T> {
    fn settle(&mut self) -> StreamResult<()> {
        if self.started {
            self.upstream.skip(self.step - 1)?;
            self.started = false;
        }
        Ok(())
    }
}

impl<T: Send + 'static> Cursor<T> for StepCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        self.settle()?;
        self.upstream.has_more()
    }

    fn take(&mut self) -> StreamResult<T> {
        self.settle()?;
        let item = self.upstream.take()?;
        self.started = true;
        Ok(item)
    }
}

// TakeWhile
pub struct TakeWhileCursor<T> {
    pub(crate) upstream: Box<dyn Cursor<T>>,
    pub(crate) predicate: Predicate<T>,
    pub(crate) slot: Option<T>,
    pub(crate) done: bool,
}

impl<T: Send + 'static> Cursor<T> for TakeWhileCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        if self.slot.is_none() && !self.done {
            match self.upstream.next()? {
                Some(item) => {
                    if (self.predicate)(&item)? {
                        self.slot = Some(item);
                    } else {
                        self.done = true;
                    }
                }
                None => self.done = true,
            }
        }
        Ok(self.slot.is_some())
    }

    fn take(&mut self) -> StreamResult<T> {
        self.has_more()?;
        self.slot.take().ok_or(StreamError::Exhausted)
    }
}

// DropWhile
pub struct DropWhileCursor<T> {
    pub(crate) upstream: Box<dyn Cursor<T>>,
    pub(crate) predicate: Predicate<T>,
    pub(crate) slot: Option<T>,
    pub(crate) dropping: bool,
}

impl<T: Send + 'static> DropWhileCursor<T> {
    fn settle(&mut self) -> StreamResult<()> {
        while self.dropping {
            match self.upstream.next()? {
                Some(item) => {
                    if !(self.predicate)(&item)? {
                        self.slot = Some(item);
                        self.dropping = false;
                    }
                }
                None => self.dropping = false,
            }
        }
        Ok(())
    }
}

impl<T: Send + 'static> Cursor<T> for DropWhileCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        self.settle()?;
        Ok(self.slot.is_some() || self.upstream.has_more()?)
    }

    fn take(&mut self) -> StreamResult<T> {
        self.settle()?;
        match self.slot.take() {
            Some(item) => Ok(item),
            None => self.upstream.take(),
        }
    }
}
