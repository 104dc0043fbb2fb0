//! The [`RStream`] facade: sources, intermediate operators and execution
//! mode switching. Terminal operations live in `terminal.rs`.
//!
//! Every operator consumes the receiving stream and returns a new one that
//! wraps a new cursor (or a re-sliced buffer), carrying what is known about
//! its order, the execution context and the resource chain forward.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{check_positive, BoxError, StreamError, StreamResult};
use crate::numeric::Numeric;
use crate::resource_chain::{CloseHandler, ResourceChain};
use crate::source::Source;
use crate::stream::advanced::{
    CollapseCursor, DistinctCursor, ScanCursor, SeededScanCursor, SetOp, SetOpCursor,
};
use crate::stream::constructors::{IterateCursor, RangeCursor, RepeatCursor};
use crate::stream::core::{
    Cursor, FilterCursor, FlatMapCursor, IterCursor, MapCursor, PeekCursor,
};
use crate::stream::ordering::{Comparator, ReversedCursor, SortedCursor};
use crate::stream::specialized::{ChunkCursor, Segment, SlidingCursor, SplitCursor, SplitOnCursor};
use crate::stream::utility::{
    DropWhileCursor, LimitCursor, SkipCursor, StepCursor, TakeWhileCursor,
};
use crate::stream_configuration::ExecutionConfig;
use crate::worker_pool::ExecutionContext;

/// What a stream knows about the natural order of its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sortedness {
    Unknown,
    Ascending,
    Descending,
}

impl Sortedness {
    /// The same elements read back to front.
    pub(crate) fn reversed(self) -> Self {
        match self {
            Sortedness::Unknown => Sortedness::Unknown,
            Sortedness::Ascending => Sortedness::Descending,
            Sortedness::Descending => Sortedness::Ascending,
        }
    }

    /// `self` while `holds`, otherwise nothing is known.
    pub(crate) fn kept_if(self, holds: bool) -> Self {
        if holds {
            self
        } else {
            Sortedness::Unknown
        }
    }
}

/// A lazy, single-use pipeline over elements of type `T`.
///
/// Streams run sequentially on the calling thread unless switched with
/// [`RStream::parallel`] and friends, in which case terminal operations
/// partition the work across the context's worker pool. Either way the
/// stream's close handlers run exactly once: after a terminal operation, on
/// [`RStream::close`], or when the stream is dropped unused.
pub struct RStream<T: Send + 'static> {
    source: Source<T>,
    sorted: Sortedness,
    context: Option<ExecutionContext>,
    resources: ResourceChain,
}

/// A stream taken apart, for terminal operations and combinators.
pub(crate) struct Parts<T> {
    pub(crate) source: Source<T>,
    pub(crate) sorted: Sortedness,
    pub(crate) context: Option<ExecutionContext>,
    pub(crate) resources: ResourceChain,
}

impl<T: Send + 'static> RStream<T> {
    pub(crate) fn from_parts(parts: Parts<T>) -> Self {
        Self {
            source: parts.source,
            sorted: parts.sorted,
            context: parts.context,
            resources: parts.resources,
        }
    }

    /// Move everything out, leaving nothing for `Drop` to release.
    pub(crate) fn into_parts(mut self) -> Parts<T> {
        Parts {
            source: std::mem::replace(&mut self.source, Source::empty()),
            sorted: self.sorted,
            context: self.context.take(),
            resources: self.resources.take(),
        }
    }

    fn with_source(source: Source<T>) -> Self {
        Self {
            source,
            sorted: Sortedness::Unknown,
            context: None,
            resources: ResourceChain::new(),
        }
    }

    /// Wrap the current cursor in a new stage.
    fn derive<U, F>(self, sorted: Sortedness, stage: F) -> RStream<U>
    where
        U: Send + 'static,
        F: FnOnce(Box<dyn Cursor<T>>) -> Box<dyn Cursor<U>>,
    {
        let parts = self.into_parts();
        RStream {
            source: Source::Generated(stage(parts.source.into_cursor())),
            sorted,
            context: parts.context,
            resources: parts.resources,
        }
    }

    /// The cursor, closing this stream's handlers once it is exhausted or
    /// dropped. Used when a stream is consumed as part of another one.
    pub(crate) fn into_scoped_cursor(self) -> Box<dyn Cursor<T>> {
        let parts = self.into_parts();
        let cursor = parts.source.into_cursor();
        if parts.resources.is_empty() {
            cursor
        } else {
            Box::new(ScopedCursor {
                inner: cursor,
                resources: parts.resources,
            })
        }
    }

    fn inherit(mut self, context: Option<ExecutionContext>, sorted: Sortedness) -> Self {
        self.context = context;
        self.sorted = sorted;
        self
    }

    // ================================
    // Sources
    // ================================

    pub fn of(items: impl IntoIterator<Item = T>) -> Self {
        Self::from_vec(items.into_iter().collect())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self::with_source(Source::from_vec(items))
    }

    /// Lazily pull from an iterator. Nothing is read until a terminal
    /// operation runs.
    #[allow(clippy::should_implement_trait)]
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_cursor(Box::new(IterCursor::new(items.into_iter())))
    }

    pub fn from_cursor(cursor: Box<dyn Cursor<T>>) -> Self {
        Self::with_source(Source::Generated(cursor))
    }

    pub fn empty() -> Self {
        Self::with_source(Source::empty())
    }

    /// `seed, next(seed), next(next(seed)), ...` for as long as `has_next`
    /// accepts the element about to be emitted.
    pub fn iterate<H, N>(seed: T, has_next: H, next: N) -> Self
    where
        H: Fn(&T) -> bool + Send + Sync + 'static,
        N: Fn(&T) -> T + Send + Sync + 'static,
    {
        Self::from_cursor(Box::new(IterateCursor::new(
            seed,
            Arc::new(has_next),
            Arc::new(next),
        )))
    }

    // ================================
    // Execution mode
    // ================================

    /// Run terminal operations on a worker pool sized to the machine. A
    /// stream that is already parallel keeps its context.
    pub fn parallel(self) -> Self {
        if self.context.is_some() {
            return self;
        }
        let context = ExecutionContext::with_config(ExecutionConfig::default());
        self.inherit_context(Some(context))
    }

    /// Run terminal operations under `config`. A stream that is already
    /// parallel keeps its pool; tasks beyond the pool's size queue.
    pub fn parallel_with(self, config: ExecutionConfig) -> StreamResult<Self> {
        config.validate()?;
        let context = match &self.context {
            Some(current) => current.reconfigured(config),
            None => ExecutionContext::with_config(config),
        };
        Ok(self.inherit_context(Some(context)))
    }

    /// Run terminal operations on an application-supplied context.
    pub fn parallel_on(self, context: ExecutionContext) -> StreamResult<Self> {
        context.config().validate()?;
        Ok(self.inherit_context(Some(context)))
    }

    pub fn sequential(self) -> Self {
        self.inherit_context(None)
    }

    fn inherit_context(mut self, context: Option<ExecutionContext>) -> Self {
        self.context = context;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.context.is_some()
    }

    /// Known to be in ascending natural order.
    pub fn is_sorted(&self) -> bool {
        self.sorted == Sortedness::Ascending
    }

    /// Known to be in descending natural order.
    pub fn is_reverse_sorted(&self) -> bool {
        self.sorted == Sortedness::Descending
    }

    pub fn execution_config(&self) -> Option<&ExecutionConfig> {
        self.context.as_ref().map(ExecutionContext::config)
    }

    // ================================
    // Resources
    // ================================

    /// Register a release callback, run when this stream (or the stream
    /// finally derived from it) is closed.
    pub fn on_close<F, E>(self, handler: F) -> Self
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.on_close_handler(Arc::new(move || handler().map_err(Into::into)))
    }

    /// Register a shared handler. The same `Arc` registered twice runs once.
    pub fn on_close_handler(mut self, handler: CloseHandler) -> Self {
        self.resources.push(handler);
        self
    }

    // ================================
    // Per-element stages
    // ================================

    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.try_filter(move |item| Ok::<_, Infallible>(predicate(item)))
    }

    pub fn try_filter<P, E>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let sorted = self.sorted.kept_if(self.context.is_none());
        let predicate = Arc::new(move |item: &T| predicate(item).map_err(StreamError::callback));
        self.derive(sorted, |up| Box::new(FilterCursor::new(up, predicate)))
    }

    pub fn map<U, F>(self, f: F) -> RStream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.try_map(move |item| Ok::<_, Infallible>(f(item)))
    }

    pub fn try_map<U, F, E>(self, f: F) -> RStream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let f = Arc::new(move |item: T| f(item).map_err(StreamError::callback));
        self.derive(Sortedness::Unknown, |up| Box::new(MapCursor::new(up, f)))
    }

    /// Replace every element with the elements of the stream `f` returns.
    /// Each inner stream is closed once it has been drained.
    pub fn flat_map<U, F>(self, f: F) -> RStream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> RStream<U> + Send + Sync + 'static,
    {
        self.try_flat_map(move |item| Ok::<_, Infallible>(f(item)))
    }

    pub fn try_flat_map<U, F, E>(self, f: F) -> RStream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Result<RStream<U>, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let f = Arc::new(move |item: T| {
            f(item)
                .map(RStream::into_scoped_cursor)
                .map_err(StreamError::callback)
        });
        self.derive(Sortedness::Unknown, |up| Box::new(FlatMapCursor::new(up, f)))
    }

    pub fn flat_map_iter<U, I, F>(self, f: F) -> RStream<U>
    where
        U: Send + 'static,
        I: IntoIterator<Item = U>,
        I::IntoIter: Send + 'static,
        F: Fn(T) -> I + Send + Sync + 'static,
    {
        let f = Arc::new(move |item: T| {
            Ok::<_, StreamError>(Box::new(IterCursor::new(f(item).into_iter())) as Box<dyn Cursor<U>>)
        });
        self.derive(Sortedness::Unknown, |up| Box::new(FlatMapCursor::new(up, f)))
    }

    /// Run `action` on every element as it flows past.
    pub fn peek<F>(self, action: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.try_peek(move |item| {
            action(item);
            Ok::<_, Infallible>(())
        })
    }

    pub fn try_peek<F, E>(self, action: F) -> Self
    where
        F: Fn(&T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let sorted = self.sorted;
        let action = Arc::new(move |item: &T| action(item).map_err(StreamError::callback));
        self.derive(sorted, |up| Box::new(PeekCursor::new(up, action)))
    }

    // ================================
    // Positional stages
    // ================================

    pub fn limit(self, n: u64) -> Self {
        self.slice(0, n)
    }

    pub fn skip(self, n: u64) -> Self {
        self.slice(n, u64::MAX)
    }

    fn slice(self, skip: u64, limit: u64) -> Self {
        let mut parts = self.into_parts();
        match parts.source.try_slice(skip, limit) {
            Ok(source) => {
                parts.source = source;
                RStream::from_parts(parts)
            }
            Err(source) => {
                let sorted = parts.sorted;
                parts.source = source;
                RStream::from_parts(parts).derive(sorted, |up| {
                    let skipped: Box<dyn Cursor<T>> = if skip > 0 {
                        Box::new(SkipCursor {
                            upstream: up,
                            pending: skip,
                        })
                    } else {
                        up
                    };
                    if limit == u64::MAX {
                        skipped
                    } else {
                        Box::new(LimitCursor {
                            upstream: skipped,
                            remaining: limit,
                        })
                    }
                })
            }
        }
    }

    /// Keep the first element and every `step`-th after it.
    pub fn step(self, step: usize) -> StreamResult<Self> {
        check_positive("step", step)?;
        if step == 1 {
            return Ok(self);
        }
        let sorted = self.sorted;
        Ok(self.derive(sorted, |up| {
            Box::new(StepCursor {
                upstream: up,
                step: step as u64,
                started: false,
            })
        }))
    }

    pub fn take_while<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.try_take_while(move |item| Ok::<_, Infallible>(predicate(item)))
    }

    pub fn try_take_while<P, E>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let sorted = self.sorted;
        let predicate = Arc::new(move |item: &T| predicate(item).map_err(StreamError::callback));
        self.derive(sorted, |up| {
            Box::new(TakeWhileCursor {
                upstream: up,
                predicate,
                slot: None,
                done: false,
            })
        })
    }

    pub fn drop_while<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.try_drop_while(move |item| Ok::<_, Infallible>(predicate(item)))
    }

    pub fn try_drop_while<P, E>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let sorted = self.sorted;
        let predicate = Arc::new(move |item: &T| predicate(item).map_err(StreamError::callback));
        self.derive(sorted, |up| {
            Box::new(DropWhileCursor {
                upstream: up,
                predicate,
                slot: None,
                dropping: true,
            })
        })
    }

    // ================================
    // Stateful stages
    // ================================

    /// Keep the first element seen for every key, in encounter order.
    pub fn distinct_by<K, F>(self, key: F) -> Self
    where
        K: Hash + Eq + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.try_distinct_by(move |item| Ok::<_, Infallible>(key(item)))
    }

    pub fn try_distinct_by<K, F, E>(self, key: F) -> Self
    where
        K: Hash + Eq + Send + 'static,
        F: Fn(&T) -> Result<K, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let sorted = self.sorted;
        let key = Arc::new(move |item: &T| key(item).map_err(StreamError::callback));
        self.derive(sorted, |up| Box::new(DistinctCursor::new(up, key)))
    }

    /// Merge runs of adjacent elements where `mergeable(previous, next)`
    /// holds, folding each run with `combine`.
    pub fn collapse<M, C>(self, mergeable: M, combine: C) -> Self
    where
        T: Clone,
        M: Fn(&T, &T) -> bool + Send + Sync + 'static,
        C: Fn(T, T) -> T + Send + Sync + 'static,
    {
        self.try_collapse(
            move |a, b| Ok::<_, Infallible>(mergeable(a, b)),
            move |a, b| Ok(combine(a, b)),
        )
    }

    pub fn try_collapse<M, C, E>(self, mergeable: M, combine: C) -> Self
    where
        T: Clone,
        M: Fn(&T, &T) -> Result<bool, E> + Send + Sync + 'static,
        C: Fn(T, T) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let mergeable = Arc::new(move |a: &T, b: &T| mergeable(a, b).map_err(StreamError::callback));
        let combine = Arc::new(move |a: T, b: T| combine(a, b).map_err(StreamError::callback));
        self.derive(Sortedness::Unknown, |up| {
            Box::new(CollapseCursor::new(up, mergeable, combine))
        })
    }

    /// Running fold. The first element is emitted unchanged; every later
    /// emission is `accumulate(previous_emission, next)`.
    pub fn scan<F>(self, accumulate: F) -> Self
    where
        T: Clone,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        self.try_scan(move |acc, item| Ok::<_, Infallible>(accumulate(acc, item)))
    }

    pub fn try_scan<F, E>(self, accumulate: F) -> Self
    where
        T: Clone,
        F: Fn(T, T) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let accumulate =
            Arc::new(move |acc: T, item: T| accumulate(acc, item).map_err(StreamError::callback));
        self.derive(Sortedness::Unknown, |up| Box::new(ScanCursor::new(up, accumulate)))
    }

    /// Running fold whose first emission is `seed`.
    pub fn scan_with_seed<A, F>(self, seed: A, accumulate: F) -> RStream<A>
    where
        A: Clone + Send + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        self.try_scan_with_seed(seed, move |acc, item| Ok::<_, Infallible>(accumulate(acc, item)))
    }

    pub fn try_scan_with_seed<A, F, E>(self, seed: A, accumulate: F) -> RStream<A>
    where
        A: Clone + Send + 'static,
        F: Fn(A, T) -> Result<A, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let accumulate =
            Arc::new(move |acc: A, item: T| accumulate(acc, item).map_err(StreamError::callback));
        self.derive(Sortedness::Unknown, |up| {
            Box::new(SeededScanCursor::new(up, seed, accumulate))
        })
    }

    // ================================
    // Ordering
    // ================================

    /// Stable sort by `compare`. Forgets any known natural order.
    ///
    /// The sort is a barrier: it runs when first pulled, on the pool of the
    /// terminal operation that pulls it, so a later `.sequential()` keeps
    /// it on the calling thread.
    pub fn sorted_by<F>(self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.sort_with(Arc::new(compare), Sortedness::Unknown)
    }

    pub fn sorted_by_key<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.sorted_by(move |a, b| key(a).cmp(&key(b)))
    }

    fn sort_with(self, compare: Comparator<T>, order: Sortedness) -> Self {
        self.derive(order, |up| Box::new(SortedCursor::new(up, compare)))
    }

    /// Serve the elements back to front.
    pub fn reversed(self) -> Self {
        let sorted = self.sorted.reversed();
        self.derive(sorted, |up| Box::new(ReversedCursor::new(up)))
    }

    // ================================
    // Windowing
    // ================================

    /// Elements grouped into sub-streams by `stage`, each inheriting this
    /// stream's sortedness and the context it had when the stage was added.
    fn windows<F>(self, stage: F) -> RStream<RStream<T>>
    where
        F: FnOnce(Box<dyn Cursor<T>>) -> Box<dyn Cursor<Vec<T>>>,
    {
        let context = self.context.clone();
        let sorted = self.sorted;
        let wrap = Arc::new(move |items: Vec<T>| {
            Ok::<_, StreamError>(RStream::from_vec(items).inherit(context.clone(), sorted))
        });
        self.derive(Sortedness::Unknown, |up| Box::new(MapCursor::new(stage(up), wrap)))
    }

    /// Consecutive chunks of `size` elements; the last may be shorter.
    pub fn chunks(self, size: usize) -> StreamResult<RStream<RStream<T>>> {
        check_positive("chunk size", size)?;
        Ok(self.windows(|up| Box::new(ChunkCursor::new(up, size))))
    }

    /// Chunks of consecutive elements for which `predicate` gives the same
    /// answer.
    pub fn split_on<P>(self, predicate: P) -> RStream<RStream<T>>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.try_split_on(move |item| Ok::<_, Infallible>(predicate(item)))
    }

    pub fn try_split_on<P, E>(self, predicate: P) -> RStream<RStream<T>>
    where
        P: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let predicate = Arc::new(move |item: &T| predicate(item).map_err(StreamError::callback));
        self.windows(|up| Box::new(SplitOnCursor::new(up, predicate)))
    }

    /// Windows of `size` elements whose starts are `increment` apart.
    pub fn sliding(self, size: usize, increment: usize) -> StreamResult<RStream<RStream<T>>>
    where
        T: Clone,
    {
        check_positive("window size", size)?;
        check_positive("window increment", increment)?;
        Ok(self.windows(|up| Box::new(SlidingCursor::new(up, size, increment))))
    }

    fn segments<F>(self, stage: F) -> RStream<RStream<T>>
    where
        F: FnOnce(Box<dyn Cursor<T>>) -> SplitCursor<T>,
    {
        let context = self.context.clone();
        let sorted = self.sorted;
        let wrap = Arc::new(move |segment: Segment<T>| {
            let stream = match segment {
                Segment::Buffered(items) => RStream::from_vec(items),
                Segment::Remainder(cursor) => RStream::from_cursor(cursor),
            };
            Ok::<_, StreamError>(stream.inherit(context.clone(), sorted))
        });
        self.derive(Sortedness::Unknown, |up| {
            Box::new(MapCursor::new(Box::new(stage(up)), wrap))
        })
    }

    /// Exactly two sub-streams: the first `n` elements and the rest.
    pub fn split_at(self, n: u64) -> RStream<RStream<T>> {
        self.segments(|up| SplitCursor::at(up, n))
    }

    /// Exactly two sub-streams: the longest prefix satisfying `predicate`
    /// and the rest, starting with the first element that failed it.
    ///
    /// Always evaluated in encounter order on the pulling thread; the
    /// predicate is expected to be pure.
    pub fn split_by<P>(self, predicate: P) -> RStream<RStream<T>>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.try_split_by(move |item| Ok::<_, Infallible>(predicate(item)))
    }

    pub fn try_split_by<P, E>(self, predicate: P) -> RStream<RStream<T>>
    where
        P: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let predicate = Arc::new(move |item: &T| predicate(item).map_err(StreamError::callback));
        self.segments(|up| SplitCursor::by(up, predicate))
    }

    // ================================
    // Concatenation
    // ================================

    /// This stream followed by `other`. Both resource chains are kept.
    pub fn append(self, other: RStream<T>) -> Self {
        crate::combinators::concat(self, other)
    }

    /// `other` followed by this stream. Keeps this stream's context.
    pub fn prepend(self, other: RStream<T>) -> Self {
        let context = self.context.clone();
        crate::combinators::concat(other, self).inherit_context(context)
    }
}

impl<T: Hash + Eq + Send + 'static> RStream<T> {
    /// Drop repeated elements, keeping first occurrences in order.
    pub fn distinct(self) -> Self
    where
        T: Clone,
    {
        self.distinct_by(T::clone)
    }

    /// Elements also present in `other`, matched one for one.
    pub fn intersection(self, other: impl IntoIterator<Item = T>) -> Self
    where
        T: Clone,
    {
        self.set_op(SetOp::Intersection, other.into_iter().collect())
    }

    /// Elements left after cancelling one occurrence per occurrence in
    /// `other`.
    pub fn difference(self, other: impl IntoIterator<Item = T>) -> Self
    where
        T: Clone,
    {
        self.set_op(SetOp::Difference, other.into_iter().collect())
    }

    /// `self - other` followed by `other - self`.
    pub fn symmetric_difference(self, other: impl IntoIterator<Item = T>) -> Self
    where
        T: Clone,
    {
        self.set_op(SetOp::SymmetricDifference, other.into_iter().collect())
    }

    fn set_op(self, op: SetOp, other: Vec<T>) -> Self
    where
        T: Clone,
    {
        let sorted = self.sorted.kept_if(op != SetOp::SymmetricDifference);
        self.derive(sorted, |up| Box::new(SetOpCursor::new(up, op, other)))
    }
}

impl<T: Ord + Send + 'static> RStream<T> {
    /// Sort by natural order. A stream already known to be sorted is
    /// returned as is.
    pub fn sorted(self) -> Self {
        if self.sorted == Sortedness::Ascending {
            return self;
        }
        self.sort_with(Arc::new(T::cmp), Sortedness::Ascending)
    }

    /// Sort by descending natural order. A stream already known to be in
    /// that order is returned as is.
    pub fn reverse_sorted(self) -> Self {
        if self.sorted == Sortedness::Descending {
            return self;
        }
        self.sort_with(Arc::new(|a: &T, b: &T| b.cmp(a)), Sortedness::Descending)
    }
}

impl<T: Clone + Send + 'static> RStream<T> {
    pub fn repeat(value: T, times: u64) -> Self {
        Self::from_cursor(Box::new(RepeatCursor::new(value, times)))
    }
}

impl<T: Numeric> RStream<T> {
    /// `[start, end)` stepping by one.
    pub fn range(start: T, end: T) -> Self {
        let mut stream = Self::from_cursor(Box::new(RangeCursor::new(start, end)));
        stream.sorted = Sortedness::Ascending;
        stream
    }
}

impl<T: Send + 'static> Drop for RStream<T> {
    fn drop(&mut self) {
        if self.resources.is_empty() {
            return;
        }
        if let Err(e) = self.resources.take().close() {
            log::warn!("close handlers failed while dropping stream: {}", e);
        }
    }
}

impl<T: Send + 'static> fmt::Debug for RStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RStream")
            .field("materialized", &self.source.is_materialized())
            .field("known_len", &self.source.exact_len())
            .field("sorted", &self.sorted)
            .field("context", &self.context)
            .field("resources", &self.resources)
            .finish()
    }
}

impl<T: Send + 'static> FromIterator<T> for RStream<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        RStream::of(iter)
    }
}

// ================================
// ScopedCursor
// ================================

/// A nested stream's cursor that releases the stream's handlers when
/// exhausted, or when dropped early.
struct ScopedCursor<T> {
    inner: Box<dyn Cursor<T>>,
    resources: ResourceChain,
}

impl<T: Send + 'static> Cursor<T> for ScopedCursor<T> {
    fn has_more(&mut self) -> StreamResult<bool> {
        let more = self.inner.has_more()?;
        if !more && !self.resources.is_empty() {
            self.resources.take().close()?;
        }
        Ok(more)
    }

    fn take(&mut self) -> StreamResult<T> {
        self.inner.take()
    }

    fn exact_len(&self) -> Option<u64> {
        self.inner.exact_len()
    }
}

impl<T> Drop for ScopedCursor<T> {
    fn drop(&mut self) {
        if self.resources.is_empty() {
            return;
        }
        if let Err(e) = self.resources.take().close() {
            log::warn!("close handlers of a nested stream failed: {}", e);
        }
    }
}
