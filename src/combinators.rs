//! Multi-stream combinators: concatenation, selector-driven merge and zip.
//!
//! The result takes its execution context from the first input and carries
//! the close handlers of every input. None of them preserve sortedness.

use std::convert::Infallible;
use std::sync::Arc;

use crate::error::{BoxError, StreamError};
use crate::resource_chain::ResourceChain;
use crate::rstream::{Parts, RStream, Sortedness};
use crate::source::Source;
use crate::stream::core::{ConcatCursor, Cursor};
use crate::stream::select::{
    MergeCursor, MergeResult, Zip3Cursor, Zip3PaddedCursor, ZipCursor, ZipPaddedCursor,
};
use crate::worker_pool::ExecutionContext;

/// `a` then `b`.
pub fn concat<T: Send + 'static>(a: RStream<T>, b: RStream<T>) -> RStream<T> {
    concat_all([a, b])
}

/// Every stream in turn.
pub fn concat_all<T, I>(streams: I) -> RStream<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = RStream<T>>,
{
    let mut inputs = Inputs::new();
    let cursors = streams.into_iter().map(|s| inputs.absorb(s)).collect();
    inputs.build(Box::new(ConcatCursor::new(cursors)))
}

/// Cursors of several inputs plus the state the combined stream inherits.
struct Inputs {
    context: Option<ExecutionContext>,
    resources: ResourceChain,
}

impl Inputs {
    fn new() -> Self {
        Self {
            context: None,
            resources: ResourceChain::new(),
        }
    }

    fn absorb<T: Send + 'static>(&mut self, stream: RStream<T>) -> Box<dyn Cursor<T>> {
        let parts = stream.into_parts();
        if self.context.is_none() {
            self.context = parts.context;
        }
        self.resources.extend(parts.resources);
        parts.source.into_cursor()
    }

    fn build<R: Send + 'static>(self, cursor: Box<dyn Cursor<R>>) -> RStream<R> {
        RStream::from_parts(Parts {
            source: Source::Generated(cursor),
            sorted: Sortedness::Unknown,
            context: self.context,
            resources: self.resources,
        })
    }
}

/// Interleave `a` and `b`, asking `selector(head_a, head_b)` which head to
/// emit next. Once one side runs dry the other is drained as is, so two
/// sorted inputs with an ordering selector merge into a sorted output.
pub fn merge<T, F>(a: RStream<T>, b: RStream<T>, selector: F) -> RStream<T>
where
    T: Send + 'static,
    F: Fn(&T, &T) -> MergeResult + Send + Sync + 'static,
{
    try_merge(a, b, move |x, y| Ok::<_, Infallible>(selector(x, y)))
}

pub fn try_merge<T, F, E>(a: RStream<T>, b: RStream<T>, selector: F) -> RStream<T>
where
    T: Send + 'static,
    F: Fn(&T, &T) -> Result<MergeResult, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    let selector = Arc::new(move |x: &T, y: &T| selector(x, y).map_err(StreamError::callback));
    let mut inputs = Inputs::new();
    let a = inputs.absorb(a);
    let b = inputs.absorb(b);
    inputs.build(Box::new(MergeCursor::new(a, b, selector)))
}

/// Three-way merge: `a` and `b` first, then the result with `c`.
pub fn merge3<T, F>(a: RStream<T>, b: RStream<T>, c: RStream<T>, selector: F) -> RStream<T>
where
    T: Send + 'static,
    F: Fn(&T, &T) -> MergeResult + Send + Sync + 'static,
{
    try_merge3(a, b, c, move |x, y| Ok::<_, Infallible>(selector(x, y)))
}

pub fn try_merge3<T, F, E>(a: RStream<T>, b: RStream<T>, c: RStream<T>, selector: F) -> RStream<T>
where
    T: Send + 'static,
    F: Fn(&T, &T) -> Result<MergeResult, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    let selector = Arc::new(selector);
    let first = Arc::clone(&selector);
    let ab = try_merge(a, b, move |x, y| first(x, y));
    try_merge(ab, c, move |x, y| selector(x, y))
}

/// Pair elements positionally; stops at the shorter input.
pub fn zip<A, B, R, F>(a: RStream<A>, b: RStream<B>, zipper: F) -> RStream<R>
where
    A: Send + 'static,
    B: Send + 'static,
    R: Send + 'static,
    F: Fn(A, B) -> R + Send + Sync + 'static,
{
    try_zip(a, b, move |x, y| Ok::<_, Infallible>(zipper(x, y)))
}

pub fn try_zip<A, B, R, F, E>(a: RStream<A>, b: RStream<B>, zipper: F) -> RStream<R>
where
    A: Send + 'static,
    B: Send + 'static,
    R: Send + 'static,
    F: Fn(A, B) -> Result<R, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    let zipper = Arc::new(move |x: A, y: B| zipper(x, y).map_err(StreamError::callback));
    let mut inputs = Inputs::new();
    let a = inputs.absorb(a);
    let b = inputs.absorb(b);
    inputs.build(Box::new(ZipCursor::new(a, b, zipper)))
}

/// Pair elements positionally until both inputs are exhausted, substituting
/// `pad_a` or `pad_b` for the side that ran out.
pub fn zip_padded<A, B, R, F>(
    a: RStream<A>,
    b: RStream<B>,
    pad_a: A,
    pad_b: B,
    zipper: F,
) -> RStream<R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(A, B) -> R + Send + Sync + 'static,
{
    try_zip_padded(a, b, pad_a, pad_b, move |x, y| Ok::<_, Infallible>(zipper(x, y)))
}

pub fn try_zip_padded<A, B, R, F, E>(
    a: RStream<A>,
    b: RStream<B>,
    pad_a: A,
    pad_b: B,
    zipper: F,
) -> RStream<R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(A, B) -> Result<R, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    let zipper = Arc::new(move |x: A, y: B| zipper(x, y).map_err(StreamError::callback));
    let mut inputs = Inputs::new();
    let a = inputs.absorb(a);
    let b = inputs.absorb(b);
    inputs.build(Box::new(ZipPaddedCursor::new(a, b, pad_a, pad_b, zipper)))
}

pub fn zip3<A, B, C, R, F>(a: RStream<A>, b: RStream<B>, c: RStream<C>, zipper: F) -> RStream<R>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    R: Send + 'static,
    F: Fn(A, B, C) -> R + Send + Sync + 'static,
{
    try_zip3(a, b, c, move |x, y, z| Ok::<_, Infallible>(zipper(x, y, z)))
}

pub fn try_zip3<A, B, C, R, F, E>(
    a: RStream<A>,
    b: RStream<B>,
    c: RStream<C>,
    zipper: F,
) -> RStream<R>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    R: Send + 'static,
    F: Fn(A, B, C) -> Result<R, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    let zipper = Arc::new(move |x: A, y: B, z: C| zipper(x, y, z).map_err(StreamError::callback));
    let mut inputs = Inputs::new();
    let a = inputs.absorb(a);
    let b = inputs.absorb(b);
    let c = inputs.absorb(c);
    inputs.build(Box::new(Zip3Cursor::new(a, b, c, zipper)))
}

/// Three-way padded zip; output length is that of the longest input.
pub fn zip3_padded<A, B, C, R, F>(
    a: RStream<A>,
    b: RStream<B>,
    c: RStream<C>,
    pads: (A, B, C),
    zipper: F,
) -> RStream<R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(A, B, C) -> R + Send + Sync + 'static,
{
    try_zip3_padded(a, b, c, pads, move |x, y, z| Ok::<_, Infallible>(zipper(x, y, z)))
}

pub fn try_zip3_padded<A, B, C, R, F, E>(
    a: RStream<A>,
    b: RStream<B>,
    c: RStream<C>,
    pads: (A, B, C),
    zipper: F,
) -> RStream<R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(A, B, C) -> Result<R, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    let zipper = Arc::new(move |x: A, y: B, z: C| zipper(x, y, z).map_err(StreamError::callback));
    let mut inputs = Inputs::new();
    let a = inputs.absorb(a);
    let b = inputs.absorb(b);
    let c = inputs.absorb(c);
    inputs.build(Box::new(Zip3PaddedCursor::new(a, b, c, pads, zipper)))
}
