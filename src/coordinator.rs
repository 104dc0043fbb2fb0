//! Parallel aggregation protocol.
//!
//! A parallel terminal operation is a *local* reduction, run once per
//! partition, plus a combine step applied by the caller to the partial
//! results. [`execute`] handles everything in between:
//!
//! 1. degrade to a single sequential pass when fewer than two workers would
//!    be useful;
//! 2. partition the cursor per the active [`Splitor`];
//! 3. submit one task per partition and block until every task finished;
//! 4. report the first recorded failure, or return the partials in
//!    partition order.
//!
//! Workers poll a shared [`Partition::should_stop`] flag, set by the first
//! failure or by a short-circuiting operation. Running work is never
//! preempted.
//!
//! Barrier stages such as sorting do not capture a context when they are
//! added. They read the context of the terminal operation currently driving
//! the pipeline on this thread, see [`driving`].
//!
//! An operation started from inside a worker (a barrier stage materializing
//! under a shared cursor, or user code running a nested parallel stream)
//! runs on that worker's thread instead of waiting for pool slots its own
//! siblings occupy.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

use futures::channel::oneshot;
use futures::future::join_all;

use crate::error::{StreamError, StreamResult};
use crate::stream::core::{Cursor, VecCursor};
use crate::stream::ordering::Comparator;
use crate::stream::parallel::SharedCursor;
use crate::stream_configuration::Splitor;
use crate::worker_pool::{ExecutionContext, Task};

/// Buffers shorter than this are sorted on the calling thread.
const PARALLEL_SORT_THRESHOLD: usize = 1 << 13;

thread_local! {
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
    static DRIVING: RefCell<Option<ExecutionContext>> = const { RefCell::new(None) };
}

/// Marks the current thread as running a partition until dropped.
struct WorkerScope {
    previous: bool,
}

impl WorkerScope {
    fn enter() -> Self {
        Self {
            previous: ON_WORKER.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for WorkerScope {
    fn drop(&mut self) {
        let previous = self.previous;
        ON_WORKER.with(|flag| flag.set(previous));
    }
}

fn on_worker() -> bool {
    ON_WORKER.with(Cell::get)
}

/// Installs the driving context for this thread until dropped.
struct DrivingScope {
    previous: Option<ExecutionContext>,
}

impl DrivingScope {
    fn enter(context: Option<&ExecutionContext>) -> Self {
        Self {
            previous: DRIVING.with(|slot| slot.replace(context.cloned())),
        }
    }
}

impl Drop for DrivingScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        DRIVING.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Run `f` with `context` as the driving context of this thread. Nested
/// calls restore the outer context when they return.
pub(crate) fn driving<R>(context: Option<&ExecutionContext>, f: impl FnOnce() -> R) -> R {
    let _scope = DrivingScope::enter(context);
    f()
}

/// The context of the terminal operation driving this thread, if any.
/// Worker threads have none, so barriers they pull run sequentially.
pub(crate) fn driving_context() -> Option<ExecutionContext> {
    DRIVING.with(|slot| slot.borrow().clone())
}

// ================================
// Stop signal
// ================================

/// First-error slot plus the cooperative stop flag shared by all workers of
/// one operation.
#[derive(Default)]
struct StopSignal {
    error: OnceLock<StreamError>,
    stopped: AtomicBool,
}

impl StopSignal {
    /// First writer wins; later failures are dropped.
    fn record(&self, error: StreamError) {
        if self.error.set(error).is_err() {
            log::debug!("discarding failure reported after the first");
        }
        self.stop();
    }

    fn stop(&self) {
        self.stopped.store(true, AtomicOrdering::Release);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(AtomicOrdering::Acquire)
    }
}

/// What a local reduction knows about where it runs.
pub(crate) struct Partition {
    index: usize,
    signal: Option<Arc<StopSignal>>,
}

impl Partition {
    fn sequential() -> Self {
        Self {
            index: 0,
            signal: None,
        }
    }

    /// Position of this partition; partitions concatenate in index order.
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// True once another worker failed or short-circuited the operation.
    pub(crate) fn should_stop(&self) -> bool {
        self.signal.as_ref().is_some_and(|s| s.is_stopped())
    }

    /// Ask every other worker to stop pulling, e.g. once `any_match` found
    /// its element.
    pub(crate) fn stop_all(&self) {
        if let Some(signal) = &self.signal {
            signal.stop();
        }
    }
}

// ================================
// Dispatch
// ================================

/// Whether an operation's result depends on encounter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Encounter {
    /// Partials are combined in partition order; under the contiguous
    /// splitor a source that cannot be sliced by index runs sequentially.
    Preserved,
    Ignored,
}

/// Run `local` over `cursor`, sequentially or across the context's pool.
///
/// Returns the non-empty partials in partition order. Under
/// [`Splitor::SharedCursor`] the assignment of elements to partitions is
/// nondeterministic, so only order-insensitive combinations are meaningful.
pub(crate) fn execute<T, R, L>(
    context: Option<&ExecutionContext>,
    mut cursor: Box<dyn Cursor<T>>,
    encounter: Encounter,
    local: L,
) -> StreamResult<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    L: Fn(&mut dyn Cursor<T>, &Partition) -> StreamResult<Option<R>> + Send + Sync + 'static,
{
    let Some(context) = context.filter(|_| !on_worker()) else {
        return Ok(local(&mut *cursor, &Partition::sequential())?.into_iter().collect());
    };

    let config = context.config();
    let workers = match cursor.exact_len() {
        Some(len) => len.min(config.max_threads as u64) as usize,
        None => config.max_threads,
    };
    if workers <= 1 {
        log::debug!(
            "running on the calling thread (max_threads={}, known length={:?})",
            config.max_threads,
            cursor.exact_len()
        );
        return Ok(local(&mut *cursor, &Partition::sequential())?.into_iter().collect());
    }
    if encounter == Encounter::Preserved
        && config.splitor == Splitor::Contiguous
        && !cursor.splits_contiguously()
    {
        log::debug!("source cannot be sliced by index; running order-sensitive operation sequentially");
        return Ok(local(&mut *cursor, &Partition::sequential())?.into_iter().collect());
    }

    let parts = partition(cursor, workers, config.splitor)?;
    log::debug!(
        "dispatching {} partitions with {:?} splitor",
        parts.len(),
        config.splitor
    );

    let signal = Arc::new(StopSignal::default());
    let local = Arc::new(local);
    let mut pending = Vec::with_capacity(parts.len());

    for (index, mut part) in parts.into_iter().enumerate() {
        let (tx, rx) = oneshot::channel::<Option<R>>();
        let worker_signal = Arc::clone(&signal);
        let local = Arc::clone(&local);

        let task: Task = Box::new(move || {
            let _scope = WorkerScope::enter();
            let partition = Partition {
                index,
                signal: Some(Arc::clone(&worker_signal)),
            };
            let partial = if partition.should_stop() {
                None
            } else {
                match catch_unwind(AssertUnwindSafe(|| local(&mut *part, &partition))) {
                    Ok(Ok(partial)) => partial,
                    Ok(Err(e)) => {
                        worker_signal.record(e);
                        None
                    }
                    Err(payload) => {
                        worker_signal.record(StreamError::from_panic(payload));
                        None
                    }
                }
            };
            let _ = tx.send(partial);
        });

        match context.executor().submit(task) {
            Ok(handle) => pending.push((handle, rx)),
            Err(e) => {
                // Tasks already submitted still have to be joined.
                signal.record(e);
                break;
            }
        }
    }

    let joined = futures::executor::block_on(join_all(pending.into_iter().map(
        |(handle, rx)| async move {
            handle.await?;
            rx.await
                .map_err(|_| StreamError::Executor("worker dropped its result".to_string()))
        },
    )));

    if let Some(error) = signal.error.get() {
        return Err(error.clone());
    }

    let mut partials = Vec::new();
    for outcome in joined {
        if let Some(partial) = outcome? {
            partials.push(partial);
        }
    }
    Ok(partials)
}

fn partition<T: Send + 'static>(
    mut cursor: Box<dyn Cursor<T>>,
    workers: usize,
    splitor: Splitor,
) -> StreamResult<Vec<Box<dyn Cursor<T>>>> {
    if let Some(parts) = cursor.try_split(workers, splitor)? {
        return Ok(parts);
    }
    if splitor == Splitor::Contiguous {
        log::debug!("source has no contiguous buffer; sharing one cursor between workers");
    }
    Ok(SharedCursor::fan_out(cursor, workers))
}

// ================================
// Materialization helpers
// ================================

/// Drain `cursor` into a buffer, in parallel when a context is given.
pub(crate) fn collect_vec<T: Send + 'static>(
    context: Option<&ExecutionContext>,
    cursor: Box<dyn Cursor<T>>,
    encounter: Encounter,
) -> StreamResult<Vec<T>> {
    let runs = execute(context, cursor, encounter, |part, _| part.drain_to_vec().map(Some))?;
    Ok(concat_runs(runs))
}

pub(crate) fn concat_runs<T>(runs: Vec<Vec<T>>) -> Vec<T> {
    let mut runs = runs.into_iter();
    let mut out = runs.next().unwrap_or_default();
    for run in runs {
        out.extend(run);
    }
    out
}

/// Sort `items` with `compare`. Large buffers on a parallel context are
/// split into contiguous runs, sorted on the workers and merged here.
pub(crate) fn sort_vec<T: Send + 'static>(
    context: Option<&ExecutionContext>,
    mut items: Vec<T>,
    compare: Comparator<T>,
) -> StreamResult<Vec<T>> {
    let parallel = context.filter(|c| c.config().max_threads > 1 && !on_worker());
    let Some(context) = parallel.filter(|_| items.len() >= PARALLEL_SORT_THRESHOLD) else {
        items.sort_by(|a, b| compare(a, b));
        return Ok(items);
    };

    let contiguous = context.reconfigured(context.config().clone().splitor(Splitor::Contiguous));
    let run_compare = Arc::clone(&compare);
    let runs = execute(
        Some(&contiguous),
        Box::new(VecCursor::new(items)),
        Encounter::Ignored,
        move |part, _| {
            let mut run = part.drain_to_vec()?;
            run.sort_by(|a, b| run_compare(a, b));
            Ok(Some(run))
        },
    )?;
    Ok(merge_runs(runs, &compare))
}

/// Pairwise merge of sorted runs until one remains. Stable: on ties the
/// element from the earlier run goes first.
fn merge_runs<T>(mut runs: Vec<Vec<T>>, compare: &Comparator<T>) -> Vec<T> {
    while runs.len() > 1 {
        let mut merged = Vec::with_capacity(runs.len().div_ceil(2));
        let mut iter = runs.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => merged.push(merge_two(left, right, compare)),
                None => merged.push(left),
            }
        }
        runs = merged;
    }
    runs.pop().unwrap_or_default()
}

fn merge_two<T>(left: Vec<T>, right: Vec<T>, compare: &Comparator<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(l, r) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return out,
        };
        let next = if take_left { left.next() } else { right.next() };
        out.extend(next);
    }
}
