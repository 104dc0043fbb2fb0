//! Terminal operations.
//!
//! Each operation is written once as a local reduction over a cursor plus a
//! combine step; the coordinator decides whether the local reduction runs
//! once on the calling thread or once per partition on the worker pool.
//! The stream's close handlers run after the result is computed.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::coordinator::{self, Encounter, Partition};
use crate::error::{BoxError, StreamError, StreamResult};
use crate::numeric::Numeric;
use crate::resource_chain::ResourceChain;
use crate::rstream::{Parts, RStream};
use crate::source::Source;
use crate::stream::core::Cursor;
use crate::worker_pool::ExecutionContext;

/// Pull elements until the cursor is exhausted, `visit` returns `false`, or
/// another worker asked everyone to stop.
fn drive<T, F>(part: &mut dyn Cursor<T>, partition: &Partition, mut visit: F) -> StreamResult<()>
where
    F: FnMut(T) -> StreamResult<bool>,
{
    while !partition.should_stop() {
        match part.next()? {
            Some(item) => {
                if !visit(item)? {
                    break;
                }
            }
            None => break,
        }
    }
    Ok(())
}

/// Close `resources` after an operation. The operation's own failure wins
/// over a close failure.
fn finish<R>(resources: ResourceChain, result: StreamResult<R>) -> StreamResult<R> {
    let closed = resources.close();
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close)) => {
            log::warn!("close handlers failed after an aborted operation: {}", close);
            Err(e)
        }
    }
}

fn insert_merged<K: Hash + Eq, V>(
    map: &mut HashMap<K, V>,
    key: K,
    value: V,
    merge: &dyn Fn(V, V) -> V,
) {
    let merged = match map.remove(&key) {
        Some(existing) => merge(existing, value),
        None => value,
    };
    map.insert(key, merged);
}

fn combine_in_order<R, F>(partials: Vec<R>, mut combine: F) -> StreamResult<Option<R>>
where
    F: FnMut(R, R) -> StreamResult<R>,
{
    let mut partials = partials.into_iter();
    let Some(mut acc) = partials.next() else {
        return Ok(None);
    };
    for partial in partials {
        acc = combine(acc, partial)?;
    }
    Ok(Some(acc))
}

impl<T: Send + 'static> RStream<T> {
    fn terminal<R, F>(self, op: F) -> StreamResult<R>
    where
        F: FnOnce(Source<T>, Option<&ExecutionContext>) -> StreamResult<R>,
    {
        let Parts {
            source,
            context,
            resources,
            ..
        } = self.into_parts();
        let result = coordinator::driving(context.as_ref(), || op(source, context.as_ref()));
        finish(resources, result)
    }

    /// Release this stream's resources without consuming its elements.
    pub fn close(self) -> StreamResult<()> {
        self.into_parts().resources.close()
    }

    // ================================
    // Side effects
    // ================================

    /// Run `action` on every element. In parallel mode elements are visited
    /// on worker threads in no particular order.
    pub fn for_each<F>(self, action: F) -> StreamResult<()>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.try_for_each(move |item| {
            action(item);
            Ok::<_, Infallible>(())
        })
    }

    pub fn try_for_each<F, E>(self, action: F) -> StreamResult<()>
    where
        F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.terminal(|source, context| {
            coordinator::execute(context, source.into_cursor(), Encounter::Ignored, move |part, p| {
                drive(part, p, |item| {
                    action(item).map_err(StreamError::callback)?;
                    Ok(true)
                })?;
                Ok(None::<()>)
            })?;
            Ok(())
        })
    }

    // ================================
    // Reductions
    // ================================

    /// Fold all elements with an associative `f`, seeded by the first one.
    /// Partial results are combined in partition order.
    pub fn reduce<F>(self, f: F) -> StreamResult<Option<T>>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        self.try_reduce(move |a, b| Ok::<_, Infallible>(f(a, b)))
    }

    pub fn try_reduce<F, E>(self, f: F) -> StreamResult<Option<T>>
    where
        F: Fn(T, T) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let f = Arc::new(move |a: T, b: T| f(a, b).map_err(StreamError::callback));
        self.terminal(|source, context| {
            let local_f = Arc::clone(&f);
            let partials = coordinator::execute(
                context,
                source.into_cursor(),
                Encounter::Preserved,
                move |part, p| {
                    let mut acc: Option<T> = None;
                    drive(part, p, |item| {
                        acc = Some(match acc.take() {
                            Some(prev) => local_f(prev, item)?,
                            None => item,
                        });
                        Ok(true)
                    })?;
                    Ok(acc)
                },
            )?;
            combine_in_order(partials, |a, b| f(a, b))
        })
    }

    /// Fold with an identity. Each partition starts from a clone of
    /// `identity`; `combine` merges the partition results in order.
    pub fn fold<R, A, C>(self, identity: R, accumulate: A, combine: C) -> StreamResult<R>
    where
        R: Clone + Send + Sync + 'static,
        A: Fn(R, T) -> R + Send + Sync + 'static,
        C: Fn(R, R) -> R + Send + Sync + 'static,
    {
        self.terminal(|source, context| {
            let seed = identity.clone();
            let partials = coordinator::execute(
                context,
                source.into_cursor(),
                Encounter::Preserved,
                move |part, p| {
                    let mut acc = Some(seed.clone());
                    drive(part, p, |item| {
                        acc = acc.take().map(|prev| accumulate(prev, item));
                        Ok(true)
                    })?;
                    Ok(acc)
                },
            )?;
            Ok(combine_in_order(partials, |a, b| Ok(combine(a, b)))?.unwrap_or(identity))
        })
    }

    /// Mutable reduction into containers made by `supplier`.
    pub fn collect<C, S, A, M>(self, supplier: S, accumulate: A, merge: M) -> StreamResult<C>
    where
        C: Send + 'static,
        S: Fn() -> C + Send + Sync + 'static,
        A: Fn(&mut C, T) + Send + Sync + 'static,
        M: Fn(&mut C, C) + Send + Sync + 'static,
    {
        let supplier = Arc::new(supplier);
        self.terminal(|source, context| {
            let local_supplier = Arc::clone(&supplier);
            let partials = coordinator::execute(
                context,
                source.into_cursor(),
                Encounter::Preserved,
                move |part, p| {
                    let mut container = local_supplier();
                    drive(part, p, |item| {
                        accumulate(&mut container, item);
                        Ok(true)
                    })?;
                    Ok(Some(container))
                },
            )?;
            let merged = combine_in_order(partials, |mut a, b| {
                merge(&mut a, b);
                Ok(a)
            })?;
            Ok(merged.unwrap_or_else(|| supplier()))
        })
    }

    // ================================
    // Collections
    // ================================

    /// All elements in encounter order. Under the shared-cursor splitor a
    /// parallel stream returns them in no particular order.
    pub fn to_vec(self) -> StreamResult<Vec<T>> {
        self.terminal(|source, context| match (source, context) {
            (source @ Source::Materialized { .. }, None) => source.into_vec(),
            (source, context) => {
                coordinator::collect_vec(context, source.into_cursor(), Encounter::Preserved)
            }
        })
    }

    pub fn to_set(self) -> StreamResult<HashSet<T>>
    where
        T: Hash + Eq,
    {
        self.collect(
            HashSet::new,
            |set, item| {
                set.insert(item);
            },
            |set, other| set.extend(other),
        )
    }

    /// Build a map, resolving duplicate keys with `merge(existing, new)`.
    pub fn to_map<K, V, KF, VF, MF>(self, key: KF, value: VF, merge: MF) -> StreamResult<HashMap<K, V>>
    where
        K: Hash + Eq + Send + 'static,
        V: Send + 'static,
        KF: Fn(&T) -> K + Send + Sync + 'static,
        VF: Fn(T) -> V + Send + Sync + 'static,
        MF: Fn(V, V) -> V + Send + Sync + 'static,
    {
        let merge = Arc::new(merge);
        let local_merge = Arc::clone(&merge);
        self.collect(
            HashMap::new,
            move |map, item| {
                let k = key(&item);
                insert_merged(map, k, value(item), &*local_merge);
            },
            move |map, other| {
                for (k, v) in other {
                    insert_merged(map, k, v, &*merge);
                }
            },
        )
    }

    /// Elements grouped by key; each group keeps encounter order.
    pub fn group_by<K, F>(self, key: F) -> StreamResult<HashMap<K, Vec<T>>>
    where
        K: Hash + Eq + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.collect(
            HashMap::new,
            move |groups: &mut HashMap<K, Vec<T>>, item| {
                groups.entry(key(&item)).or_default().push(item);
            },
            |groups, other| {
                for (k, items) in other {
                    groups.entry(k).or_default().extend(items);
                }
            },
        )
    }

    // ================================
    // Counting and searching
    // ================================

    pub fn count(self) -> StreamResult<u64> {
        self.terminal(|source, context| {
            if context.is_none() {
                if let Some(len) = source.exact_len() {
                    return Ok(len);
                }
            }
            let partials = coordinator::execute(
                context,
                source.into_cursor(),
                Encounter::Ignored,
                |part, _| part.remaining_count().map(Some),
            )?;
            Ok(partials.into_iter().sum())
        })
    }

    pub fn first(self) -> StreamResult<Option<T>> {
        self.find_first(|_| true)
    }

    pub fn last(self) -> StreamResult<Option<T>> {
        self.find_last(|_| true)
    }

    /// The first element matching `predicate` in encounter order. Under
    /// the shared-cursor splitor a parallel stream returns some matching
    /// element, not necessarily the first.
    pub fn find_first<P>(self, predicate: P) -> StreamResult<Option<T>>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.terminal(|source, context| {
            // Lowest partition that found a match so far.
            let best = Arc::new(AtomicUsize::new(usize::MAX));
            let partials = coordinator::execute(
                context,
                source.into_cursor(),
                Encounter::Preserved,
                move |part, p| {
                    let mut found = None;
                    while !p.should_stop() && best.load(AtomicOrdering::Acquire) > p.index() {
                        let Some(item) = part.next()? else { break };
                        if predicate(&item) {
                            best.fetch_min(p.index(), AtomicOrdering::AcqRel);
                            found = Some(item);
                            break;
                        }
                    }
                    Ok(found)
                },
            )?;
            Ok(partials.into_iter().next())
        })
    }

    /// The last element matching `predicate` in encounter order.
    pub fn find_last<P>(self, predicate: P) -> StreamResult<Option<T>>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.terminal(|source, context| {
            // One past the highest partition that found a match so far.
            let best = Arc::new(AtomicUsize::new(0));
            let partials = coordinator::execute(
                context,
                source.into_cursor(),
                Encounter::Preserved,
                move |part, p| {
                    let mut found = None;
                    drive(part, p, |item| {
                        if best.load(AtomicOrdering::Acquire) > p.index() + 1 {
                            return Ok(false);
                        }
                        if predicate(&item) {
                            best.fetch_max(p.index() + 1, AtomicOrdering::AcqRel);
                            found = Some(item);
                        }
                        Ok(true)
                    })?;
                    Ok(found)
                },
            )?;
            Ok(partials.into_iter().last())
        })
    }

    /// Any element matching `predicate`; parallel streams return whichever
    /// worker finds one first.
    pub fn find_any<P>(self, predicate: P) -> StreamResult<Option<T>>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.terminal(|source, context| {
            let partials = coordinator::execute(
                context,
                source.into_cursor(),
                Encounter::Ignored,
                move |part, p| {
                    let mut found = None;
                    drive(part, p, |item| {
                        if predicate(&item) {
                            p.stop_all();
                            found = Some(item);
                            return Ok(false);
                        }
                        Ok(true)
                    })?;
                    Ok(found)
                },
            )?;
            Ok(partials.into_iter().next())
        })
    }

    pub fn any_match<P>(self, predicate: P) -> StreamResult<bool>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.short_circuit(move |item| predicate(item), true)
    }

    pub fn all_match<P>(self, predicate: P) -> StreamResult<bool>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.short_circuit(move |item| !predicate(item), false)
    }

    pub fn none_match<P>(self, predicate: P) -> StreamResult<bool>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.short_circuit(move |item| predicate(item), false)
    }

    /// `on_hit` if any element satisfies `hit`, `!on_hit` otherwise. The
    /// first hit stops every worker.
    fn short_circuit<P>(self, hit: P, on_hit: bool) -> StreamResult<bool>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.terminal(|source, context| {
            let partials = coordinator::execute(
                context,
                source.into_cursor(),
                Encounter::Ignored,
                move |part, p| {
                    let mut matched = false;
                    drive(part, p, |item| {
                        matched = hit(&item);
                        if matched {
                            p.stop_all();
                        }
                        Ok(!matched)
                    })?;
                    Ok(matched.then_some(()))
                },
            )?;
            Ok(if partials.is_empty() { !on_hit } else { on_hit })
        })
    }

    // ================================
    // Extremes
    // ================================

    pub fn min_by<F>(self, compare: F) -> StreamResult<Option<T>>
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.reduce(move |a, b| if compare(&b, &a) == Ordering::Less { b } else { a })
    }

    pub fn max_by<F>(self, compare: F) -> StreamResult<Option<T>>
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.reduce(move |a, b| if compare(&b, &a) == Ordering::Less { a } else { b })
    }

    // ================================
    // Decomposition
    // ================================

    /// Split off the first element. The tail takes over this stream's
    /// context, sortedness and close handlers. Always sequential.
    pub fn head_and_tail(self) -> StreamResult<Option<(T, RStream<T>)>> {
        let Parts {
            source,
            sorted,
            context,
            resources,
        } = self.into_parts();
        let mut cursor = source.into_cursor();
        match coordinator::driving(context.as_ref(), || cursor.next()) {
            Ok(Some(head)) => {
                let tail = RStream::from_parts(Parts {
                    source: Source::Generated(cursor),
                    sorted,
                    context,
                    resources,
                });
                Ok(Some((head, tail)))
            }
            Ok(None) => finish(resources, Ok(None)),
            Err(e) => finish(resources, Err(e)),
        }
    }
}

impl<T: Ord + Send + 'static> RStream<T> {
    /// The smallest element. A stream known to be sorted either way answers
    /// from the matching end.
    pub fn min(self) -> StreamResult<Option<T>> {
        if self.is_sorted() {
            return self.first();
        }
        if self.is_reverse_sorted() {
            return self.last();
        }
        self.min_by(T::cmp)
    }

    /// The largest element; the last of several equal maxima, except on a
    /// reverse-sorted stream, which answers with its first element.
    pub fn max(self) -> StreamResult<Option<T>> {
        if self.is_sorted() {
            return self.last();
        }
        if self.is_reverse_sorted() {
            return self.first();
        }
        self.max_by(T::cmp)
    }
}

impl<T: Numeric> RStream<T> {
    pub fn sum(self) -> StreamResult<T> {
        self.fold(T::zero(), |acc, item| acc + item, |a, b| a + b)
    }

    /// Arithmetic mean as `f64`, or `None` for an empty stream.
    pub fn average(self) -> StreamResult<Option<f64>> {
        let (total, count) = self.fold(
            (0.0_f64, 0_u64),
            |(total, count), item| (total + item.to_f64().unwrap_or(f64::NAN), count + 1),
            |(ta, ca), (tb, cb)| (ta + tb, ca + cb),
        )?;
        Ok((count > 0).then(|| total / count as f64))
    }
}
