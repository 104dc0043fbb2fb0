use rstream::{ExecutionConfig, RStream, StreamError};
use std::collections::{HashMap, HashSet};

#[test]
fn test_of_and_to_vec() {
    let result = RStream::of(vec![1, 2, 3]).to_vec().unwrap();
    assert_eq!(result, vec![1, 2, 3]);
}

#[test]
fn test_empty_stream() {
    assert_eq!(RStream::<i32>::empty().to_vec().unwrap(), Vec::<i32>::new());
    assert_eq!(RStream::<i32>::empty().count().unwrap(), 0);
    assert_eq!(RStream::<i32>::empty().first().unwrap(), None);
}

#[test]
fn test_from_iter_is_lazy() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = pulled.clone();
    let stream = RStream::from_iter((0..10).inspect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
    .map(|x| x * 2);
    assert_eq!(pulled.load(Ordering::SeqCst), 0, "nothing pulled before a terminal op");

    let result = stream.limit(3).to_vec().unwrap();
    assert_eq!(result, vec![0, 2, 4]);
    assert!(pulled.load(Ordering::SeqCst) <= 4);
}

#[test]
fn test_collect_into_stream() {
    let stream: RStream<i32> = (1..=3).collect();
    assert_eq!(stream.to_vec().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_generated_sources() {
    assert_eq!(RStream::range(0, 5).to_vec().unwrap(), vec![0, 1, 2, 3, 4]);
    assert!(RStream::range(0, 5).is_sorted());
    assert_eq!(RStream::range(5, 5).count().unwrap(), 0);
    assert_eq!(RStream::repeat("a", 3).to_vec().unwrap(), vec!["a", "a", "a"]);

    let powers = RStream::iterate(1, |x| *x < 100, |x| x * 2).to_vec().unwrap();
    assert_eq!(powers, vec![1, 2, 4, 8, 16, 32, 64]);
}

#[test]
fn test_range_wider_than_element_type() {
    assert_eq!(RStream::range(i32::MIN, i32::MAX).limit(3).count().unwrap(), 3);
    assert_eq!(RStream::range(i32::MIN, i32::MAX).count().unwrap(), u32::MAX as u64);
    assert_eq!(
        RStream::range(i8::MIN, i8::MAX).skip(250).to_vec().unwrap(),
        vec![122, 123, 124, 125, 126]
    );

    let total = RStream::range(i64::MIN, i64::MIN + 1000)
        .parallel_with(ExecutionConfig::new().max_threads(4))
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(total, 1000);
}

#[test]
fn test_filter_map_flat_map() {
    let result = RStream::of(1..=6)
        .filter(|x| x % 2 == 0)
        .map(|x| x * 10)
        .to_vec()
        .unwrap();
    assert_eq!(result, vec![20, 40, 60]);

    let flattened = RStream::of(vec![1, 2])
        .flat_map(|x| RStream::of(vec![x, x * 10]))
        .to_vec()
        .unwrap();
    assert_eq!(flattened, vec![1, 10, 2, 20]);

    let words = RStream::of(vec!["a b", "c"])
        .flat_map_iter(|line: &str| line.split(' ').map(str::to_string).collect::<Vec<_>>())
        .to_vec()
        .unwrap();
    assert_eq!(words, vec!["a", "b", "c"]);
}

#[test]
fn test_distinct_keeps_first_occurrence() {
    let result = RStream::of(vec![5, 3, 3, 1, 4]).distinct().to_vec().unwrap();
    assert_eq!(result, vec![5, 3, 1, 4]);

    let by_len = RStream::of(vec!["aa", "b", "cc", "d", "eee"])
        .distinct_by(|s| s.len())
        .to_vec()
        .unwrap();
    assert_eq!(by_len, vec!["aa", "b", "eee"]);
}

#[test]
fn test_sorted_and_sortedness_flag() {
    let stream = RStream::of(vec![3, 1, 2]).sorted();
    assert!(stream.is_sorted());
    assert_eq!(stream.to_vec().unwrap(), vec![1, 2, 3]);

    let by_len = RStream::of(vec!["ccc", "a", "bb"])
        .sorted_by_key(|s| s.len())
        .to_vec()
        .unwrap();
    assert_eq!(by_len, vec!["a", "bb", "ccc"]);

    let desc = RStream::of(vec![1, 3, 2]).reverse_sorted();
    assert!(!desc.is_sorted());
    assert_eq!(desc.to_vec().unwrap(), vec![3, 2, 1]);

    // Operators that may reorder clear the flag.
    assert!(!RStream::range(0, 3).map(|x| x + 1).is_sorted());
    assert!(RStream::range(0, 10).filter(|x| x % 2 == 0).limit(2).is_sorted());
}

#[test]
fn test_reversal_flips_known_order() {
    let descending = RStream::of(vec![2, 3, 1]).sorted().reversed();
    assert!(descending.is_reverse_sorted());
    assert!(!descending.is_sorted());
    assert_eq!(descending.to_vec().unwrap(), vec![3, 2, 1]);

    let ascending = RStream::range(0, 4).reversed().reversed();
    assert!(ascending.is_sorted());
    assert_eq!(ascending.to_vec().unwrap(), vec![0, 1, 2, 3]);

    assert!(RStream::of(vec![1, 3, 2]).reverse_sorted().is_reverse_sorted());
    assert!(!RStream::of(vec![1, 3, 2]).reversed().is_reverse_sorted());
    assert!(RStream::range(0, 4).reversed().limit(2).is_reverse_sorted());
    assert!(!RStream::range(0, 4).reversed().map(|x| x * 2).is_reverse_sorted());
}

#[test]
fn test_min_max_of_reverse_sorted_stream() {
    assert_eq!(RStream::of(vec![4, 9, 1, 7]).reverse_sorted().min().unwrap(), Some(1));
    assert_eq!(RStream::of(vec![4, 9, 1, 7]).reverse_sorted().max().unwrap(), Some(9));
    assert_eq!(RStream::range(0, 10).reversed().min().unwrap(), Some(0));
    assert_eq!(RStream::range(0, 10).reversed().max().unwrap(), Some(9));
    assert_eq!(RStream::<i32>::empty().reverse_sorted().max().unwrap(), None);
}

#[test]
fn test_reversed() {
    assert_eq!(RStream::<i32>::empty().reversed().to_vec().unwrap(), Vec::<i32>::new());
    assert_eq!(RStream::of(vec![7]).reversed().to_vec().unwrap(), vec![7]);
    assert_eq!(
        RStream::of(vec![3, 1, 2]).reversed().to_vec().unwrap(),
        vec![2, 1, 3]
    );
    assert_eq!(
        RStream::of(vec![3, 1, 2]).reversed().reversed().to_vec().unwrap(),
        vec![3, 1, 2]
    );
    assert_eq!(RStream::range(0, 5).reversed().skip(1).to_vec().unwrap(), vec![3, 2, 1, 0]);
}

#[test]
fn test_limit_skip_step() {
    let materialized = RStream::of(1..=10).skip(2).limit(3).to_vec().unwrap();
    assert_eq!(materialized, vec![3, 4, 5]);

    let generated = RStream::from_iter(1..=10).skip(2).limit(3).to_vec().unwrap();
    assert_eq!(generated, vec![3, 4, 5]);

    assert_eq!(RStream::of(vec![1, 2]).skip(5).to_vec().unwrap(), Vec::<i32>::new());
    assert_eq!(RStream::of(vec![1, 2]).limit(0).count().unwrap(), 0);

    let stepped = RStream::range(0, 10).step(3).unwrap().to_vec().unwrap();
    assert_eq!(stepped, vec![0, 3, 6, 9]);
}

#[test]
fn test_take_while_drop_while() {
    let taken = RStream::of(vec![1, 2, 3, 1]).take_while(|x| *x < 3).to_vec().unwrap();
    assert_eq!(taken, vec![1, 2]);

    let dropped = RStream::of(vec![1, 2, 3, 1]).drop_while(|x| *x < 3).to_vec().unwrap();
    assert_eq!(dropped, vec![3, 1]);

    let all_dropped = RStream::of(vec![1, 2]).drop_while(|_| true).to_vec().unwrap();
    assert!(all_dropped.is_empty());
}

#[test]
fn test_scan() {
    let running = RStream::of(vec![1, 2, 3, 4]).scan(|acc, x| acc + x).to_vec().unwrap();
    assert_eq!(running, vec![1, 3, 6, 10]);

    let seeded = RStream::of(vec![1, 2])
        .scan_with_seed(String::from(">"), |acc, x| format!("{}{}", acc, x))
        .to_vec()
        .unwrap();
    assert_eq!(seeded, vec![">", ">1", ">12"]);

    assert!(RStream::<i32>::empty().scan(|a, b| a + b).to_vec().unwrap().is_empty());
}

#[test]
fn test_collapse() {
    let collapsed = RStream::of(vec![1, 1, 2, 2, 2, 3])
        .collapse(|a, b| a == b, |a, b| a + b)
        .to_vec()
        .unwrap();
    assert_eq!(collapsed, vec![2, 6, 3]);

    let single = RStream::of(vec![7]).collapse(|a, b| a == b, |a, b| a + b).to_vec().unwrap();
    assert_eq!(single, vec![7]);

    let empty = RStream::<i32>::empty().collapse(|a, b| a == b, |a, b| a + b).to_vec().unwrap();
    assert!(empty.is_empty());

    // Mergeability compares neighbours, not the running fold.
    let ascending_runs = RStream::of(vec![1, 2, 3, 1, 2])
        .collapse(|prev, next| next > prev, |a, b| a + b)
        .to_vec()
        .unwrap();
    assert_eq!(ascending_runs, vec![6, 3]);
}

#[test]
fn test_multiset_operators() {
    let intersection = RStream::of(vec![1, 2, 2, 3]).intersection(vec![2, 2, 2, 4]).to_vec().unwrap();
    assert_eq!(intersection, vec![2, 2]);

    let difference = RStream::of(vec![1, 2, 2, 3]).difference(vec![2]).to_vec().unwrap();
    assert_eq!(difference, vec![1, 2, 3]);

    let symmetric = RStream::of(vec![1, 2, 2, 3])
        .symmetric_difference(vec![2, 4])
        .to_vec()
        .unwrap();
    assert_eq!(symmetric, vec![1, 2, 3, 4]);
}

#[test]
fn test_reductions() {
    assert_eq!(RStream::of(1..=4).reduce(|a, b| a * b).unwrap(), Some(24));
    assert_eq!(RStream::<i32>::empty().reduce(|a, b| a + b).unwrap(), None);
    assert_eq!(
        RStream::of(vec!["a", "b"]).fold(String::new(), |acc, s| acc + s, |a, b| a + &b).unwrap(),
        "ab"
    );
    assert_eq!(RStream::of(1..=100).sum().unwrap(), 5050);
    assert_eq!(RStream::of(vec![1.5_f64, 2.5]).sum().unwrap(), 4.0);
    assert_eq!(RStream::of(vec![1, 2, 3, 4]).average().unwrap(), Some(2.5));
    assert_eq!(RStream::<i32>::empty().average().unwrap(), None);
}

#[test]
fn test_extremes() {
    assert_eq!(RStream::of(vec![3, 9, 1]).min().unwrap(), Some(1));
    assert_eq!(RStream::of(vec![3, 9, 1]).max().unwrap(), Some(9));
    assert_eq!(RStream::range(4, 9).min().unwrap(), Some(4));
    assert_eq!(RStream::range(4, 9).max().unwrap(), Some(8));

    let longest = RStream::of(vec!["bb", "a", "cc"])
        .max_by(|a, b| a.len().cmp(&b.len()))
        .unwrap();
    assert_eq!(longest, Some("cc"));
    let shortest = RStream::of(vec!["bb", "a", "c"])
        .min_by(|a, b| a.len().cmp(&b.len()))
        .unwrap();
    assert_eq!(shortest, Some("a"));
}

#[test]
fn test_searching() {
    assert_eq!(RStream::of(vec![4, 5, 6]).first().unwrap(), Some(4));
    assert_eq!(RStream::of(vec![4, 5, 6]).last().unwrap(), Some(6));
    assert_eq!(RStream::of(1..=10).find_first(|x| x % 4 == 0).unwrap(), Some(4));
    assert_eq!(RStream::of(1..=10).find_last(|x| x % 4 == 0).unwrap(), Some(8));
    assert_eq!(RStream::of(1..=10).find_any(|x| *x > 20).unwrap(), None);

    assert!(RStream::of(vec![1, 2, 3]).any_match(|x| *x == 2).unwrap());
    assert!(RStream::of(vec![1, 2, 3]).all_match(|x| *x > 0).unwrap());
    assert!(RStream::of(vec![1, 2, 3]).none_match(|x| *x > 3).unwrap());
    assert!(RStream::<i32>::empty().all_match(|_| false).unwrap());
    assert!(!RStream::<i32>::empty().any_match(|_| true).unwrap());
}

#[test]
fn test_collections() {
    let set = RStream::of(vec![1, 2, 2, 3]).to_set().unwrap();
    assert_eq!(set, HashSet::from([1, 2, 3]));

    let map = RStream::of(vec!["apple", "avocado", "banana"])
        .to_map(|s| s.chars().next().unwrap_or(' '), |s| s.len(), |a, b| a + b)
        .unwrap();
    assert_eq!(map, HashMap::from([('a', 12), ('b', 6)]));

    let groups = RStream::of(1..=6).group_by(|x| x % 3).unwrap();
    assert_eq!(groups[&0], vec![3, 6]);
    assert_eq!(groups[&1], vec![1, 4]);
    assert_eq!(groups[&2], vec![2, 5]);

    let joined = RStream::of(vec!["x", "y"])
        .collect(String::new, |acc, s| acc.push_str(s), |acc, other| acc.push_str(&other))
        .unwrap();
    assert_eq!(joined, "xy");
}

#[test]
fn test_head_and_tail() {
    let (head, tail) = RStream::of(vec![1, 2, 3]).head_and_tail().unwrap().unwrap();
    assert_eq!(head, 1);
    assert_eq!(tail.to_vec().unwrap(), vec![2, 3]);

    assert!(RStream::<i32>::empty().head_and_tail().unwrap().is_none());
}

#[test]
fn test_peek_sees_every_element() {
    use std::sync::{Arc, Mutex};

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let total = RStream::of(vec![1, 2, 3])
        .peek(move |x| sink.lock().unwrap().push(*x))
        .map(|x| x * 2)
        .sum()
        .unwrap();
    assert_eq!(total, 12);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_invalid_arguments() {
    assert!(matches!(
        RStream::of(vec![1]).step(0),
        Err(StreamError::InvalidArgument(_))
    ));
    assert!(matches!(
        RStream::of(vec![1]).chunks(0),
        Err(StreamError::InvalidArgument(_))
    ));
    assert!(matches!(
        RStream::of(vec![1]).sliding(0, 1),
        Err(StreamError::InvalidArgument(_))
    ));
    assert!(matches!(
        RStream::of(vec![1]).sliding(2, 0),
        Err(StreamError::InvalidArgument(_))
    ));
}
