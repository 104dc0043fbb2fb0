use rstream::{ExecutionConfig, RStream};

fn drain_windows<T: Send + 'static>(stream: RStream<RStream<T>>) -> Vec<Vec<T>> {
    stream
        .to_vec()
        .unwrap()
        .into_iter()
        .map(|window| window.to_vec().unwrap())
        .collect()
}

#[test]
fn test_chunks() {
    let chunks = drain_windows(RStream::of(1..=5).chunks(2).unwrap());
    assert_eq!(chunks, vec![vec![1, 2], vec![3, 4], vec![5]]);

    let empty = drain_windows(RStream::<i32>::empty().chunks(3).unwrap());
    assert!(empty.is_empty());
}

#[test]
fn test_split_on_groups_by_predicate_answer() {
    let groups = drain_windows(RStream::of(vec![2, 4, 1, 3, 6]).split_on(|x| x % 2 == 0));
    assert_eq!(groups, vec![vec![2, 4], vec![1, 3], vec![6]]);
}

#[test]
fn test_sliding_overlapping() {
    let windows = drain_windows(RStream::of(1..=6).sliding(3, 2).unwrap());
    assert_eq!(windows, vec![vec![1, 2, 3], vec![3, 4, 5], vec![5, 6]]);
}

#[test]
fn test_sliding_with_gaps() {
    let windows = drain_windows(RStream::of(1..=7).sliding(2, 3).unwrap());
    assert_eq!(windows, vec![vec![1, 2], vec![4, 5], vec![7]]);
}

#[test]
fn test_sliding_shorter_than_window() {
    let windows = drain_windows(RStream::of(vec![1, 2]).sliding(5, 1).unwrap());
    assert_eq!(windows, vec![vec![1, 2]]);
}

#[test]
fn test_split_at() {
    let letters = || RStream::of(vec!["a", "b", "c", "d"]);

    let parts = drain_windows(letters().split_at(2));
    assert_eq!(parts, vec![vec!["a", "b"], vec!["c", "d"]]);

    let parts = drain_windows(letters().split_at(0));
    assert_eq!(parts, vec![vec![], vec!["a", "b", "c", "d"]]);

    let parts = drain_windows(letters().split_at(10));
    assert_eq!(parts, vec![vec!["a", "b", "c", "d"], vec![]]);
}

#[test]
fn test_split_by() {
    let parts = drain_windows(RStream::of(vec![1, 2, 3, 1]).split_by(|x| *x < 3));
    assert_eq!(parts, vec![vec![1, 2], vec![3, 1]]);

    let parts = drain_windows(RStream::of(vec![5, 1]).split_by(|x| *x < 3));
    assert_eq!(parts, vec![vec![], vec![5, 1]]);
}

#[test]
fn test_windows_inherit_sortedness_and_context() {
    let windows = RStream::range(0, 6)
        .parallel_with(ExecutionConfig::new().max_threads(2))
        .unwrap()
        .split_at(3)
        .sequential()
        .to_vec()
        .unwrap();
    assert_eq!(windows.len(), 2);
    for window in &windows {
        assert!(window.is_sorted());
        assert!(window.is_parallel());
    }
    let sums: Vec<i32> = windows.into_iter().map(|w| w.sum().unwrap()).collect();
    assert_eq!(sums, vec![3, 12]);
}

#[test]
fn test_window_operators_compose() {
    let maxima = RStream::of(vec![3, 1, 4, 1, 5, 9, 2, 6])
        .chunks(3)
        .unwrap()
        .map(|chunk| chunk.max().unwrap().unwrap_or_default())
        .to_vec()
        .unwrap();
    assert_eq!(maxima, vec![4, 9, 6]);
}
