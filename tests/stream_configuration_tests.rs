use rstream::{ExecutionConfig, RStream, Splitor, StreamError};

#[test]
fn test_default_config() {
    let config = ExecutionConfig::default();
    assert_eq!(config.max_threads, num_cpus::get());
    assert_eq!(config.splitor, Splitor::Contiguous);
    assert!(config.validate().is_ok());
}

#[test]
fn test_builder_methods() {
    let config = ExecutionConfig::new().max_threads(6).splitor(Splitor::SharedCursor);
    assert_eq!(config.max_threads, 6);
    assert_eq!(config.splitor, Splitor::SharedCursor);
}

#[test]
fn test_zero_threads_is_invalid() {
    let err = ExecutionConfig::new().max_threads(0).validate().unwrap_err();
    assert!(matches!(err, StreamError::InvalidArgument(_)));
    assert!(err.to_string().contains("max_threads"));
}

#[test]
fn test_config_from_json() {
    let config: ExecutionConfig =
        serde_json::from_str(r#"{ "max_threads": 3, "splitor": "shared_cursor" }"#).unwrap();
    assert_eq!(config, ExecutionConfig::new().max_threads(3).splitor(Splitor::SharedCursor));

    let partial: ExecutionConfig = serde_json::from_str(r#"{ "max_threads": 2 }"#).unwrap();
    assert_eq!(partial.splitor, Splitor::Contiguous);

    let empty: ExecutionConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, ExecutionConfig::default());

    assert!(serde_json::from_str::<ExecutionConfig>(r#"{ "splitor": "round_robin" }"#).is_err());
}

#[test]
fn test_config_json_roundtrip_names() {
    let json = serde_json::to_value(ExecutionConfig::new().max_threads(2)).unwrap();
    assert_eq!(json["max_threads"], 2);
    assert_eq!(json["splitor"], "contiguous");
}

#[test]
fn test_stream_reports_active_config() {
    let config = ExecutionConfig::new().max_threads(2).splitor(Splitor::SharedCursor);
    let stream = RStream::of(vec![1, 2, 3]).parallel_with(config.clone()).unwrap();
    assert_eq!(stream.execution_config(), Some(&config));

    // Reconfiguring keeps the stream parallel and swaps the settings.
    let stream = stream.parallel_with(ExecutionConfig::new().max_threads(3)).unwrap();
    assert_eq!(stream.execution_config().map(|c| c.max_threads), Some(3));
    assert_eq!(stream.execution_config().map(|c| c.splitor), Some(Splitor::Contiguous));

    // parallel() on an already parallel stream keeps its settings.
    let stream = stream.parallel();
    assert_eq!(stream.execution_config().map(|c| c.max_threads), Some(3));
}

#[test]
fn test_config_survives_derivation() {
    let config = ExecutionConfig::new().max_threads(2);
    let derived = RStream::of(1..=10)
        .parallel_with(config.clone())
        .unwrap()
        .map(|x| x + 1)
        .filter(|x| x % 2 == 0)
        .skip(1);
    assert!(derived.is_parallel());
    assert_eq!(derived.execution_config(), Some(&config));
    assert_eq!(derived.to_vec().unwrap(), vec![4, 6, 8, 10]);
}
