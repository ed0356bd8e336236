use rs2_flow::*;
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_default_config() {
    let config = FlowConfig::default();
    assert_eq!(config.batch_size, 32);
    assert_eq!(config.fold_prefetch, 128);
    assert_eq!(config.overflow, OverflowPolicy::Fail);
    assert!(config.validate().is_ok());
    assert_eq!(FlowConfig::new(), config);
}

#[test]
fn test_builder_setters() {
    let config = FlowConfig::new()
        .batch_size(8)
        .fold_prefetch(16)
        .overflow(OverflowPolicy::Saturate);

    assert_eq!(config.batch_size, 8);
    assert_eq!(config.fold_prefetch, 16);
    assert_eq!(config.overflow, OverflowPolicy::Saturate);

    let unbounded = config.unbounded_prefetch();
    assert_eq!(unbounded.fold_prefetch, UNBOUNDED);
}

#[test]
fn test_validation_rejects_zero_windows() {
    let error = assert_err!(FlowConfig::new().batch_size(0).validate());
    assert!(matches!(error, StreamError::Config(_)));

    let result = FlowConfig::new().fold_prefetch(0).validate();
    assert!(matches!(result, Err(StreamError::Config(_))));
}

#[test]
fn test_from_json_fills_missing_fields() {
    let config = assert_ok!(FlowConfig::from_json(r#"{ "overflow": "wrap" }"#));
    assert_eq!(config.overflow, OverflowPolicy::Wrap);
    assert_eq!(config.batch_size, 32);
    assert_eq!(config.fold_prefetch, 128);
}

#[test]
fn test_from_json_rejects_malformed_and_invalid() {
    assert!(matches!(
        FlowConfig::from_json("{ not json"),
        Err(StreamError::Config(_))
    ));
    assert!(matches!(
        FlowConfig::from_json(r#"{ "batch_size": 0 }"#),
        Err(StreamError::Config(_))
    ));
}

#[test]
fn test_config_serde_roundtrip() {
    let config = FlowConfig::new().batch_size(4).overflow(OverflowPolicy::Saturate);
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"saturate\""));
    assert_eq!(FlowConfig::from_json(&json).unwrap(), config);
}

#[test]
fn test_demand_policy_serde() {
    let policy: DemandPolicy = serde_json::from_str(r#"{ "batched": 4 }"#).unwrap();
    assert_eq!(policy, DemandPolicy::Batched(4));
    let policy: DemandPolicy = serde_json::from_str(r#""manual""#).unwrap();
    assert_eq!(policy, DemandPolicy::Manual);
    assert_eq!(DemandPolicy::default(), DemandPolicy::Unbounded);
}

#[test]
fn test_config_drives_operators() {
    let config = FlowConfig::new().fold_prefetch(2).overflow(OverflowPolicy::Wrap);
    let sink = RecordingSink::with_config(&config);
    let recording = sink.recording();

    from_iter(vec![250u8, 10])
        .sum_with_config(&config)
        .subscribe_with(sink);

    assert_eq!(recording.items(), vec![4]);
}

#[test]
fn test_sum_with_config_applies_overflow_policy() {
    let config = FlowConfig::new().overflow(OverflowPolicy::Saturate);
    let sink = RecordingSink::unbounded();
    let recording = sink.recording();

    from_iter(vec![i16::MAX, 1]).sum_with_config(&config).subscribe_with(sink);
    assert_eq!(recording.items(), vec![i16::MAX]);

    let sink = RecordingSink::unbounded();
    let recording = sink.recording();
    from_iter(vec![i16::MAX, 1])
        .sum_with_config(&FlowConfig::default())
        .subscribe_with(sink);
    assert_eq!(recording.errors(), vec![StreamError::Overflow]);
}

#[test]
fn test_batch_size_sets_sink_demand_window() {
    let config = FlowConfig::new().batch_size(3);
    assert_eq!(DemandPolicy::from(&config), DemandPolicy::Batched(3));

    let sink = RecordingSink::with_config(&config);
    let recording = sink.recording();

    from_iter(0..7).subscribe_with(sink);

    let requests: Vec<_> = recording
        .events()
        .into_iter()
        .filter(|event| matches!(event, Event::Requested(_)))
        .collect();
    assert_eq!(requests, vec![Event::Requested(3); 3]);
    assert_eq!(recording.item_count(), 7);
    assert_eq!(recording.completions(), 1);
}

#[test]
fn test_zero_batch_window_is_treated_as_one() {
    let sink = RecordingSink::new(DemandPolicy::Batched(0));
    let recording = sink.recording();

    from_iter(vec![1, 2, 3]).subscribe_with(sink);

    assert_eq!(recording.items(), vec![1, 2, 3]);
    assert_eq!(recording.completions(), 1);
    assert!(recording.errors().is_empty());
    assert!(recording.within_demand());
}

#[test]
fn test_zero_batch_window_through_fold() {
    let sink = RecordingSink::new(DemandPolicy::Batched(0));
    let recording = sink.recording();

    from_iter(vec![1, 2, 3]).sum().subscribe_with(sink);

    assert_eq!(recording.items(), vec![6]);
    assert!(recording.errors().is_empty());
}
