use rs2_flow::*;
use std::sync::Arc;

#[test]
fn test_log_sink_writes_one_line_per_signal() {
    let logger = Arc::new(MemoryLogger::new());

    from_iter(vec![1, 2])
        .subscribe_with(LogSink::new(Arc::clone(&logger) as Arc<dyn SignalLogger>));

    assert_eq!(
        logger.lines(),
        vec!["on_subscribe", "on_next: 1", "on_next: 2", "on_complete"]
    );
}

#[test]
fn test_log_sink_logs_errors() {
    let logger = Arc::new(MemoryLogger::new());

    from_iter(vec![1, 2, 3])
        .try_map(|x| {
            if x == 2 {
                Err(StreamError::transform("boom"))
            } else {
                Ok(x)
            }
        })
        .subscribe_with(LogSink::new(Arc::clone(&logger) as Arc<dyn SignalLogger>));

    assert_eq!(
        logger.lines(),
        vec!["on_subscribe", "on_next: 1", "on_error: Transform failed: boom"]
    );
}

#[test]
fn test_log_sink_with_batched_policy() {
    let logger = Arc::new(MemoryLogger::new());

    from_iter(vec!["x", "y", "z"]).subscribe_with(LogSink::with_policy(
        Arc::clone(&logger) as Arc<dyn SignalLogger>,
        DemandPolicy::Batched(1),
    ));

    assert_eq!(
        logger.lines(),
        vec![
            "on_subscribe",
            "on_next: \"x\"",
            "on_next: \"y\"",
            "on_next: \"z\"",
            "on_complete",
        ]
    );
}

#[test]
fn test_log_sink_manual_policy_requests_nothing() {
    let logger = Arc::new(MemoryLogger::new());

    from_iter(vec![1]).subscribe_with(LogSink::with_policy(
        Arc::clone(&logger) as Arc<dyn SignalLogger>,
        DemandPolicy::Manual,
    ));

    assert_eq!(logger.lines(), vec!["on_subscribe"]);
}

#[test]
fn test_log_sink_after_sum() {
    let logger = Arc::new(MemoryLogger::new());

    from_iter(1..=4)
        .sum()
        .subscribe_with(LogSink::new(Arc::clone(&logger) as Arc<dyn SignalLogger>));

    assert_eq!(logger.lines(), vec!["on_subscribe", "on_next: 10", "on_complete"]);
}

#[test]
fn test_facade_logger_without_installed_logger() {
    let sink = LogSink::new(Arc::new(FacadeLogger::default()));
    from_iter(vec![1, 2, 3]).subscribe_with(sink);

    let custom = FacadeLogger::new("flow::audit", log::Level::Info);
    from_iter(vec!["a"]).subscribe_with(LogSink::new(Arc::new(custom)));
}
