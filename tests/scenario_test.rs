use std::sync::Arc;

use serde_json::json;
use strucdbg::chain::ErrorIdentity;
use strucdbg::config::DemoConfig;
use strucdbg::memory_sink::MemorySink;
use strucdbg::output::{make_sink, OutputTarget};
use strucdbg::parse::{parse_lines, ParsedLine, ParsedRecord};
use strucdbg::pipeline::{Pipeline, PipelineConfig};
use strucdbg::record::LogRecord;
use strucdbg::scenario;
use strucdbg::severity::Severity;
use tokio::time::Duration;

async fn run_to_memory(config: &DemoConfig) -> Vec<LogRecord> {
    let sink = MemorySink::new();
    let (logger, guard) = Pipeline::start(Arc::new(sink.clone()), config.pipeline());
    scenario::run(&logger, config).await;
    drop(logger);
    guard.shutdown().await;
    sink.records()
}

#[tokio::test(start_paused = true)]
async fn default_scenario_emits_the_reference_event_sequence() {
    let records = run_to_memory(&DemoConfig::default()).await;
    let events: Vec<&str> = records.iter().map(|r| r.event().unwrap_or("-")).collect();

    let mut expected = vec!["app_start"; 4];
    expected.push("-"); // user login carries no event tag
    expected.extend(["-"; 5]);
    expected.extend(["operation_error", "stacktrace_example", "deep_error"]);
    expected.extend(["main_loop"; 20]);
    expected.push("app_shutdown");
    assert_eq!(events, expected);

    let levels: Vec<Severity> = records[..4].iter().map(|r| r.level).collect();
    assert_eq!(levels, Severity::ALL.to_vec());

    let login = &records[4];
    assert_eq!(login.fields.get("user_id"), Some(&json!(12345)));
    assert_eq!(login.fields.get("username"), Some(&json!("john_doe")));

    for r in &records[5..10] {
        assert_eq!(r.fields.get("operation_id"), Some(&json!("abcde")), "{}", r.message);
    }
    assert!(records[10..].iter().all(|r| !r.fields.contains_key("operation_id")));

    let failure = &records[10];
    assert_eq!(failure.level, Severity::Error);
    assert_eq!(failure.message, "Operation failed");
    assert_eq!(
        failure.fields.get("error"),
        Some(&json!("level1 failed: level2 failed: innermost error occurred"))
    );
}

#[tokio::test(start_paused = true)]
async fn deep_error_is_handled_depth_levels_down() {
    let config = DemoConfig { deep_depth: 3, iterations: 0, ..DemoConfig::default() };
    let records = run_to_memory(&config).await;
    let deep = records.iter().find(|r| r.event() == Some("deep_error")).unwrap();
    assert_eq!(deep.logger.as_deref(), Some("level1.level2.level3"));
    assert_eq!(deep.fields.get("depth"), Some(&json!(3)));
    assert_eq!(deep.fields.get("error"), Some(&json!("innermost error occurred")));

    let config = DemoConfig { deep_depth: 0, iterations: 0, ..DemoConfig::default() };
    let records = run_to_memory(&config).await;
    let deep = records.iter().find(|r| r.event() == Some("deep_error")).unwrap();
    assert_eq!(deep.logger, None);
    assert_eq!(deep.fields.get("depth"), Some(&json!(0)));
}

#[tokio::test(start_paused = true)]
async fn min_level_and_depth_come_from_config() {
    let config = DemoConfig {
        min_level: Severity::Error,
        error_depth: 5,
        error_identity: ErrorIdentity::Shared,
        include_stack: false,
        iterations: 2,
        interval: Duration::from_millis(100),
        ..DemoConfig::default()
    };
    let records = run_to_memory(&config).await;

    assert!(records.iter().all(|r| r.level == Severity::Error));
    let failure = records.iter().find(|r| r.event() == Some("operation_error")).unwrap();
    assert_eq!(
        failure.fields.get("error"),
        Some(&json!("level1 failed: level2 failed: level3 failed: level4 failed: innermost error occurred"))
    );
    assert!(!failure.fields.contains_key("stack"));
}

fn structured(lines: &[ParsedLine]) -> Vec<&ParsedRecord> {
    lines
        .iter()
        .filter_map(|l| match l {
            ParsedLine::Structured(r) => Some(r),
            ParsedLine::Raw(_) => None,
        })
        .collect()
}

#[tokio::test]
async fn file_output_is_one_json_record_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.jsonl");
    let config = DemoConfig {
        output: OutputTarget::File(path.clone()),
        iterations: 3,
        interval: Duration::from_millis(5),
        ..DemoConfig::default()
    };

    let sink = make_sink(&config.output, config.encoder()).await.unwrap();
    let (logger, guard) = Pipeline::start(sink, PipelineConfig::default());
    let ran = scenario::run(&logger, &config).await;
    drop(logger);
    let stats = guard.shutdown().await;
    assert_eq!(ran, 3);

    let text = std::fs::read_to_string(&path).unwrap();
    let lines = parse_lines(&text);
    let records = structured(&lines);
    assert_eq!(records.len(), lines.len(), "every line must be a JSON object");
    assert_eq!(records.len() as u64, stats.written);

    let iterations: Vec<i64> = records
        .iter()
        .filter(|r| r.fields.get("ev") == Some(&json!("main_loop")))
        .map(|r| {
            assert!(r.timestamp.is_some());
            // the loop's own unix timestamp survives the reserved-key collision
            assert!(r.fields.get("timestamp").and_then(|v| v.as_i64()).is_some());
            r.fields.get("iteration").and_then(|v| v.as_i64()).unwrap()
        })
        .collect();
    assert_eq!(iterations, vec![1, 2, 3]);

    let last = records.last().unwrap();
    assert_eq!(last.message, "Stopping after 3 iterations");
    assert_eq!(last.fields.get("ev"), Some(&json!("app_shutdown")));

    let grouped: Vec<_> = records.iter().filter(|r| r.operation_id.as_deref() == Some("abcde")).collect();
    assert_eq!(grouped.len(), 5);
    assert_eq!(grouped[3].severity, Severity::Warn);
    assert_eq!(grouped[3].fields.get("latency_ms"), Some(&json!(250)));
}
