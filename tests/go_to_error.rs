// tests/go_to_error.rs

use std::error::Error;
use std::path::PathBuf;

use onsave::exec::ProcessOutput;
use onsave_test_utils::builders::{ConfigFileBuilder, ScriptConfigBuilder};
use onsave_test_utils::fake_runner::FakeProcessRunner;
use onsave_test_utils::harness::{Harness, settle};
use onsave_test_utils::init_tracing;
use onsave_test_utils::recording::RecordingSurface;

type TestResult = Result<(), Box<dyn Error>>;

fn config() -> String {
    ConfigFileBuilder::new()
        .async_delay(50)
        .with_async(
            ScriptConfigBuilder::new("check", "check")
                .matcher(r"^(\S+):(\d+):(\d+): error", "${1}:${2}:${3}"),
        )
        .to_json()
}

/// Every one of the first `runs` runs fails with `stdout`.
fn failing_runner(stdout: &str, runs: usize) -> FakeProcessRunner {
    let runner = FakeProcessRunner::new();
    for _ in 0..runs {
        runner.push_output(
            "check",
            ProcessOutput {
                error: Some("Command failed: check (exit code 1)".into()),
                stdout: stdout.into(),
                stderr: String::new(),
            },
        );
    }
    runner
}

#[tokio::test(start_paused = true)]
async fn cycles_through_sorted_errors_and_wraps() -> TestResult {
    init_tracing();
    let runner = failing_runner(
        "src/b.rs:2:5: error mismatched types\n\
         src/a.rs:10:1: error unused\n\
         src/c.rs:1:1: error missing\n\
         src/a.rs:10:1: error unused",
        1,
    );
    let h = Harness::builder().config(&config()).runner(runner).start().await;
    settle(1).await;

    h.save().await;
    settle(100).await;
    assert_eq!(h.surface.last_text("async:0").as_deref(), Some("check ✖ 3x"));

    for _ in 0..4 {
        h.go_to_error("async:0").await;
    }
    settle(1).await;

    let opened: Vec<(PathBuf, u32, u32)> = h
        .surface
        .opened()
        .into_iter()
        .map(|l| (l.path, l.line, l.column))
        .collect();
    assert_eq!(
        opened,
        vec![
            (PathBuf::from("/ws/src/a.rs"), 9, 0),
            (PathBuf::from("/ws/src/b.rs"), 1, 4),
            (PathBuf::from("/ws/src/c.rs"), 0, 0),
            (PathBuf::from("/ws/src/a.rs"), 9, 0),
        ]
    );

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn new_run_resets_the_cursor() -> TestResult {
    init_tracing();
    let runner = failing_runner("src/a.rs:1:1: error x\nsrc/b.rs:1:1: error y", 2);
    let h = Harness::builder().config(&config()).runner(runner).start().await;
    settle(1).await;

    h.save().await;
    settle(100).await;
    h.go_to_error("async:0").await;
    settle(1).await;

    h.save().await;
    settle(100).await;
    h.go_to_error("async:0").await;
    settle(1).await;

    let paths: Vec<PathBuf> = h.surface.opened().into_iter().map(|l| l.path).collect();
    assert_eq!(
        paths,
        vec![PathBuf::from("/ws/src/a.rs"), PathBuf::from("/ws/src/a.rs")]
    );

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn missing_file_is_reported_in_the_output() -> TestResult {
    init_tracing();
    let runner = failing_runner("gone/x.rs:3:7: error stale", 1);
    let h = Harness::builder()
        .config(&config())
        .runner(runner)
        .surface(RecordingSurface::new().with_missing_files_under("/ws/gone"))
        .start()
        .await;
    settle(1).await;

    h.save().await;
    settle(100).await;
    let reveals_before = h.surface.reveals();
    h.go_to_error("async:0").await;
    settle(1).await;

    assert!(h.surface.opened().is_empty());
    assert!(h.surface.contains(
        "Cannot find file: /ws/gone/x.rs, line: 2, column: 6 (no such file)"
    ));
    assert_eq!(h.surface.reveals(), reveals_before + 1);

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn script_without_errors_opens_nothing() -> TestResult {
    init_tracing();
    let h = Harness::builder().config(&config()).start().await;
    settle(1).await;

    h.save().await;
    settle(100).await;
    assert_eq!(h.surface.last_text("async:0").map(|t| t.starts_with("check ")), Some(true));
    h.go_to_error("async:0").await;
    h.go_to_error("sync:9").await;
    settle(1).await;

    assert!(h.surface.opened().is_empty());
    assert_eq!(h.surface.reveals(), 0);

    h.shutdown().await;
    Ok(())
}
