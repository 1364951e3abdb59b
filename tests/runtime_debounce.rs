// tests/runtime_debounce.rs

use std::error::Error;
use std::time::Duration;

use onsave::exec::ProcessOutput;
use onsave_test_utils::builders::{ConfigFileBuilder, ScriptConfigBuilder};
use onsave_test_utils::fake_runner::FakeProcessRunner;
use onsave_test_utils::harness::{Harness, settle};
use onsave_test_utils::init_tracing;
use tokio::time::Instant;

type TestResult = Result<(), Box<dyn Error>>;

/// `actual` lies within a couple of timer ticks after `expected_ms`.
fn assert_near(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

fn lint_config(delay: u64) -> String {
    ConfigFileBuilder::new()
        .async_delay(delay)
        .with_async(ScriptConfigBuilder::new("lint", "lint"))
        .to_json()
}

#[tokio::test(start_paused = true)]
async fn burst_of_saves_runs_once_after_the_last_one() -> TestResult {
    init_tracing();
    let h = Harness::builder().config(&lint_config(200)).start().await;
    settle(1).await;

    let t0 = Instant::now();
    h.save().await;
    // Nothing is due in between, so moving the clock directly is enough.
    tokio::time::advance(Duration::from_millis(100)).await;
    h.save().await;
    tokio::time::advance(Duration::from_millis(100)).await;
    h.save().await;
    settle(500).await;

    let starts = h.runner.starts_of("lint");
    assert_eq!(starts.len(), 1, "debounced to one run");
    assert_near(starts[0] - t0, 400);

    assert_eq!(h.surface.count("Execute scripts"), 3);
    assert_eq!(h.surface.count("lint: waiting 200 ms"), 3);
    assert_eq!(h.surface.count("lint: Execute"), 1);

    let summary = h.shutdown().await;
    assert_eq!(summary.runs, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn per_script_delay_overrides_the_default() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .async_delay(1000)
        .with_async(ScriptConfigBuilder::new("slow", "slow"))
        .with_async(ScriptConfigBuilder::new("fast", "fast").delay(50))
        .to_json();
    let h = Harness::builder().config(&config).start().await;
    settle(1).await;

    let t0 = Instant::now();
    h.save().await;
    settle(1500).await;

    assert_near(h.runner.starts_of("fast")[0] - t0, 50);
    assert_near(h.runner.starts_of("slow")[0] - t0, 1000);
    assert_eq!(h.runner.started(), vec!["fast", "slow"]);

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn trigger_while_running_reruns_right_after_completion() -> TestResult {
    init_tracing();
    let runner = FakeProcessRunner::new().with_duration("lint", Duration::from_millis(300));
    let h = Harness::builder()
        .config(&lint_config(100))
        .runner(runner)
        .start()
        .await;
    settle(1).await;

    let t0 = Instant::now();
    h.save().await;
    // First run: 100..400. Two saves while it runs collapse into one rerun.
    settle(150).await;
    h.save().await;
    settle(50).await;
    h.save().await;
    settle(1000).await;

    let starts = h.runner.starts_of("lint");
    assert_eq!(starts.len(), 2, "exactly one rerun: {starts:?}");
    assert_near(starts[0] - t0, 100);
    assert_near(starts[1] - t0, 400);

    assert_eq!(h.surface.count("lint: Already running"), 1);
    assert_eq!(h.surface.count("lint: Run again"), 1);
    assert_eq!(h.surface.count("lint: Execute"), 1);

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn save_after_a_finished_run_starts_a_new_cycle() -> TestResult {
    init_tracing();
    let h = Harness::builder().config(&lint_config(100)).start().await;
    settle(1).await;

    h.save().await;
    settle(200).await;
    assert_eq!(h.runner.run_count("lint"), 1);

    h.save().await;
    settle(200).await;
    assert_eq!(h.runner.run_count("lint"), 2);
    assert_eq!(h.surface.count("lint: Run again"), 0);

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn indicator_follows_the_run() -> TestResult {
    init_tracing();
    let runner = FakeProcessRunner::new().with_duration("lint", Duration::from_millis(100));
    runner.push_output(
        "lint",
        ProcessOutput {
            error: Some("Command failed: lint (exit code 1)".into()),
            stdout: "src/a.rs:1:1 unused".into(),
            stderr: String::new(),
        },
    );
    let h = Harness::builder()
        .config(&lint_config(100))
        .runner(runner)
        .start()
        .await;
    settle(1).await;

    assert_eq!(h.surface.last_text("async:0").as_deref(), Some("lint"));
    h.save().await;
    settle(10).await;
    assert_eq!(h.surface.last_text("async:0").as_deref(), Some("lint ⧗"));
    settle(100).await;
    assert_eq!(h.surface.last_text("async:0").as_deref(), Some("lint ⟳"));
    settle(200).await;
    // Exit message and the stdout line are both errors; stderr was empty.
    assert_eq!(h.surface.last_text("async:0").as_deref(), Some("lint ✖ 2x"));
    assert!(h.surface.contains(
        "lint: Output: Command failed: lint (exit code 1)\n\nsrc/a.rs:1:1 unused"
    ));

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn disabled_script_never_runs() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .async_delay(50)
        .with_async(ScriptConfigBuilder::new("lint", "lint"))
        .with_async(ScriptConfigBuilder::new("fmt", "fmt"))
        .to_json();
    let h = Harness::builder().config(&config).start().await;
    settle(1).await;

    h.prompter.select(&["async:0"]);
    h.send(onsave::engine::RuntimeEvent::ToggleTasksRequested).await;
    settle(10).await;

    let offered: Vec<_> = h.prompter.offered().iter().map(|c| c.label.clone()).collect();
    assert_eq!(offered, vec!["lint", "fmt"]);
    assert_eq!(h.surface.last_text("async:1").as_deref(), Some("✕ fmt"));

    h.save().await;
    settle(200).await;
    assert_eq!(h.runner.started(), vec!["lint"]);
    assert!(!h.surface.contains("fmt: waiting 50 ms"));

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn panicking_run_is_reported_and_script_recovers() -> TestResult {
    init_tracing();
    let runner = FakeProcessRunner::new().panic_on("boom");
    let config = ConfigFileBuilder::new()
        .async_delay(50)
        .with_async(ScriptConfigBuilder::new("boom", "boom"))
        .to_json();
    let h = Harness::builder().config(&config).runner(runner).start().await;
    settle(1).await;

    h.save().await;
    settle(100).await;
    assert_eq!(h.surface.last_text("async:0").as_deref(), Some("boom ✖"));
    assert!(h.surface.messages().iter().any(|m| m.starts_with("Error: ")));

    h.save().await;
    settle(100).await;
    assert_eq!(h.runner.run_count("boom"), 2, "not stuck as running");

    let summary = h.shutdown().await;
    assert_eq!(summary.failed, vec!["boom"]);
    Ok(())
}
