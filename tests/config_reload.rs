// tests/config_reload.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use onsave::config::checksum::checksum;
use onsave::state::{MemoryStateStore, StateStore};
use onsave_test_utils::builders::{ConfigFileBuilder, ScriptConfigBuilder};
use onsave_test_utils::fake_runner::FakeProcessRunner;
use onsave_test_utils::harness::{Harness, config_path, settle};
use onsave_test_utils::init_tracing;
use onsave_test_utils::recording::RecordingPrompter;

type TestResult = Result<(), Box<dyn Error>>;

fn single(label: &str, command: &str) -> String {
    ConfigFileBuilder::new()
        .async_delay(50)
        .with_async(ScriptConfigBuilder::new(label, command))
        .to_json()
}

#[tokio::test(start_paused = true)]
async fn unchanged_file_loads_without_asking() -> TestResult {
    init_tracing();
    let config = single("lint", "lint");
    let store = Arc::new(MemoryStateStore::new());
    store.set_checksum(&checksum(config.as_bytes()))?;

    let h = Harness::builder().config(&config).store(store).start().await;
    settle(1).await;
    h.reinit().await;
    settle(1).await;

    assert_eq!(h.prompter.confirmations(), 0);
    assert_eq!(h.surface.count("Load config file /ws/.statusBarTask.json"), 2);

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn changed_file_asks_once_and_remembers_the_approval() -> TestResult {
    init_tracing();
    let h = Harness::builder().config(&single("lint", "lint")).start().await;
    settle(1).await;
    assert_eq!(h.prompter.confirmations(), 1);
    let approved = h.store.checksum()?;
    assert!(approved.is_some());

    h.reinit().await;
    settle(1).await;
    assert_eq!(h.prompter.confirmations(), 1, "same bytes, no second prompt");

    h.write_config(&single("lint", "lint --fix"));
    h.reinit().await;
    settle(1).await;
    assert_eq!(h.prompter.confirmations(), 2);
    assert_ne!(h.store.checksum()?, approved);

    h.save().await;
    settle(100).await;
    assert_eq!(h.runner.started(), vec!["lint --fix"]);

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn declined_change_keeps_the_previous_scripts() -> TestResult {
    init_tracing();
    let h = Harness::builder().config(&single("lint", "lint")).start().await;
    settle(1).await;
    let approved = h.store.checksum()?;

    h.prompter.set_approve(false);
    h.write_config(&single("build", "build"));
    h.reinit().await;
    settle(1).await;

    assert!(h.surface.contains(
        "Loading of .statusBarTask.json from /ws/.statusBarTask.json aborted by user"
    ));
    assert_eq!(h.store.checksum()?, approved, "checksum only moves on approval");
    assert!(h.surface.disposed().is_empty());

    h.save().await;
    settle(100).await;
    assert_eq!(h.runner.started(), vec!["lint"]);

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn first_load_declined_leaves_nothing_loaded() -> TestResult {
    init_tracing();
    let h = Harness::builder()
        .config(&single("lint", "lint"))
        .prompter(RecordingPrompter::declining())
        .start()
        .await;
    settle(1).await;

    assert_eq!(h.store.checksum()?, None);
    h.save().await;
    settle(100).await;
    assert!(h.runner.started().is_empty());
    assert!(!h.surface.contains("Execute scripts"));

    let summary = h.shutdown().await;
    assert!(!summary.config_loaded);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn removed_file_tears_scripts_down() -> TestResult {
    init_tracing();
    let h = Harness::builder().config(&single("lint", "lint")).start().await;
    settle(1).await;

    h.fs.remove_file(config_path());
    h.reinit().await;
    settle(1).await;

    assert!(h.surface.contains("Config file not found in workspace or parent directory."));
    assert_eq!(h.surface.disposed(), vec!["async:0".into()]);

    h.save().await;
    settle(100).await;
    assert!(h.runner.started().is_empty());

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn config_in_parent_directory_is_used() -> TestResult {
    init_tracing();
    let h = Harness::builder().start().await;
    h.fs.add_file("/.statusBarTask.json", single("lint", "lint"));
    settle(1).await;
    h.reinit().await;
    settle(1).await;

    assert!(h.surface.contains("Load config file /ws/../.statusBarTask.json"));
    h.save().await;
    settle(100).await;
    assert_eq!(h.runner.started(), vec!["lint"]);

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn invalid_json_reports_an_error_and_disables_triggers() -> TestResult {
    init_tracing();
    let h = Harness::builder().config(&single("lint", "lint")).start().await;
    settle(1).await;

    h.write_config("{ \"asyncScripts\": [ ");
    h.reinit().await;
    settle(1).await;

    assert!(
        h.surface
            .messages()
            .iter()
            .any(|m| m.starts_with("Error: Configuration error:")),
        "{:?}",
        h.surface.messages()
    );
    assert_eq!(h.surface.disposed(), vec!["async:0".into()]);

    h.save().await;
    settle(100).await;
    assert!(h.runner.started().is_empty());

    h.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn results_of_a_replaced_configuration_are_ignored() -> TestResult {
    init_tracing();
    let runner = FakeProcessRunner::new().with_duration("lint", Duration::from_millis(500));
    let h = Harness::builder()
        .config(&single("lint", "lint"))
        .runner(runner)
        .start()
        .await;
    settle(1).await;

    h.save().await;
    settle(100).await;
    assert_eq!(h.surface.last_text("async:0").as_deref(), Some("lint ⟳"));

    // Reload while the old run is still going.
    h.write_config(&single("lint", "lint --strict"));
    h.reinit().await;
    settle(1000).await;

    assert_eq!(h.runner.run_count("lint"), 1);
    assert_eq!(
        h.surface.last_text("async:0").as_deref(),
        Some("lint"),
        "fresh indicator untouched by the stale completion"
    );
    assert_eq!(h.surface.disposed().len(), 1);

    h.save().await;
    settle(100).await;
    assert_eq!(h.runner.run_count("lint --strict"), 1);

    h.shutdown().await;
    Ok(())
}
