// src/engine/dispatcher.rs

//! Trigger fan-out.
//!
//! Every trigger source (file save/create/delete, manual "run") lands here
//! and is handled the same way: each enabled async script is triggered, then
//! the sync group is triggered once.

use tokio::time::Instant;
use tracing::debug;

use crate::engine::CoreCommand;
use crate::types::TriggerReason;

use super::core::CoreRuntime;

impl CoreRuntime {
    pub(super) fn on_workspace_event(&mut self, reason: TriggerReason) -> Vec<CoreCommand> {
        let Some(active) = self.active.as_mut() else {
            debug!(?reason, "no configuration loaded; ignoring trigger");
            return Vec::new();
        };
        debug!(?reason, epoch = active.epoch, "workspace trigger");

        self.output.blank_line();
        self.output.log("Execute scripts");

        let mut commands = Vec::new();
        for code in active.registry.enabled_async_codes() {
            commands.extend(self.scheduler.trigger_async(&mut active.registry, &code));
        }
        commands.extend(self.scheduler.trigger_sync(
            &mut active.registry,
            &mut active.sync,
            Instant::now(),
        ));

        self.lift(commands)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::{ReloadOutcome, parse_config};
    use crate::engine::{CoreCommand, CoreRuntime, RuntimeEvent, RuntimeOptions};
    use crate::scheduler::TimerKey;
    use crate::scheduler::test_support::Recorder;
    use crate::types::{ScriptCode, TriggerReason};

    fn loaded(json: &str, disabled: &[&str]) -> RuntimeEvent {
        RuntimeEvent::ConfigReloaded(ReloadOutcome::Loaded {
            path: PathBuf::from("/ws/.statusBarTask.json"),
            config: parse_config(json).unwrap(),
            disabled: disabled.iter().map(|c| ScriptCode::from(*c)).collect::<BTreeSet<_>>(),
        })
    }

    fn timers(commands: &[CoreCommand]) -> Vec<(TimerKey, Duration)> {
        commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::ArmTimer { key, delay, .. } => Some((key.clone(), *delay)),
                _ => None,
            })
            .collect()
    }

    const CONFIG: &str = r#"{
        "asyncScriptsDelay": 100,
        "syncScriptsDelay": 400,
        "asyncScripts": [
            {"label": "lint", "command": "lint"},
            {"label": "fmt", "command": "fmt"}
        ],
        "syncScripts": [
            {"label": "build", "command": "make"},
            {"label": "test", "command": "make test"}
        ]
    }"#;

    #[test]
    fn trigger_fans_out_to_enabled_async_scripts_and_sync_group_once() {
        let recorder = Arc::new(Recorder::default());
        let mut core = CoreRuntime::new("/ws", recorder.clone(), RuntimeOptions::default());
        core.step(loaded(CONFIG, &["async:1"]));

        let step = core.step(RuntimeEvent::WorkspaceChanged {
            reason: TriggerReason::FileSaved,
        });
        assert_eq!(
            timers(&step.commands),
            vec![
                (TimerKey::Script("async:0".into()), Duration::from_millis(100)),
                (TimerKey::SyncGroup, Duration::from_millis(400)),
            ]
        );

        let messages = recorder.messages();
        assert_eq!(messages[0], "");
        assert_eq!(messages[1], "Execute scripts");
        assert_eq!(messages[2], "lint: waiting 100 ms");
        assert_eq!(messages[3], "Sync scripts waiting 400 ms");
    }

    #[test]
    fn triggers_without_configuration_are_no_ops() {
        let recorder = Arc::new(Recorder::default());
        let mut core = CoreRuntime::new("/ws", recorder.clone(), RuntimeOptions::default());

        for reason in [TriggerReason::Manual, TriggerReason::FileDeleted] {
            let step = core.step(RuntimeEvent::WorkspaceChanged { reason });
            assert!(step.commands.is_empty());
            assert!(step.keep_running);
        }
        assert!(recorder.messages().is_empty());
    }
}
