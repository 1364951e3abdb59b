// src/scheduler/mod.rs

//! Debounce scheduler.
//!
//! Two instances of the same debounce/rerun pattern:
//! - one per async script ([`async_debounce`]),
//! - one for the whole ordered batch of sync scripts ([`sync_group`]).
//!
//! Everything here is synchronous and deterministic. The scheduler never
//! sleeps and never spawns processes; it mutates run phases in the
//! [`ScriptRegistry`](crate::registry::ScriptRegistry) and returns
//! [`SchedulerCommand`]s that the runtime turns into timers and executions.
//! Timer events carry the generation they were armed with, so re-arming a key
//! implicitly cancels the previous timer for it.

use std::time::Duration;

use crate::host::OutputLog;
use crate::registry::TimerGeneration;
use crate::types::ScriptCode;

pub mod async_debounce;
pub mod sync_group;

pub use sync_group::SyncGroupState;

/// Minimum delay before an automatic sync-batch retry.
pub const SYNC_RETRY_FLOOR: Duration = Duration::from_millis(500);

/// Identity of a debounce timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Per-script timer of an async script.
    Script(ScriptCode),
    /// The single timer of the sync group.
    SyncGroup,
}

/// Side effect requested by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// (Re)arm the timer for `key`, replacing any timer already armed for it.
    ArmTimer {
        key: TimerKey,
        generation: TimerGeneration,
        delay: Duration,
    },
    /// Start a run of this script now.
    Execute(ScriptCode),
}

/// Owns timer generations and the output log used for progress lines.
#[derive(Debug)]
pub struct DebounceScheduler {
    next_generation: TimerGeneration,
    output: OutputLog,
}

impl DebounceScheduler {
    pub fn new(output: OutputLog) -> Self {
        Self {
            next_generation: 0,
            output,
        }
    }

    fn next_generation(&mut self) -> TimerGeneration {
        self.next_generation += 1;
        self.next_generation
    }
}

fn millis(delay: Duration) -> u128 {
    delay.as_millis()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    use crate::config::parse_config;
    use crate::errors::Result;
    use crate::host::{
        ErrorLocation, IndicatorColor, OutputLog, StatusIndicator, StatusSurface,
    };
    use crate::registry::ScriptRegistry;
    use crate::types::ScriptCode;

    /// Surface that records output messages (without timestamps) and the
    /// last text of each indicator.
    #[derive(Default)]
    pub struct Recorder {
        pub lines: Mutex<Vec<String>>,
        pub texts: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl Recorder {
        pub fn messages(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        pub fn last_text(&self, code: &str) -> Option<String> {
            self.texts
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(c, _)| c == code)
                .map(|(_, t)| t.clone())
        }
    }

    struct Handle {
        code: String,
        texts: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl StatusIndicator for Handle {
        fn set_text(&mut self, text: &str) {
            self.texts
                .lock()
                .unwrap()
                .push((self.code.clone(), text.to_string()));
        }
        fn set_color(&mut self, _color: IndicatorColor) {}
        fn set_tooltip(&mut self, _tooltip: &str) {}
        fn dispose(&mut self) {}
    }

    impl StatusSurface for Recorder {
        fn create_indicator(&self, code: &ScriptCode, _label: &str) -> Box<dyn StatusIndicator> {
            Box::new(Handle {
                code: code.to_string(),
                texts: Arc::clone(&self.texts),
            })
        }
        fn append_output(&self, line: &str) {
            let message = line.get(10..).unwrap_or(line).to_string();
            self.lines.lock().unwrap().push(message);
        }
        fn reveal_output(&self) {}
        fn open_location(&self, _location: &ErrorLocation) -> Result<()> {
            Ok(())
        }
    }

    pub fn setup(json: &str) -> (Arc<Recorder>, OutputLog, ScriptRegistry) {
        let recorder = Arc::new(Recorder::default());
        let output = OutputLog::new(recorder.clone());
        let config = parse_config(json).unwrap();
        let registry = ScriptRegistry::load(&config, &BTreeSet::new(), recorder.as_ref());
        (recorder, output, registry)
    }
}
