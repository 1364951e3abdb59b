// src/registry/mod.rs

//! The set of scripts of one loaded configuration.
//!
//! The registry exclusively owns every [`Script`] and its runtime fields. The
//! scheduler mutates run phases and timers in place; the host only owns the
//! display handles, which are released by [`ScriptRegistry::teardown`].

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use tracing::debug;

use crate::config::ConfigFile;
use crate::host::StatusSurface;
use crate::types::{ScriptCategory, ScriptCode};

pub mod script;

pub use script::{RunPhase, Script, TimerGeneration};

#[derive(Debug)]
pub struct ScriptRegistry {
    scripts: HashMap<ScriptCode, Script>,
    async_order: Vec<ScriptCode>,
    sync_order: Vec<ScriptCode>,
    async_delay: Duration,
    sync_delay: Duration,
    torn_down: bool,
}

impl ScriptRegistry {
    /// Build the registry for a validated configuration.
    ///
    /// Codes are `async:<i>` / `sync:<i>` by list position; scripts whose code
    /// is in `disabled` are loaded but never executed.
    pub fn load(
        config: &ConfigFile,
        disabled: &BTreeSet<ScriptCode>,
        surface: &dyn StatusSurface,
    ) -> Self {
        let mut scripts = HashMap::with_capacity(config.script_count());
        let mut async_order = Vec::with_capacity(config.async_scripts.len());
        let mut sync_order = Vec::with_capacity(config.sync_scripts.len());

        let lists = [
            (ScriptCategory::Async, &config.async_scripts, &mut async_order),
            (ScriptCategory::Sync, &config.sync_scripts, &mut sync_order),
        ];

        for (category, list, order) in lists {
            for (index, script_cfg) in list.iter().enumerate() {
                let code = ScriptCode::new(category, index);
                let enabled = !disabled.contains(&code);
                let display = surface.create_indicator(&code, &script_cfg.label);
                debug!(script = %code, label = %script_cfg.label, enabled, "prepared script");
                scripts.insert(
                    code.clone(),
                    Script::prepare(code.clone(), script_cfg, enabled, display),
                );
                order.push(code);
            }
        }

        Self {
            scripts,
            async_order,
            sync_order,
            async_delay: config.async_scripts_delay,
            sync_delay: config.sync_scripts_delay,
            torn_down: false,
        }
    }

    pub fn get(&self, code: &ScriptCode) -> Option<&Script> {
        self.scripts.get(code)
    }

    pub fn get_mut(&mut self, code: &ScriptCode) -> Option<&mut Script> {
        self.scripts.get_mut(code)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn async_delay(&self) -> Duration {
        self.async_delay
    }

    pub fn sync_delay(&self) -> Duration {
        self.sync_delay
    }

    /// Async scripts followed by sync scripts, each in configuration order.
    pub fn scripts(&self) -> impl Iterator<Item = &Script> {
        self.async_order
            .iter()
            .chain(self.sync_order.iter())
            .filter_map(|code| self.scripts.get(code))
    }

    pub fn enabled_async_codes(&self) -> Vec<ScriptCode> {
        self.enabled_in(&self.async_order)
    }

    /// Enabled sync scripts in configuration order.
    pub fn enabled_sync_codes(&self) -> Vec<ScriptCode> {
        self.enabled_in(&self.sync_order)
    }

    fn enabled_in(&self, order: &[ScriptCode]) -> Vec<ScriptCode> {
        order
            .iter()
            .filter(|code| self.scripts.get(*code).is_some_and(Script::is_enabled))
            .cloned()
            .collect()
    }

    /// Release every display handle. Idempotent; also runs on drop.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        for script in self.scripts.values_mut() {
            script.dispose();
        }
        self.torn_down = true;
        debug!(scripts = self.scripts.len(), "registry torn down");
    }
}

impl Drop for ScriptRegistry {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::parse_config;
    use crate::errors::Result;
    use crate::host::{ErrorLocation, IndicatorColor, StatusIndicator};

    #[derive(Default)]
    struct Surface {
        created: Mutex<Vec<String>>,
        disposed: Arc<Mutex<Vec<String>>>,
    }

    struct Handle {
        code: String,
        disposed: Arc<Mutex<Vec<String>>>,
    }

    impl StatusIndicator for Handle {
        fn set_text(&mut self, _text: &str) {}
        fn set_color(&mut self, _color: IndicatorColor) {}
        fn set_tooltip(&mut self, _tooltip: &str) {}
        fn dispose(&mut self) {
            self.disposed.lock().unwrap().push(self.code.clone());
        }
    }

    impl StatusSurface for Surface {
        fn create_indicator(&self, code: &ScriptCode, _label: &str) -> Box<dyn StatusIndicator> {
            self.created.lock().unwrap().push(code.to_string());
            Box::new(Handle {
                code: code.to_string(),
                disposed: Arc::clone(&self.disposed),
            })
        }
        fn append_output(&self, _line: &str) {}
        fn reveal_output(&self) {}
        fn open_location(&self, _location: &ErrorLocation) -> Result<()> {
            Ok(())
        }
    }

    fn sample() -> ConfigFile {
        parse_config(
            r#"{
                "asyncScriptsDelay": 100,
                "asyncScripts": [
                    {"label": "lint", "command": "lint"},
                    {"label": "types", "command": "tsc", "delay": 50}
                ],
                "syncScripts": [
                    {"label": "build", "command": "make"},
                    {"label": "test", "command": "make test"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn codes_follow_category_and_position() {
        let surface = Surface::default();
        let reg = ScriptRegistry::load(&sample(), &BTreeSet::new(), &surface);

        let codes: Vec<String> = reg.scripts().map(|s| s.code().to_string()).collect();
        assert_eq!(codes, vec!["async:0", "async:1", "sync:0", "sync:1"]);
        assert_eq!(reg.async_delay(), Duration::from_millis(100));
        assert_eq!(reg.sync_delay(), Duration::from_millis(2000));

        let types = reg.get(&"async:1".into()).unwrap();
        assert_eq!(types.delay(), Some(Duration::from_millis(50)));
        assert_eq!(types.phase(), RunPhase::Idle);
        assert!(types.last_errors().is_empty());
        assert_eq!(types.error_click_index(), 0);
    }

    #[test]
    fn disabled_scripts_are_loaded_but_filtered() {
        let surface = Surface::default();
        let disabled = BTreeSet::from([ScriptCode::from("sync:0")]);
        let reg = ScriptRegistry::load(&sample(), &disabled, &surface);

        assert_eq!(reg.len(), 4);
        assert!(!reg.get(&"sync:0".into()).unwrap().is_enabled());
        assert_eq!(reg.enabled_sync_codes(), vec![ScriptCode::from("sync:1")]);
        assert_eq!(reg.enabled_async_codes().len(), 2);
    }

    #[test]
    fn teardown_disposes_each_handle_once() {
        let surface = Surface::default();
        let mut reg = ScriptRegistry::load(&sample(), &BTreeSet::new(), &surface);
        reg.teardown();
        reg.teardown();
        drop(reg);

        let mut disposed = surface.disposed.lock().unwrap().clone();
        disposed.sort();
        assert_eq!(disposed, vec!["async:0", "async:1", "sync:0", "sync:1"]);
    }

    #[test]
    fn error_cursor_wraps() {
        let surface = Surface::default();
        let mut reg = ScriptRegistry::load(&sample(), &BTreeSet::new(), &surface);
        let script = reg.get_mut(&"async:0".into()).unwrap();
        script.record_errors(
            vec!["a".into(), "b".into(), "c".into()],
            Duration::ZERO,
        );
        let visited: Vec<String> = (0..4).filter_map(|_| script.next_error()).collect();
        assert_eq!(visited, vec!["a", "b", "c", "a"]);
    }
}
