// src/config/validate.rs

use std::time::Duration;

use tracing::warn;

use crate::config::model::{
    ConfigFile, DEFAULT_DELAY_MS, RawConfigFile, RawScriptConfig, ScriptConfig,
};
use crate::errors::{OnsaveError, Result};
use crate::problem::ProblemMatcher;
use crate::types::ScriptCategory;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = OnsaveError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let async_scripts = validate_scripts(
            ScriptCategory::Async,
            raw.async_scripts.unwrap_or_default(),
        )?;
        let sync_scripts =
            validate_scripts(ScriptCategory::Sync, raw.sync_scripts.unwrap_or_default())?;

        Ok(ConfigFile::new_unchecked(
            Duration::from_millis(raw.async_scripts_delay.unwrap_or(DEFAULT_DELAY_MS)),
            Duration::from_millis(raw.sync_scripts_delay.unwrap_or(DEFAULT_DELAY_MS)),
            async_scripts,
            sync_scripts,
        ))
    }
}

fn validate_scripts(
    category: ScriptCategory,
    raw: Vec<RawScriptConfig>,
) -> Result<Vec<ScriptConfig>> {
    raw.into_iter()
        .enumerate()
        .map(|(index, script)| validate_script(category, index, script))
        .collect()
}

fn validate_script(
    category: ScriptCategory,
    index: usize,
    raw: RawScriptConfig,
) -> Result<ScriptConfig> {
    if raw.command.trim().is_empty() {
        return Err(OnsaveError::ConfigParse(format!(
            "{category}Scripts[{index}] ('{}') has an empty command",
            raw.label
        )));
    }

    let problem_matcher = match raw.problem_matcher {
        Some(pm) => Some(
            ProblemMatcher::new(&pm.match_pattern, pm.replace_pattern).map_err(|e| {
                OnsaveError::ConfigParse(format!(
                    "{category}Scripts[{index}] ('{}') has an invalid matchPattern: {e}",
                    raw.label
                ))
            })?,
        ),
        None => None,
    };

    let delay = match (category, raw.delay) {
        (ScriptCategory::Async, Some(ms)) => Some(Duration::from_millis(ms)),
        (ScriptCategory::Sync, Some(_)) => {
            warn!(
                label = %raw.label,
                index,
                "`delay` is ignored on sync scripts; the group uses syncScriptsDelay"
            );
            None
        }
        (_, None) => None,
    };

    Ok(ScriptConfig {
        label: raw.label,
        command: raw.command,
        problem_matcher,
        delay,
    })
}
