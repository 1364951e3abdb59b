#![allow(dead_code)]

use onsave::config::{ConfigFile, parse_config};
use serde_json::{Map, Value, json};

/// Builder for `.statusBarTask.json` documents to simplify test setup.
///
/// Produces either the JSON text (to put on a filesystem) or the validated
/// [`ConfigFile`].
#[derive(Debug, Clone, Default)]
pub struct ConfigFileBuilder {
    async_delay: Option<u64>,
    sync_delay: Option<u64>,
    async_scripts: Vec<Value>,
    sync_scripts: Vec<Value>,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn async_delay(mut self, ms: u64) -> Self {
        self.async_delay = Some(ms);
        self
    }

    pub fn sync_delay(mut self, ms: u64) -> Self {
        self.sync_delay = Some(ms);
        self
    }

    pub fn with_async(mut self, script: ScriptConfigBuilder) -> Self {
        self.async_scripts.push(script.into_value());
        self
    }

    pub fn with_sync(mut self, script: ScriptConfigBuilder) -> Self {
        self.sync_scripts.push(script.into_value());
        self
    }

    pub fn to_json(&self) -> String {
        let mut doc = Map::new();
        if let Some(ms) = self.async_delay {
            doc.insert("asyncScriptsDelay".into(), json!(ms));
        }
        if let Some(ms) = self.sync_delay {
            doc.insert("syncScriptsDelay".into(), json!(ms));
        }
        if !self.async_scripts.is_empty() {
            doc.insert("asyncScripts".into(), Value::Array(self.async_scripts.clone()));
        }
        if !self.sync_scripts.is_empty() {
            doc.insert("syncScripts".into(), Value::Array(self.sync_scripts.clone()));
        }
        Value::Object(doc).to_string()
    }

    pub fn build(self) -> ConfigFile {
        parse_config(&self.to_json()).expect("Failed to build valid config from builder")
    }
}

/// Builder for one script entry.
#[derive(Debug, Clone)]
pub struct ScriptConfigBuilder {
    label: String,
    command: String,
    delay: Option<u64>,
    matcher: Option<(String, String)>,
}

impl ScriptConfigBuilder {
    pub fn new(label: &str, command: &str) -> Self {
        Self {
            label: label.to_string(),
            command: command.to_string(),
            delay: None,
            matcher: None,
        }
    }

    pub fn delay(mut self, ms: u64) -> Self {
        self.delay = Some(ms);
        self
    }

    pub fn matcher(mut self, match_pattern: &str, replace_pattern: &str) -> Self {
        self.matcher = Some((match_pattern.to_string(), replace_pattern.to_string()));
        self
    }

    fn into_value(self) -> Value {
        let mut script = json!({
            "label": self.label,
            "command": self.command,
        });
        if let Some(ms) = self.delay {
            script["delay"] = json!(ms);
        }
        if let Some((match_pattern, replace_pattern)) = self.matcher {
            script["problemMatcher"] = json!({
                "matchPattern": match_pattern,
                "replacePattern": replace_pattern,
            });
        }
        script
    }
}
