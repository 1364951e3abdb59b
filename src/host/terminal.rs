// src/host/terminal.rs

//! Terminal host: status lines and the output log go to stdout, commands and
//! prompt answers come from stdin.

use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use crossterm::execute;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::RuntimeEvent;
use crate::errors::{self, OnsaveError};
use crate::types::{ScriptCode, TriggerReason};

use super::{
    ErrorLocation, IndicatorColor, PromptFuture, Prompter, StatusIndicator, StatusSurface,
    TaskChoice,
};

const HELP: &str = "commands: run | reload | next <code> | toggle | status | quit";

/// Parse one line typed by the user.
///
/// `Ok(None)` for blank lines; `Err` carries a message for the user.
pub fn parse_command(line: &str) -> std::result::Result<Option<RuntimeEvent>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let event = match command {
        "run" | "r" => RuntimeEvent::WorkspaceChanged {
            reason: TriggerReason::Manual,
        },
        "reload" => RuntimeEvent::ReinitRequested,
        "next" | "n" => {
            let code = words.next().ok_or("usage: next <code>")?;
            RuntimeEvent::GoToError {
                code: code.parse::<ScriptCode>()?,
            }
        }
        "toggle" => RuntimeEvent::ToggleTasksRequested,
        "status" | "s" => RuntimeEvent::StatusRequested,
        "quit" | "exit" | "q" => RuntimeEvent::ShutdownRequested,
        other => return Err(format!("unknown command '{other}'; {HELP}")),
    };
    Ok(Some(event))
}

/// Parse the picker answer: comma/space separated 1-based indices, or `none`.
/// A blank answer dismisses the picker.
pub fn parse_selection(
    answer: &str,
    choices: &[TaskChoice],
) -> std::result::Result<Option<BTreeSet<ScriptCode>>, String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(None);
    }
    if answer.eq_ignore_ascii_case("none") {
        return Ok(Some(BTreeSet::new()));
    }

    let mut enabled = BTreeSet::new();
    for token in answer.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let index: usize = token
            .parse()
            .map_err(|_| format!("not a task number: {token}"))?;
        let choice = index
            .checked_sub(1)
            .and_then(|i| choices.get(i))
            .ok_or_else(|| format!("no task number {index}"))?;
        enabled.insert(choice.code.clone());
    }
    Ok(Some(enabled))
}

/// stdin/stdout implementation of [`StatusSurface`] and [`Prompter`].
pub struct TerminalHost {
    /// Sender for the answer to the question currently on screen.
    pending_answer: Mutex<Option<oneshot::Sender<String>>>,
}

impl fmt::Debug for TerminalHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalHost").finish_non_exhaustive()
    }
}

impl Default for TerminalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalHost {
    pub fn new() -> Self {
        Self {
            pending_answer: Mutex::new(None),
        }
    }

    /// Read stdin line by line. A line answers the outstanding prompt if there
    /// is one, otherwise it is parsed as a command and forwarded to `tx`.
    pub fn spawn_input(self: Arc<Self>, tx: mpsc::Sender<RuntimeEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!("stdin closed; no more commands");
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to read stdin");
                        break;
                    }
                };

                if let Some(answer) = self.take_pending() {
                    let _ = answer.send(line);
                    continue;
                }

                match parse_command(&line) {
                    Ok(Some(event)) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => print_colored(Color::DarkGrey, &message),
                }
            }
            // Dropping a pending sender answers the prompt with "no".
            drop(self.take_pending());
        })
    }

    fn take_pending(&self) -> Option<oneshot::Sender<String>> {
        self.pending_answer
            .lock()
            .ok()
            .and_then(|mut pending| pending.take())
    }

    /// Print `question` and wait for the next stdin line.
    async fn ask(&self, question: String) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.pending_answer.lock() {
            *pending = Some(tx);
        }
        print_colored(Color::Magenta, &question);
        rx.await.ok()
    }
}

impl StatusSurface for TerminalHost {
    fn create_indicator(&self, code: &ScriptCode, label: &str) -> Box<dyn StatusIndicator> {
        Box::new(TerminalIndicator {
            code: code.clone(),
            color: IndicatorColor::Default,
            tooltip: None,
            last_text: label.to_string(),
        })
    }

    fn append_output(&self, line: &str) {
        let mut stdout = io::stdout();
        let _ = writeln!(stdout, "{line}");
    }

    fn reveal_output(&self) {
        // Output is always visible in the terminal.
    }

    fn open_location(&self, location: &ErrorLocation) -> errors::Result<()> {
        if !location.path.is_file() {
            return Err(OnsaveError::Navigation {
                path: location.path.clone(),
                line: location.line,
                column: location.column,
                reason: "no such file".to_string(),
            });
        }
        print_colored(
            Color::Cyan,
            &format!(
                "→ {}:{}:{}",
                location.path.display(),
                location.line + 1,
                location.column + 1
            ),
        );
        Ok(())
    }
}

impl Prompter for TerminalHost {
    fn confirm_config_change<'a>(&'a self, path: &'a Path) -> PromptFuture<'a, bool> {
        Box::pin(async move {
            let question = format!(
                "The .statusBarTask.json file at {} has changed. Do you want to load it? [y/N]",
                path.display()
            );
            let answer = self.ask(question).await.unwrap_or_default();
            matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
        })
    }

    fn choose_enabled_tasks(
        &self,
        choices: Vec<TaskChoice>,
    ) -> PromptFuture<'_, Option<BTreeSet<ScriptCode>>> {
        Box::pin(async move {
            let mut question = String::from("Enable tasks:\n");
            for (i, choice) in choices.iter().enumerate() {
                let mark = if choice.picked { "x" } else { " " };
                question.push_str(&format!("  {}. [{mark}] {} ({})\n", i + 1, choice.label, choice.code));
            }
            question.push_str("Numbers to enable (e.g. 1,3), 'none', or empty to cancel:");

            let answer = self.ask(question).await?;
            match parse_selection(&answer, &choices) {
                Ok(selection) => selection,
                Err(message) => {
                    print_colored(Color::Red, &message);
                    None
                }
            }
        })
    }
}

/// One status line per script, reprinted whenever its text changes.
struct TerminalIndicator {
    code: ScriptCode,
    color: IndicatorColor,
    tooltip: Option<String>,
    last_text: String,
}

impl StatusIndicator for TerminalIndicator {
    fn set_text(&mut self, text: &str) {
        self.last_text = text.to_string();
        let line = match &self.tooltip {
            Some(tip) if self.color == IndicatorColor::Muted => {
                format!("[{}] {}  ({tip})", self.code, self.last_text)
            }
            _ => format!("[{}] {}", self.code, self.last_text),
        };
        print_colored(terminal_color(self.color), &line);
    }

    fn set_color(&mut self, color: IndicatorColor) {
        self.color = color;
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        self.tooltip = Some(tooltip.to_string());
    }

    fn dispose(&mut self) {
        debug!(script = %self.code, "indicator disposed");
    }
}

fn terminal_color(color: IndicatorColor) -> Color {
    match color {
        IndicatorColor::Default => Color::Reset,
        IndicatorColor::Muted => Color::DarkGrey,
        IndicatorColor::Warning => Color::Yellow,
        IndicatorColor::Error => Color::Red,
        IndicatorColor::Success => Color::Green,
    }
}

fn print_colored(color: Color, text: &str) {
    if let Err(err) = write_colored(color, text) {
        debug!(error = %err, "failed to write to terminal");
    }
}

fn write_colored(color: Color, text: &str) -> Result<()> {
    let mut stdout = io::stdout();
    execute!(
        stdout,
        SetForegroundColor(color),
        Print(text),
        ResetColor,
        Print("\n"),
    )?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn choices() -> Vec<TaskChoice> {
        ["async:0", "async:1", "sync:0"]
            .into_iter()
            .map(|c| TaskChoice {
                code: c.into(),
                label: c.to_uppercase(),
                picked: true,
            })
            .collect()
    }

    #[test]
    fn commands_map_to_runtime_events() {
        assert!(matches!(
            parse_command("run"),
            Ok(Some(RuntimeEvent::WorkspaceChanged {
                reason: TriggerReason::Manual
            }))
        ));
        assert!(matches!(
            parse_command("  next sync:1 "),
            Ok(Some(RuntimeEvent::GoToError { code })) if code.as_str() == "sync:1"
        ));
        assert!(matches!(parse_command("quit"), Ok(Some(RuntimeEvent::ShutdownRequested))));
        assert!(matches!(parse_command("   "), Ok(None)));
        assert!(parse_command("next").is_err());
        assert!(parse_command("next build").is_err());
        assert!(parse_command("explode").is_err());
    }

    #[test]
    fn selection_uses_one_based_indices() {
        let picked = parse_selection("1, 3", &choices()).unwrap().unwrap();
        let codes: Vec<&str> = picked.iter().map(ScriptCode::as_str).collect();
        assert_eq!(codes, vec!["async:0", "sync:0"]);

        assert_eq!(parse_selection("", &choices()), Ok(None));
        assert_eq!(parse_selection("none", &choices()), Ok(Some(BTreeSet::new())));
        assert!(parse_selection("4", &choices()).is_err());
        assert!(parse_selection("0", &choices()).is_err());
    }

    #[test]
    fn missing_file_is_a_navigation_error() {
        let host = TerminalHost::new();
        let err = host
            .open_location(&ErrorLocation {
                path: PathBuf::from("/definitely/not/here.rs"),
                line: 4,
                column: 0,
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot find file: /definitely/not/here.rs, line: 4, column: 0 (no such file)"
        );
    }
}
