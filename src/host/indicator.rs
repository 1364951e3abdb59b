// src/host/indicator.rs

//! Rendering of script states onto a [`StatusIndicator`].

use std::time::Duration;

use super::{IndicatorColor, StatusIndicator};

const DISABLED_TOOLTIP: &str = "Disabled, run the 'toggle' command to change";

/// Visual state of a script indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorState {
    /// Freshly loaded, never run.
    Idle,
    /// Loaded but disabled by the user.
    Disabled,
    /// Waiting for its debounce delay.
    Pending,
    Running,
    /// Last run produced no errors.
    Succeeded(Duration),
    /// Last run produced this many distinct errors.
    Failed(usize),
    /// The run could not be carried out at all.
    Crashed,
}

/// Paint `state` onto `indicator`.
pub fn show_state(indicator: &mut dyn StatusIndicator, label: &str, state: IndicatorState) {
    let (text, color) = match state {
        IndicatorState::Idle => (label.to_string(), IndicatorColor::Default),
        IndicatorState::Disabled => {
            indicator.set_tooltip(DISABLED_TOOLTIP);
            (format!("✕ {label}"), IndicatorColor::Muted)
        }
        IndicatorState::Pending => (format!("{label} ⧗"), IndicatorColor::Warning),
        IndicatorState::Running => (format!("{label} ⟳"), IndicatorColor::Warning),
        IndicatorState::Succeeded(elapsed) => (
            format!("{label} {:.2} s", elapsed.as_secs_f64()),
            IndicatorColor::Success,
        ),
        IndicatorState::Failed(count) => (format!("{label} ✖ {count}x"), IndicatorColor::Error),
        IndicatorState::Crashed => (format!("{label} ✖"), IndicatorColor::Error),
    };
    indicator.set_color(color);
    indicator.set_text(&text);
}
