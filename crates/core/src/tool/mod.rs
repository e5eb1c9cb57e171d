//! Application-owned handle for the retiming tool panel.
//!
//! The host UI keeps one [`RetimeTool`] alive and drives it through explicit
//! `show`/`hide` calls; buttons map to retime requests and failures are turned
//! into a user-facing notification.

use crate::{
    config::ToolConfig,
    engine::{retime, RetimeReport, RetimeRequest},
    store::TimelineStore,
    Result, RetimeError,
};

/// Notification shown to the user when a retime fails. Details go to the log.
pub const FAILURE_NOTIFICATION: &str = "Retiming failed. See the log for details.";

/// A retime button as laid out on the tool panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetButton {
    pub label: String,
    pub magnitude: f64,
    pub incremental: bool,
}

impl PresetButton {
    pub fn absolute(spacing: f64) -> Self {
        Self {
            label: format!("{}f", format_frames(spacing)),
            magnitude: spacing,
            incremental: false,
        }
    }

    pub fn incremental(delta: f64) -> Self {
        let sign = if delta > 0.0 { "+" } else { "" };
        Self {
            label: format!("{sign}{}f", format_frames(delta)),
            magnitude: delta,
            incremental: true,
        }
    }

    pub fn request(&self, move_to_next: bool) -> RetimeRequest {
        RetimeRequest {
            magnitude: self.magnitude,
            incremental: self.incremental,
            move_to_next,
        }
    }
}

fn format_frames(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

#[derive(Debug)]
pub struct RetimeTool {
    config: ToolConfig,
    buttons: Vec<PresetButton>,
    move_to_next: bool,
    visible: bool,
    last_notification: Option<String>,
}

impl RetimeTool {
    pub fn new(config: ToolConfig) -> Self {
        let buttons = build_buttons(&config);
        let move_to_next = config.move_to_next;
        Self {
            config,
            buttons,
            move_to_next,
            visible: false,
            last_notification: None,
        }
    }

    /// Shows the panel. Showing an already visible panel rebuilds it from
    /// the config, which also resets the toggle.
    pub fn show(&mut self) {
        if self.visible {
            tracing::debug!("rebuilding visible retime tool");
        }
        self.buttons = build_buttons(&self.config);
        self.move_to_next = self.config.move_to_next;
        self.last_notification = None;
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn buttons(&self) -> &[PresetButton] {
        &self.buttons
    }

    pub fn button(&self, label: &str) -> Option<&PresetButton> {
        self.buttons.iter().find(|button| button.label == label)
    }

    pub fn move_to_next(&self) -> bool {
        self.move_to_next
    }

    pub fn set_move_to_next(&mut self, value: bool) {
        self.move_to_next = value;
    }

    /// Message to surface after the last failed retime, cleared by the next
    /// successful one.
    pub fn last_notification(&self) -> Option<&str> {
        self.last_notification.as_deref()
    }

    /// Runs the button labelled `label` against `store`.
    pub fn press<S: TimelineStore + ?Sized>(&mut self, store: &mut S, label: &str) -> Result<RetimeReport> {
        if !self.visible {
            return Err(RetimeError::msg("retime tool is not shown"));
        }
        let request = self
            .button(label)
            .ok_or_else(|| RetimeError::UnknownPreset(label.to_string()))?
            .request(self.move_to_next);
        self.run(store, &request)
    }

    /// Runs an arbitrary request with the same failure handling as a button.
    pub fn run<S: TimelineStore + ?Sized>(
        &mut self,
        store: &mut S,
        request: &RetimeRequest,
    ) -> Result<RetimeReport> {
        match retime(store, request) {
            Ok(report) => {
                self.last_notification = None;
                Ok(report)
            }
            Err(err) => {
                self.last_notification = Some(FAILURE_NOTIFICATION.to_string());
                Err(err)
            }
        }
    }
}

impl Default for RetimeTool {
    fn default() -> Self {
        Self::new(ToolConfig::default())
    }
}

fn build_buttons(config: &ToolConfig) -> Vec<PresetButton> {
    config
        .absolute_presets
        .iter()
        .copied()
        .map(PresetButton::absolute)
        .chain(config.incremental_presets.iter().copied().map(PresetButton::incremental))
        .collect()
}
