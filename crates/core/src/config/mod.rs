use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{plan::RetimePolicy, Result};

/// Top-level configuration structure for the retiming tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Spacings, in frames, offered as absolute retime buttons.
    pub absolute_presets: Vec<f64>,
    /// Signed deltas, in frames, offered as incremental retime buttons.
    pub incremental_presets: Vec<f64>,
    /// Initial state of the "move to next frame" toggle.
    pub move_to_next: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            absolute_presets: (1..=6).map(f64::from).collect(),
            incremental_presets: vec![-2.0, -1.0, 1.0, 2.0],
            move_to_next: false,
        }
    }
}

impl ToolConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every preset against the retime policy rules.
    pub fn validate(&self) -> Result<()> {
        for &spacing in &self.absolute_presets {
            RetimePolicy::Absolute(spacing).validate()?;
        }
        for &delta in &self.incremental_presets {
            RetimePolicy::Incremental(delta).validate()?;
        }
        Ok(())
    }
}
