use crate::timeline::FrameTime;

/// Result alias that carries the custom [`RetimeError`] type.
pub type Result<T> = std::result::Result<T, RetimeError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum RetimeError {
    /// Free-form failure reported by a timeline store implementation.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Timeline or config files that could not be (de)serialized.
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    /// The timeline holds no keyframes at all, so there is nothing to retime.
    #[error("timeline has no keyframes")]
    NoKeyframes,
    /// Selected range that is not finite or ends before it starts.
    #[error("invalid range {start}..{end}: end must not precede start")]
    InvalidRange { start: FrameTime, end: FrameTime },
    /// Retime magnitude that could break keyframe ordering.
    #[error("invalid retime magnitude {0}")]
    InvalidMagnitude(f64),
    /// Edit addressed to a time that holds no keyframe.
    #[error("no keyframe at time {0}")]
    MissingKeyframe(FrameTime),
    /// A write would have placed two keyframes on the same time.
    #[error("moving keyframe {from} to {to} collides with an existing keyframe")]
    Collision { from: FrameTime, to: FrameTime },
    /// Tool button label that the config does not define.
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),
}

impl RetimeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for RetimeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for RetimeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_message_names_both_times() {
        let err = RetimeError::Collision { from: 10.0, to: 7.0 };
        let text = err.to_string();
        assert!(text.contains("10"));
        assert!(text.contains("7"));
    }

    #[test]
    fn io_errors_convert() {
        fn fails() -> Result<()> {
            Err::<(), _>(std::io::Error::other("boom"))?;
            Ok(())
        }

        let err = fails().unwrap_err();
        assert!(matches!(err, RetimeError::Io(_)));
        assert!(err.to_string().contains("boom"));
    }
}
