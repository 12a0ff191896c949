use screen_transition_common::frame::Frame;

/// What the actuator reports once a key-press is physically complete.
#[derive(Debug, Clone)]
pub struct PressResult {
    pub key: String,
    /// When the press completed, in Unix milliseconds.
    pub end_time_ms: i64,
    /// The frame that was current immediately before the press.
    pub frame_before: Frame,
}

#[derive(Debug, thiserror::Error)]
pub enum PressError {
    #[error("unknown key {0}")]
    UnknownKey(String),
    #[error("failed to send {key}: {reason}")]
    Send { key: String, reason: String },
}

/// Device input actuator. `press` returns once the action is complete.
pub trait KeyPresser {
    fn press(&mut self, key: &str) -> Result<PressResult, PressError>;
}

/// Stands in for a key-press that already happened during a recording.
#[derive(Debug, Clone)]
pub struct ReplayPress {
    key: String,
    end_time_ms: i64,
    frame_before: Frame,
}

impl ReplayPress {
    pub fn new(key: &str, end_time_ms: i64, frame_before: Frame) -> Self {
        Self {
            key: key.to_string(),
            end_time_ms,
            frame_before,
        }
    }
}

impl KeyPresser for ReplayPress {
    fn press(&mut self, key: &str) -> Result<PressResult, PressError> {
        if key != self.key {
            return Err(PressError::UnknownKey(key.to_string()));
        }
        Ok(PressResult {
            key: self.key.clone(),
            end_time_ms: self.end_time_ms,
            frame_before: self.frame_before.clone(),
        })
    }
}
