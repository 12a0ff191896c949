use screen_transition_common::frame::{format_timestamp, Frame};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionStatus {
    /// Nothing changed within the timeout after the key-press.
    StartTimeout,
    /// The picture started changing but didn't settle within the timeout.
    StableTimeout,
    Complete,
}

/// Outcome of one transition measurement. All times are Unix milliseconds.
#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub key: Option<String>,
    /// On success the first frame of the stable period, otherwise the last
    /// frame examined.
    pub frame: Frame,
    pub status: TransitionStatus,
    pub press_time_ms: Option<i64>,
    pub animation_start_time_ms: Option<i64>,
    pub end_time_ms: Option<i64>,
}

/// Everything in a [`TransitionResult`] except the pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionSummary {
    pub key: Option<String>,
    pub status: TransitionStatus,
    pub frame_time_ms: i64,
    pub press_time_ms: Option<i64>,
    pub animation_start_time_ms: Option<i64>,
    pub end_time_ms: Option<i64>,
    pub duration_ms: Option<i64>,
    pub animation_duration_ms: Option<i64>,
}

impl TransitionResult {
    /// True only if the transition started and then settled.
    pub fn is_complete(&self) -> bool {
        self.status == TransitionStatus::Complete
    }

    /// Time from the key-press to the end of the animation.
    pub fn duration_ms(&self) -> Option<i64> {
        Some(self.end_time_ms? - self.press_time_ms?)
    }

    /// Time from the start to the end of the animation.
    pub fn animation_duration_ms(&self) -> Option<i64> {
        Some(self.end_time_ms? - self.animation_start_time_ms?)
    }

    pub fn summary(&self) -> TransitionSummary {
        TransitionSummary {
            key: self.key.clone(),
            status: self.status,
            frame_time_ms: self.frame.captured_at_ms,
            press_time_ms: self.press_time_ms,
            animation_start_time_ms: self.animation_start_time_ms,
            end_time_ms: self.end_time_ms,
            duration_ms: self.duration_ms(),
            animation_duration_ms: self.animation_duration_ms(),
        }
    }
}

impl fmt::Display for TransitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransitionStatus::StartTimeout => "START_TIMEOUT",
            TransitionStatus::StableTimeout => "STABLE_TIMEOUT",
            TransitionStatus::Complete => "COMPLETE",
        })
    }
}

fn time(ms: Option<i64>) -> String {
    ms.map(format_timestamp).unwrap_or_else(|| "None".into())
}

fn secs(ms: Option<i64>) -> String {
    ms.map(|ms| format!("{:.3}s", ms as f64 / 1000.0))
        .unwrap_or_else(|| "None".into())
}

impl fmt::Display for TransitionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TransitionResult(key={}, status={}, press_time={}, animation_start_time={}, \
             end_time={}, duration={}, animation_duration={})",
            self.key.as_deref().unwrap_or("None"),
            self.status,
            time(self.press_time_ms),
            time(self.animation_start_time_ms),
            time(self.end_time_ms),
            secs(self.duration_ms()),
            secs(self.animation_duration_ms()),
        )
    }
}
