use screen_transition_common::config::ConfigError;
use screen_transition_common::frame::FrameError;
use screen_transition_common::region::InvalidRegionError;

use crate::press::PressError;

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("invalid region: {0}")]
    InvalidRegion(#[from] InvalidRegionError),
    #[error("failed to load mask {0}: {1}")]
    MaskLoad(String, String),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("key press failed: {0}")]
    Press(#[from] PressError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("frame source ended before the transition finished")]
    FrameSourceExhausted,
    #[error("state machine is not waiting for a transition")]
    NotArmed,
}
