//! Frame-accurate detection of screen transitions.
//!
//! After a key-press, [`transition::press_and_wait`] waits for the picture to
//! start changing and then for it to stay still for a while, reporting when
//! each happened. Frame comparison is pluggable through
//! [`differ::FrameDiffer`]; [`differ::strict::StrictDiff`] is the default.

pub mod differ;
pub mod error;
pub mod mask;
pub mod press;
pub mod source;
pub mod transition;

#[cfg(test)]
mod test_frames;

pub use error::TransitionError;
pub use screen_transition_common::frame::Frame;
pub use screen_transition_common::region::{MinSize, Region};
