use screen_transition_common::frame::Frame;
use screen_transition_common::region::Region;

use crate::error::TransitionError;

/// Outcome of comparing one incoming frame against the differ's reference.
#[derive(Debug, Clone)]
pub struct MotionResult {
    pub timestamp_ms: i64,
    pub motion: bool,
    /// Bounding box of the change in frame coordinates. `None` unless `motion`.
    pub region: Option<Region>,
    pub frame: Frame,
}

/// Frame comparison strategy.
///
/// A differ is seeded with a reference frame and then fed every incoming
/// frame, once each, in arrival order. It decides for itself when to move its
/// reference forward.
pub trait FrameDiffer: Send {
    fn diff(&mut self, frame: &Frame) -> Result<MotionResult, TransitionError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Builds a fresh differ for each measurement.
pub trait DifferFactory {
    fn create(&self, initial_frame: &Frame) -> Result<Box<dyn FrameDiffer>, TransitionError>;
}

impl<F> DifferFactory for F
where
    F: Fn(&Frame) -> Result<Box<dyn FrameDiffer>, TransitionError>,
{
    fn create(&self, initial_frame: &Frame) -> Result<Box<dyn FrameDiffer>, TransitionError> {
        self(initial_frame)
    }
}
