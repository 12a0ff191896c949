pub mod strict;
pub mod traits;

pub use strict::{DiffOptions, StrictDiff, StrictDiffFactory};
pub use traits::{DifferFactory, FrameDiffer, MotionResult};
