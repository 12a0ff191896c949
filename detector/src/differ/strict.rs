use screen_transition_common::config::TransitionConfig;
use screen_transition_common::frame::Frame;
use screen_transition_common::region::{InvalidRegionError, MinSize, Region};
use tracing::debug;

use super::traits::{DifferFactory, FrameDiffer, MotionResult};
use crate::error::TransitionError;
use crate::mask::Mask;

/// Any pixel differing by more than this is motion on its own.
const MOTION_THRESHOLD: u8 = 20;
/// Below `MOTION_THRESHOLD`, pixels differing by more than this are "small
/// diffs" and only count as motion in bulk.
const SMALL_DIFF_THRESHOLD: u8 = 5;
/// Small diffs count as motion when more than this many pixels have one.
const SMALL_DIFF_MIN_PIXELS: usize = 50;

/// Where to look and what to ignore.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    pub region: Region,
    /// Sized like `region` once clipped to the frame.
    pub mask: Option<Mask>,
    pub min_size: Option<MinSize>,
}

impl DiffOptions {
    /// Checks that don't need to know the frame size.
    ///
    /// Clipping to the frame only shrinks the region, so a mask bigger than
    /// the region in either dimension can never match it.
    pub fn check(&self) -> Result<(), InvalidRegionError> {
        if self.region.width < 0 || self.region.height < 0 {
            return Err(InvalidRegionError::NegativeSize {
                region: self.region,
            });
        }
        if let Some(mask) = &self.mask {
            let region_width = u32::try_from(self.region.width).unwrap_or(u32::MAX);
            let region_height = u32::try_from(self.region.height).unwrap_or(u32::MAX);
            if mask.width() > region_width || mask.height() > region_height {
                return Err(InvalidRegionError::MaskMismatch {
                    mask_width: mask.width(),
                    mask_height: mask.height(),
                    region_width,
                    region_height,
                });
            }
        }
        Ok(())
    }
}

/// Tiered absolute-difference comparison.
///
/// Algorithm:
/// 1. Crop the reference and the new frame to the region
/// 2. Take the absolute difference of every sample; a pixel's difference is
///    the largest of its channel differences
/// 3. Drop pixels outside the mask
/// 4. If any pixel differs by more than 20, that's motion, bounded by those
///    pixels. Otherwise more than 50 pixels differing by more than 5 is
///    motion, bounded by those pixels
/// 5. A change smaller than `min_size` in either dimension isn't motion
///
/// The reference only moves forward on motion, so slow continuous animation
/// is compared against the last frame that changed rather than a stale one.
pub struct StrictDiff {
    reference: Frame,
    /// Region clipped to the frame.
    region: Region,
    mask: Option<Mask>,
    min_size: Option<MinSize>,
}

/// Running bounding box over region-local pixel coordinates.
struct BoxAccumulator {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    count: usize,
}

struct DiffStats {
    max_diff: u8,
    over_motion: BoxAccumulator,
    over_small: BoxAccumulator,
}

impl StrictDiff {
    pub fn new(initial_frame: Frame, options: &DiffOptions) -> Result<Self, TransitionError> {
        let mask_size = options.mask.as_ref().map(Mask::size);
        let region = options.region.resolve(
            initial_frame.width(),
            initial_frame.height(),
            mask_size,
        )?;
        Ok(Self {
            reference: initial_frame,
            region,
            mask: options.mask.clone(),
            min_size: options.min_size,
        })
    }

    pub fn reference(&self) -> &Frame {
        &self.reference
    }

    pub fn region(&self) -> Region {
        self.region
    }

    fn scan(&self, frame: &Frame) -> DiffStats {
        let channels = frame.channels() as usize;
        let start = self.region.x as usize * channels;
        let end = self.region.right() as usize * channels;

        let mut stats = DiffStats {
            max_diff: 0,
            over_motion: BoxAccumulator::new(),
            over_small: BoxAccumulator::new(),
        };

        for local_y in 0..self.region.height {
            let y = (self.region.y + local_y) as u32;
            let before = &self.reference.row(y)[start..end];
            let after = &frame.row(y)[start..end];
            let mask_row = self.mask.as_ref().map(|m| m.row(local_y as u32));

            let pixels = before.chunks_exact(channels).zip(after.chunks_exact(channels));
            for (local_x, (a, b)) in pixels.enumerate() {
                if mask_row.is_some_and(|row| row[local_x] == 0) {
                    continue;
                }
                let diff = a
                    .iter()
                    .zip(b)
                    .map(|(p, q)| p.abs_diff(*q))
                    .max()
                    .unwrap_or(0);
                if diff == 0 {
                    continue;
                }
                stats.max_diff = stats.max_diff.max(diff);
                if diff > MOTION_THRESHOLD {
                    stats.over_motion.add(local_x as i32, local_y);
                }
                if diff > SMALL_DIFF_THRESHOLD {
                    stats.over_small.add(local_x as i32, local_y);
                }
            }
        }
        stats
    }
}

impl FrameDiffer for StrictDiff {
    fn diff(&mut self, frame: &Frame) -> Result<MotionResult, TransitionError> {
        self.reference.check_shape(frame)?;

        let stats = self.scan(frame);
        let local_box = if stats.max_diff > MOTION_THRESHOLD {
            stats.over_motion.region()
        } else if stats.over_small.count > SMALL_DIFF_MIN_PIXELS {
            stats.over_small.region()
        } else {
            None
        };
        let changed = local_box.map(|b| b.translate(&self.region));

        let motion = match (changed, self.min_size) {
            (Some(changed), Some(min)) => min.admits(&changed),
            (Some(_), None) => true,
            (None, _) => false,
        };

        debug!(
            ts = frame.captured_at_ms,
            max_diff = stats.max_diff,
            small_diffs = stats.over_small.count,
            changed = changed.map(|r| r.to_string()),
            motion,
            "strict diff"
        );

        if motion {
            self.reference = frame.clone();
        }

        Ok(MotionResult {
            timestamp_ms: frame.captured_at_ms,
            motion,
            region: if motion { changed } else { None },
            frame: frame.clone(),
        })
    }

    fn name(&self) -> &str {
        "strict"
    }
}

impl BoxAccumulator {
    fn new() -> Self {
        Self {
            min_x: i32::MAX,
            min_y: i32::MAX,
            max_x: i32::MIN,
            max_y: i32::MIN,
            count: 0,
        }
    }

    fn add(&mut self, x: i32, y: i32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.count += 1;
    }

    fn region(&self) -> Option<Region> {
        if self.count == 0 {
            return None;
        }
        Some(Region::bounding_box(
            self.min_x, self.min_y, self.max_x, self.max_y,
        ))
    }
}

/// Creates a [`StrictDiff`] per measurement with fixed options.
#[derive(Debug, Clone, Default)]
pub struct StrictDiffFactory {
    options: DiffOptions,
}

impl StrictDiffFactory {
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Takes region and min_size from the config and loads its mask file.
    ///
    /// Fails early on a region or mask that can't suit any frame; the rest is
    /// checked against the first frame in [`DifferFactory::create`].
    pub fn from_config(config: &TransitionConfig) -> Result<Self, TransitionError> {
        let mask = config.mask.as_deref().map(Mask::load).transpose()?;
        let options = DiffOptions {
            region: config.region(),
            mask,
            min_size: config.min_size,
        };
        options.check()?;
        Ok(Self::new(options))
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }
}

impl DifferFactory for StrictDiffFactory {
    fn create(&self, initial_frame: &Frame) -> Result<Box<dyn FrameDiffer>, TransitionError> {
        Ok(Box::new(StrictDiff::new(
            initial_frame.clone(),
            &self.options,
        )?))
    }
}
