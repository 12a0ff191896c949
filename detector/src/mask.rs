use image::GrayImage;
use screen_transition_common::frame::FrameError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::TransitionError;

/// Per-pixel inclusion filter, aligned to a resolved region rather than the
/// full frame. Non-zero pixels take part in the comparison.
#[derive(Clone)]
pub struct Mask {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl Mask {
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                got: data.len(),
                expected,
            });
        }
        Ok(Self {
            data: data.into(),
            width,
            height,
        })
    }

    pub fn from_luma(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.as_raw().as_slice().into(),
            width,
            height,
        }
    }

    /// Load a black & white image. Colour images are converted to luma first
    /// and pixels whose luma is non-zero are included. Near-black colours
    /// such as `(1, 0, 0)` round down to zero and are excluded.
    pub fn load(path: &Path) -> Result<Self, TransitionError> {
        let img = image::open(path)
            .map_err(|e| TransitionError::MaskLoad(path.display().to_string(), e.to_string()))?;
        Ok(Self::from_luma(&img.to_luma8()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.data[start..start + self.width as usize]
    }

    /// True if the region-local pixel `(x, y)` is selected.
    pub fn includes(&self, x: u32, y: u32) -> bool {
        self.row(y)[x as usize] != 0
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mask")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
