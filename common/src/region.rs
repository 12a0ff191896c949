use serde::{Deserialize, Serialize};
use std::fmt;

/// An axis-aligned rectangle in pixel coordinates.
///
/// `right()` and `bottom()` are exclusive. A region with zero width or height
/// is empty. `Region::ALL` stands for "the whole frame, whatever its size" and
/// is narrowed to a concrete rectangle by [`Region::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Minimum width/height a detected change must reach to count as motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MinSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRegionError {
    #[error("region {region} has a negative size")]
    NegativeSize { region: Region },
    #[error("region {region} doesn't overlap the {frame_width}x{frame_height} frame")]
    NoOverlap {
        region: Region,
        frame_width: u32,
        frame_height: u32,
    },
    #[error(
        "mask is {mask_width}x{mask_height} but the region is {region_width}x{region_height}"
    )]
    MaskMismatch {
        mask_width: u32,
        mask_height: u32,
        region_width: u32,
        region_height: u32,
    },
}

impl Region {
    /// Sentinel for the entire frame. Its extents are wide enough to cover any
    /// real frame while keeping `right()`/`bottom()` representable.
    pub const ALL: Region = Region {
        x: i32::MIN / 2,
        y: i32::MIN / 2,
        width: i32::MAX,
        height: i32::MAX,
    };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a region from its exclusive extents. Inverted extents give an
    /// empty region rather than a negative size.
    pub fn from_extents(x: i32, y: i32, right: i32, bottom: i32) -> Self {
        Self {
            x,
            y,
            width: right.saturating_sub(x).max(0),
            height: bottom.saturating_sub(y).max(0),
        }
    }

    /// Tight box around the inclusive pixel range `[min_x, max_x] x [min_y, max_y]`.
    pub fn bounding_box(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self::from_extents(min_x, min_y, max_x + 1, max_y + 1)
    }

    /// The full extent of a `width` x `height` frame.
    pub fn of_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, to_coord(width), to_coord(height))
    }

    pub fn is_all(&self) -> bool {
        *self == Self::ALL
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// True if `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Region) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// The overlap of two regions, or `None` if they don't overlap.
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(Region::from_extents(x, y, right, bottom))
    }

    /// Shift a region expressed relative to `outer`'s origin into `outer`'s
    /// coordinate space.
    pub fn translate(&self, outer: &Region) -> Region {
        Region::new(
            self.x.saturating_add(outer.x),
            self.y.saturating_add(outer.y),
            self.width,
            self.height,
        )
    }

    /// Clip this region to a `frame_width` x `frame_height` frame.
    ///
    /// When `mask_size` is given the mask must have exactly the resolved
    /// region's dimensions.
    pub fn resolve(
        &self,
        frame_width: u32,
        frame_height: u32,
        mask_size: Option<(u32, u32)>,
    ) -> Result<Region, InvalidRegionError> {
        if self.width < 0 || self.height < 0 {
            return Err(InvalidRegionError::NegativeSize { region: *self });
        }

        let resolved = Region::of_frame(frame_width, frame_height)
            .intersect(self)
            .ok_or(InvalidRegionError::NoOverlap {
                region: *self,
                frame_width,
                frame_height,
            })?;

        if let Some((mask_width, mask_height)) = mask_size {
            let region_width = resolved.width as u32;
            let region_height = resolved.height as u32;
            if mask_width != region_width || mask_height != region_height {
                return Err(InvalidRegionError::MaskMismatch {
                    mask_width,
                    mask_height,
                    region_width,
                    region_height,
                });
            }
        }

        Ok(resolved)
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return write!(f, "Region.ALL");
        }
        write!(
            f,
            "Region(x={}, y={}, right={}, bottom={})",
            self.x,
            self.y,
            self.right(),
            self.bottom()
        )
    }
}

impl MinSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if `region` meets the minimum in both dimensions.
    pub fn admits(&self, region: &Region) -> bool {
        region.width >= to_coord(self.width) && region.height >= to_coord(self.height)
    }
}

fn to_coord(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}
