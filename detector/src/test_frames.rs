//! Synthetic frames for unit tests.

use screen_transition_common::frame::Frame;
use screen_transition_common::region::Region;

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;

/// A uniform RGB frame.
pub fn solid(value: u8, ts: i64) -> Frame {
    Frame::new(
        vec![value; (WIDTH * HEIGHT * 3) as usize],
        WIDTH,
        HEIGHT,
        3,
        ts,
        0,
    )
    .unwrap()
}

/// Copy of `base` with every channel of the pixels in `patch` set to `value`.
pub fn with_patch(base: &Frame, patch: Region, value: u8, ts: i64) -> Frame {
    let mut pixels = base.pixels().to_vec();
    let stride = base.stride();
    for y in patch.y..patch.bottom() {
        for x in patch.x..patch.right() {
            let at = y as usize * stride + x as usize * 3;
            pixels[at..at + 3].fill(value);
        }
    }
    Frame::new(pixels, base.width(), base.height(), 3, ts, 0).unwrap()
}

/// Copy of `base` with one channel of one pixel set to `value`.
pub fn with_sample(base: &Frame, x: u32, y: u32, channel: usize, value: u8, ts: i64) -> Frame {
    let mut pixels = base.pixels().to_vec();
    pixels[y as usize * base.stride() + x as usize * 3 + channel] = value;
    Frame::new(pixels, base.width(), base.height(), 3, ts, 0).unwrap()
}
