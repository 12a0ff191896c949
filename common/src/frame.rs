use chrono::{DateTime, TimeZone, Utc};
use image::DynamicImage;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A captured video frame with timestamp metadata.
///
/// Pixels are 8 bits per channel, row-major, channels interleaved. The buffer
/// is shared, so cloning a frame is cheap and a frame can never be modified
/// after capture.
#[derive(Clone)]
pub struct Frame {
    pixels: Arc<[u8]>,
    width: u32,
    height: u32,
    channels: u8,
    /// Capture time in Unix milliseconds.
    pub captured_at_ms: i64,
    /// Position of the frame in its source.
    pub seq: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame buffer is {got} bytes, expected {expected}")]
    BufferSize { got: usize, expected: usize },
    #[error("unsupported channel count {0}, expected 1 to 4")]
    UnsupportedChannels(u8),
    #[error(
        "frame {seq} is {got_width}x{got_height}x{got_channels}, \
         expected {width}x{height}x{channels}"
    )]
    Mismatch {
        seq: u64,
        width: u32,
        height: u32,
        channels: u8,
        got_width: u32,
        got_height: u32,
        got_channels: u8,
    },
    #[error("failed to decode frame {0}: {1}")]
    Decode(String, String),
    #[error("failed to read frames from {0}: {1}")]
    Io(String, std::io::Error),
}

impl Frame {
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        captured_at_ms: i64,
        seq: u64,
    ) -> Result<Self, FrameError> {
        if !(1..=4).contains(&channels) {
            return Err(FrameError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(FrameError::BufferSize {
                got: pixels.len(),
                expected,
            });
        }
        Ok(Self {
            pixels: pixels.into(),
            width,
            height,
            channels,
            captured_at_ms,
            seq,
        })
    }

    /// Convert a decoded image to an 8-bit RGB frame.
    pub fn from_image(img: &DynamicImage, captured_at_ms: i64, seq: u64) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self {
            pixels: rgb.into_raw().into(),
            width,
            height,
            channels: 3,
            captured_at_ms,
            seq,
        }
    }

    /// Decode an image file into a frame.
    pub fn load(path: &Path, captured_at_ms: i64, seq: u64) -> Result<Self, FrameError> {
        let img = image::open(path)
            .map_err(|e| FrameError::Decode(path.display().to_string(), e.to_string()))?;
        Ok(Self::from_image(&img, captured_at_ms, seq))
    }

    // -- Accessors --------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// One row of interleaved samples.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }

    pub fn stride(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    /// True if both frames share dimensions and channel layout.
    pub fn same_shape(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height && self.channels == other.channels
    }

    /// Fails with `FrameError::Mismatch` unless `other` has this frame's shape.
    pub fn check_shape(&self, other: &Frame) -> Result<(), FrameError> {
        if self.same_shape(other) {
            return Ok(());
        }
        Err(FrameError::Mismatch {
            seq: other.seq,
            width: self.width,
            height: self.height,
            channels: self.channels,
            got_width: other.width,
            got_height: other.height,
            got_channels: other.channels,
        })
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.captured_at_ms)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("captured_at_ms", &self.captured_at_ms)
            .field("seq", &self.seq)
            .finish()
    }
}

/// Render Unix milliseconds as a UTC timestamp, e.g. `2026-02-18T09:30:00.250Z`.
pub fn format_timestamp(ms: i64) -> String {
    let dt: DateTime<Utc> = Utc
        .timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH);
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
