use screen_transition_common::frame::{Frame, FrameError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Pull-based supplier of frames in capture order.
///
/// `Ok(None)` means the stream has ended. Live sources block in `next_frame`
/// until the next frame arrives.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        (**self).next_frame()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Adapts an iterator of already-decoded frames.
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Frame>,
{
    pub fn new(frames: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: frames.into_iter(),
        }
    }
}

impl<I> FrameSource for IterSource<I>
where
    I: Iterator<Item = Frame>,
{
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        Ok(self.iter.next())
    }

    fn name(&self) -> &str {
        "iter"
    }
}

/// Replays a directory of captured images.
///
/// Each file is named `<captured_at_ms>.<extension>`. Files are served in
/// timestamp order; other files are ignored and a second file with the same
/// timestamp is skipped.
pub struct ImageDirSource {
    dir: PathBuf,
    entries: Vec<(i64, PathBuf)>,
    cursor: usize,
}

impl ImageDirSource {
    pub fn open(dir: &Path, extension: &str) -> Result<Self, FrameError> {
        let io_err = |e| FrameError::Io(dir.display().to_string(), e);
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if !matches_ext {
                continue;
            }
            match timestamp_from_path(&path) {
                Some(ts) => entries.push((ts, path)),
                None => debug!(
                    path = path.display().to_string(),
                    "file name is not a timestamp, ignoring"
                ),
            }
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        entries.dedup_by(|later, kept| {
            let duplicate = later.0 == kept.0;
            if duplicate {
                warn!(
                    ts = later.0,
                    skipped = later.1.display().to_string(),
                    kept = kept.1.display().to_string(),
                    "duplicate frame timestamp"
                );
            }
            duplicate
        });

        info!(
            dir = dir.display().to_string(),
            frames = entries.len(),
            first_ms = entries.first().map(|e| e.0),
            last_ms = entries.last().map(|e| e.0),
            "opened frame directory"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last frame captured strictly before `ts`, without moving the
    /// read position.
    pub fn frame_before(&self, ts: i64) -> Result<Option<Frame>, FrameError> {
        let idx = self.entries.partition_point(|(t, _)| *t < ts);
        if idx == 0 {
            return Ok(None);
        }
        let (captured_at_ms, path) = &self.entries[idx - 1];
        Frame::load(path, *captured_at_ms, (idx - 1) as u64).map(Some)
    }

    /// The earliest frame in the directory, without moving the read position.
    pub fn first_frame(&self) -> Result<Option<Frame>, FrameError> {
        match self.entries.first() {
            Some((captured_at_ms, path)) => Frame::load(path, *captured_at_ms, 0).map(Some),
            None => Ok(None),
        }
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let Some((captured_at_ms, path)) = self.entries.get(self.cursor) else {
            debug!(dir = self.dir.display().to_string(), "frame directory exhausted");
            return Ok(None);
        };
        let frame = Frame::load(path, *captured_at_ms, self.cursor as u64)?;
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn name(&self) -> &str {
        "image-dir"
    }
}

fn timestamp_from_path(path: &Path) -> Option<i64> {
    path.file_stem()?.to_str()?.parse().ok()
}
