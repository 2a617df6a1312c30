use std::ops::{Deref, DerefMut};

use image::RgbImage;
use log::debug;

use crate::core::error::{CaptureError, Result};

/// 可 seek 的解码视频流
///
/// `open` lives on each implementation as an associated constructor so the
/// trait stays object-safe.
pub trait VideoSource {
    /// Frames per second as reported by the container, if any.
    fn frame_rate(&self) -> Option<f64>;

    /// Total duration in seconds; non-finite or non-positive means unknown.
    fn duration(&self) -> f64;

    /// Timestamp (seconds) of the frame the next read returns.
    fn position(&self) -> f64;

    fn seek_to_time(&mut self, seconds: f64) -> Result<()>;

    /// `Ok(None)` at end of stream.
    fn read_next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Decode and discard one frame. Returns `false` at end of stream.
    fn skip_frame(&mut self) -> Result<bool> {
        Ok(self.read_next_frame()?.is_some())
    }

    /// Release the underlying handle. Must be idempotent.
    fn close(&mut self) {}
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn frame_rate(&self) -> Option<f64> {
        (**self).frame_rate()
    }

    fn duration(&self) -> f64 {
        (**self).duration()
    }

    fn position(&self) -> f64 {
        (**self).position()
    }

    fn seek_to_time(&mut self, seconds: f64) -> Result<()> {
        (**self).seek_to_time(seconds)
    }

    fn read_next_frame(&mut self) -> Result<Option<RgbImage>> {
        (**self).read_next_frame()
    }

    fn skip_frame(&mut self) -> Result<bool> {
        (**self).skip_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Borrows a source for one run and closes it when dropped, whichever way
/// the run ends.
pub struct SourceGuard<'a, S: VideoSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: VideoSource + ?Sized> SourceGuard<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        Self { source }
    }
}

impl<S: VideoSource + ?Sized> Deref for SourceGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: VideoSource + ?Sized> DerefMut for SourceGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: VideoSource + ?Sized> Drop for SourceGuard<'_, S> {
    fn drop(&mut self) {
        debug!("🗑️ SourceGuard: releasing video source");
        self.source.close();
    }
}

/// Frame-index bookkeeping shared by the frame-list sources.
#[derive(Debug, Clone)]
pub(crate) struct Timeline {
    frame_count: usize,
    fps: f64,
    index: usize,
}

impl Timeline {
    pub(crate) fn new(frame_count: usize, fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(CaptureError::SourceUnavailable(format!(
                "invalid frame rate: {}",
                fps
            )));
        }
        Ok(Self {
            frame_count,
            fps,
            index: 0,
        })
    }

    pub(crate) fn fps(&self) -> f64 {
        self.fps
    }

    pub(crate) fn duration(&self) -> f64 {
        self.frame_count as f64 / self.fps
    }

    pub(crate) fn position(&self) -> f64 {
        self.index as f64 / self.fps
    }

    pub(crate) fn seek(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(CaptureError::SourceUnavailable(format!(
                "cannot seek to {}s",
                seconds
            )));
        }
        let target = (seconds * self.fps).round() as usize;
        self.index = target.min(self.frame_count);
        Ok(())
    }

    /// Returns the current index and advances, or `None` at end of stream.
    pub(crate) fn advance(&mut self) -> Option<usize> {
        if self.index >= self.frame_count {
            return None;
        }
        let current = self.index;
        self.index += 1;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingSource {
        closes: Rc<Cell<u32>>,
    }

    impl VideoSource for CountingSource {
        fn frame_rate(&self) -> Option<f64> {
            None
        }

        fn duration(&self) -> f64 {
            0.0
        }

        fn position(&self) -> f64 {
            0.0
        }

        fn seek_to_time(&mut self, _seconds: f64) -> Result<()> {
            Err(CaptureError::SourceUnavailable("unseekable".into()))
        }

        fn read_next_frame(&mut self) -> Result<Option<RgbImage>> {
            Ok(None)
        }

        fn close(&mut self) {
            self.closes.set(self.closes.get() + 1);
        }
    }

    #[test]
    fn test_guard_closes_on_error_path() {
        let closes = Rc::new(Cell::new(0));
        let mut source = CountingSource {
            closes: closes.clone(),
        };

        let run = |src: &mut CountingSource| -> Result<()> {
            let mut guard = SourceGuard::new(src);
            guard.seek_to_time(1.0)?;
            Ok(())
        };

        assert!(run(&mut source).is_err());
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_timeline_seek_and_advance() {
        let mut timeline = Timeline::new(10, 2.0).unwrap();
        assert_eq!(timeline.duration(), 5.0);

        timeline.seek(1.5).unwrap();
        assert_eq!(timeline.position(), 1.5);
        assert_eq!(timeline.advance(), Some(3));

        timeline.seek(100.0).unwrap();
        assert_eq!(timeline.advance(), None);
        assert!(timeline.seek(-1.0).is_err());
    }

    #[test]
    fn test_timeline_rejects_zero_fps() {
        assert!(Timeline::new(3, 0.0).is_err());
    }
}
