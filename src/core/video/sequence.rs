use std::path::{Path, PathBuf};

use image::RgbImage;
use log::info;

use super::source::{Timeline, VideoSource};
use crate::core::error::{CaptureError, Result};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// In-memory frames played back at a fixed rate.
pub struct MemorySource {
    frames: Vec<RgbImage>,
    timeline: Timeline,
    closed: bool,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Result<Self> {
        let timeline = Timeline::new(frames.len(), fps)?;
        Ok(Self {
            frames,
            timeline,
            closed: false,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(CaptureError::SourceUnavailable("source already closed".into()));
        }
        Ok(())
    }
}

impl VideoSource for MemorySource {
    fn frame_rate(&self) -> Option<f64> {
        Some(self.timeline.fps())
    }

    fn duration(&self) -> f64 {
        self.timeline.duration()
    }

    fn position(&self) -> f64 {
        self.timeline.position()
    }

    fn seek_to_time(&mut self, seconds: f64) -> Result<()> {
        self.ensure_open()?;
        self.timeline.seek(seconds)
    }

    fn read_next_frame(&mut self) -> Result<Option<RgbImage>> {
        self.ensure_open()?;
        Ok(self.timeline.advance().map(|i| self.frames[i].clone()))
    }

    fn skip_frame(&mut self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.timeline.advance().is_some())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// 图片序列目录（按文件名排序）当作固定帧率的视频
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    timeline: Timeline,
    closed: bool,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>, fps: f64) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            CaptureError::SourceUnavailable(format!("cannot read {}: {}", dir.display(), e))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_lowercase();
                FRAME_EXTENSIONS.contains(&ext.as_str())
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(CaptureError::SourceUnavailable(format!(
                "no frame images in {}",
                dir.display()
            )));
        }

        let timeline = Timeline::new(paths.len(), fps)?;
        info!(
            "🎞️ ImageSequenceSource: {} frames at {} fps from {}",
            paths.len(),
            fps,
            dir.display()
        );

        Ok(Self {
            paths,
            timeline,
            closed: false,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.paths.len()
    }
}

impl VideoSource for ImageSequenceSource {
    fn frame_rate(&self) -> Option<f64> {
        Some(self.timeline.fps())
    }

    fn duration(&self) -> f64 {
        self.timeline.duration()
    }

    fn position(&self) -> f64 {
        self.timeline.position()
    }

    fn seek_to_time(&mut self, seconds: f64) -> Result<()> {
        if self.closed {
            return Err(CaptureError::SourceUnavailable("source already closed".into()));
        }
        self.timeline.seek(seconds)
    }

    fn read_next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.closed {
            return Err(CaptureError::SourceUnavailable("source already closed".into()));
        }
        let Some(index) = self.timeline.advance() else {
            return Ok(None);
        };
        let path = &self.paths[index];
        let frame = image::open(path).map_err(|e| {
            CaptureError::SourceUnavailable(format!("cannot decode {}: {}", path.display(), e))
        })?;
        Ok(Some(frame.to_rgb8()))
    }

    // 跳帧不解码
    fn skip_frame(&mut self) -> Result<bool> {
        if self.closed {
            return Err(CaptureError::SourceUnavailable("source already closed".into()));
        }
        Ok(self.timeline.advance().is_some())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(value: u8) -> RgbImage {
        RgbImage::from_pixel(8, 6, Rgb([value, value, value]))
    }

    #[test]
    fn test_memory_source_reads_in_order() {
        let mut source = MemorySource::new(vec![solid(0), solid(1), solid(2)], 1.0).unwrap();
        assert_eq!(source.duration(), 3.0);
        assert_eq!(source.position(), 0.0);

        let first = source.read_next_frame().unwrap().unwrap();
        assert_eq!(first.get_pixel(0, 0)[0], 0);
        assert!(source.skip_frame().unwrap());
        assert_eq!(source.position(), 2.0);

        let third = source.read_next_frame().unwrap().unwrap();
        assert_eq!(third.get_pixel(0, 0)[0], 2);
        assert!(source.read_next_frame().unwrap().is_none());
    }

    #[test]
    fn test_memory_source_refuses_reads_after_close() {
        let mut source = MemorySource::new(vec![solid(0)], 30.0).unwrap();
        source.close();
        assert!(source.is_closed());
        assert!(matches!(
            source.read_next_frame(),
            Err(CaptureError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_image_sequence_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        solid(20).save(dir.path().join("frame_0002.png")).unwrap();
        solid(10).save(dir.path().join("frame_0001.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), 2.0).unwrap();
        assert_eq!(source.frame_count(), 2);
        assert_eq!(source.duration(), 1.0);

        let first = source.read_next_frame().unwrap().unwrap();
        assert_eq!(first.get_pixel(0, 0)[0], 10);
        let second = source.read_next_frame().unwrap().unwrap();
        assert_eq!(second.get_pixel(0, 0)[0], 20);
    }

    #[test]
    fn test_image_sequence_missing_dir() {
        let result = ImageSequenceSource::open("/definitely/not/here", 30.0);
        assert!(matches!(result, Err(CaptureError::SourceUnavailable(_))));
    }

    #[test]
    fn test_image_sequence_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageSequenceSource::open(dir.path(), 30.0);
        assert!(matches!(result, Err(CaptureError::SourceUnavailable(_))));
    }
}
