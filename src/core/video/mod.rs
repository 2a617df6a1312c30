pub mod sequence;
pub mod source;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

use std::path::Path;

use log::info;

use crate::core::error::{CaptureError, Result};

#[cfg(feature = "ffmpeg")]
pub use self::ffmpeg::FfmpegSource;
pub use sequence::{ImageSequenceSource, MemorySource};
pub use source::{SourceGuard, VideoSource};

/// 根据路径选择视频源：目录 -> 图片序列；文件 -> FFmpeg
///
/// `fps` is only used for image sequences, which carry no timing of their own.
pub fn open_source(path: impl AsRef<Path>, fps: f64) -> Result<Box<dyn VideoSource>> {
    let path = path.as_ref();
    if path.is_dir() {
        info!("📂 Opening image sequence: {}", path.display());
        return Ok(Box::new(ImageSequenceSource::open(path, fps)?));
    }
    if !path.exists() {
        return Err(CaptureError::SourceUnavailable(format!(
            "{} does not exist",
            path.display()
        )));
    }
    open_video_file(path)
}

#[cfg(feature = "ffmpeg")]
fn open_video_file(path: &Path) -> Result<Box<dyn VideoSource>> {
    Ok(Box::new(FfmpegSource::open(path)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video_file(path: &Path) -> Result<Box<dyn VideoSource>> {
    Err(CaptureError::SourceUnavailable(format!(
        "decoding {} requires the `ffmpeg` feature; pass a directory of frames instead",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_path() {
        let result = open_source("/no/such/video.mp4", 30.0);
        assert!(matches!(result, Err(CaptureError::SourceUnavailable(_))));
    }

    #[test]
    fn test_open_directory_as_sequence() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::new(4, 4)
            .save(dir.path().join("0001.png"))
            .unwrap();

        let source = open_source(dir.path(), 10.0).unwrap();
        assert_eq!(source.frame_rate(), Some(10.0));
        assert!((source.duration() - 0.1).abs() < 1e-9);
    }
}
