//! 视频谱面抽取

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use log::info;

use super::error::CaptureApiError;
use crate::core::cancel::CancelToken;
use crate::core::error::CaptureError;
use crate::core::video::{SourceGuard, VideoSource};
use crate::frame_extractor::{CaptureExtractor, ExtractedRegion, ExtractionConfig, ExtractionResult};

pub const DEFAULT_PREVIEW_QUALITY: u8 = 80;

/// 运行完整抽取流程，返回按时间排序的裁剪区域
///
/// Fails with `NoContentFound` when no capture yields a region.
pub fn extract_regions<S: VideoSource + ?Sized>(
    source: &mut S,
    config: &ExtractionConfig,
    cancel: &CancelToken,
) -> Result<ExtractionResult, CaptureApiError> {
    config.validate()?;
    info!(
        "🎬 extract_regions: interval={}s, threshold={}, stable={}s",
        config.sampling_interval_sec,
        config.change_threshold,
        config.stability.stable_duration_sec
    );

    let result = CaptureExtractor::with_config(config.clone()).run(source, cancel)?;
    Ok(result)
}

/// 预览某一时刻的画面（JPEG），用于选择裁剪区域
pub fn preview_frame<S: VideoSource + ?Sized>(
    source: &mut S,
    time_sec: f64,
    quality: u8,
) -> Result<Vec<u8>, CaptureApiError> {
    let mut guard = SourceGuard::new(source);
    guard.seek_to_time(time_sec)?;
    let frame = guard.read_next_frame()?.ok_or_else(|| {
        CaptureError::SourceUnavailable(format!("no frame at {:.2}s", time_sec))
    })?;

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(&frame)
        .map_err(CaptureError::from)?;
    Ok(buffer.into_inner())
}

/// 逐张保存为 frame_0000.png …，供人工挑选后再合成 PDF
pub fn save_captures(
    regions: &[ExtractedRegion],
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, CaptureApiError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(CaptureError::from)?;

    let mut paths = Vec::with_capacity(regions.len());
    for (index, region) in regions.iter().enumerate() {
        let path = dir.join(format!("frame_{:04}.png", index));
        region.image.save(&path).map_err(CaptureError::from)?;
        paths.push(path);
    }
    info!("💾 saved {} captures to {}", paths.len(), dir.display());
    Ok(paths)
}
