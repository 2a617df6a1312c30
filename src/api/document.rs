//! PDF 合成

use std::path::Path;

use image::RgbImage;
use log::{info, warn};

use super::error::CaptureApiError;
use super::video::extract_regions;
use crate::core::cancel::CancelToken;
use crate::core::document::{render_document, PdfWriter};
use crate::core::error::{CaptureError, Result};
use crate::core::layout::{PageComposer, PageLayout};
use crate::core::video::VideoSource;
use crate::frame_extractor::{ExtractedRegion, ExtractionConfig};

fn render_pdf(images: &[RgbImage], layout: &PageLayout) -> Result<Vec<u8>> {
    let composer = PageComposer::new(layout.clone())?;
    let sizes: Vec<(u32, u32)> = images.iter().map(|img| img.dimensions()).collect();
    let pages = composer.compose(&sizes);
    render_document(PdfWriter::new(layout)?, &pages, images)
}

/// 将裁剪区域按时间顺序排版成 PDF
pub fn render_regions_pdf(
    regions: &[ExtractedRegion],
    layout: &PageLayout,
) -> std::result::Result<Vec<u8>, CaptureApiError> {
    let images: Vec<RgbImage> = regions.iter().map(|r| r.image.clone()).collect();
    Ok(render_pdf(&images, layout)?)
}

/// 视频 -> 谱面 PDF
pub fn extract_score_pdf<S: VideoSource + ?Sized>(
    source: &mut S,
    config: &ExtractionConfig,
    layout: &PageLayout,
    cancel: &CancelToken,
) -> std::result::Result<Vec<u8>, CaptureApiError> {
    layout.validate()?;
    let result = extract_regions(source, config, cancel)?;
    let images: Vec<RgbImage> = result.regions.into_iter().map(|r| r.image).collect();
    Ok(render_pdf(&images, layout)?)
}

/// 从人工挑选后的图片文件生成 PDF（按给定顺序）
///
/// Unreadable files are logged and skipped.
pub fn compose_pdf_from_files<P: AsRef<Path>>(
    paths: &[P],
    layout: &PageLayout,
) -> std::result::Result<Vec<u8>, CaptureApiError> {
    let images: Vec<RgbImage> = paths
        .iter()
        .filter_map(|path| {
            let path = path.as_ref();
            match image::open(path) {
                Ok(img) => Some(img.to_rgb8()),
                Err(e) => {
                    warn!("⚠️ skipping {}: {}", path.display(), e);
                    None
                }
            }
        })
        .collect();

    if images.is_empty() {
        return Err(CaptureError::EmptyDocument.into());
    }
    info!("📄 composing {} of {} images", images.len(), paths.len());
    Ok(render_pdf(&images, layout)?)
}
