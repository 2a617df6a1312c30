//! 文档输出

pub mod pdf;

use image::RgbImage;
use log::{info, warn};

use crate::core::error::{CaptureError, Result};
use crate::core::layout::Page;

pub use pdf::PdfWriter;

/// Sink for composed pages. Coordinates are layout units with a top-left
/// origin.
pub trait DocumentWriter {
    fn new_page(&mut self) -> Result<()>;

    fn place_image(
        &mut self,
        image: &RgbImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()>;

    fn finalize(self) -> Result<Vec<u8>>
    where
        Self: Sized;
}

/// Drives `writer` through the composed pages. Placements that fail are
/// logged and skipped.
pub fn render_document<W: DocumentWriter>(
    mut writer: W,
    pages: &[Page],
    images: &[RgbImage],
) -> Result<Vec<u8>> {
    let mut placed = 0usize;

    for (page_no, page) in pages.iter().enumerate() {
        writer.new_page()?;
        for placement in &page.placements {
            let Some(image) = images.get(placement.image_index) else {
                warn!(
                    "⚠️ page {}: image #{} does not exist, skipped",
                    page_no + 1,
                    placement.image_index
                );
                continue;
            };
            match writer.place_image(
                image,
                placement.x,
                placement.y,
                placement.width,
                placement.height,
            ) {
                Ok(()) => placed += 1,
                Err(e) => warn!(
                    "⚠️ page {}: image #{} not placed: {}",
                    page_no + 1,
                    placement.image_index,
                    e
                ),
            }
        }
    }

    if placed == 0 {
        return Err(CaptureError::EmptyDocument);
    }

    info!("📄 rendered {} images on {} pages", placed, pages.len());
    writer.finalize()
}
