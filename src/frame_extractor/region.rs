use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::dilate;
use log::debug;
use serde::{Deserialize, Serialize};

use super::frame::{CapturedFrame, ExtractedRegion};

/// 轮廓来源
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourSource {
    /// Canny edges, robust against uneven lighting.
    Edges,
    /// Pixels brighter than `level` are foreground.
    Threshold { level: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub contour_source: ContourSource,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Dilation radius applied to edges so broken outlines close up.
    pub edge_dilation: u8,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            contour_source: ContourSource::Edges,
            canny_low: 50.0,
            canny_high: 150.0,
            edge_dilation: 1,
            min_width: 50,
            min_height: 50,
        }
    }
}

impl RegionConfig {
    /// Contours straight from the grayscale frame (every non-black pixel).
    pub fn raw_threshold() -> Self {
        Self {
            contour_source: ContourSource::Threshold { level: 0 },
            ..Default::default()
        }
    }
}

/// 找到最大外轮廓并按其外接矩形裁剪
pub struct RegionExtractor {
    config: RegionConfig,
}

impl RegionExtractor {
    pub fn new(config: RegionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    pub fn extract(&self, frame: &CapturedFrame) -> Option<ExtractedRegion> {
        let (x, y, w, h) = self.locate(&frame.image)?;
        Some(ExtractedRegion {
            image: imageops::crop_imm(&frame.image, x, y, w, h).to_image(),
            timestamp: frame.timestamp,
            bounds: (x, y, w, h),
        })
    }

    /// Bounding rectangle `(x, y, width, height)` of the dominant content.
    pub fn locate(&self, image: &RgbImage) -> Option<(u32, u32, u32, u32)> {
        let binary = self.binarize(&imageops::grayscale(image));
        let contours = find_contours::<i32>(&binary);

        let largest = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| !c.points.is_empty())
            .max_by(|a, b| enclosed_area(a).total_cmp(&enclosed_area(b)))?;

        let (x, y, w, h) = bounding_rect(largest);
        if w < self.config.min_width || h < self.config.min_height {
            debug!(
                "region {}x{} below minimum {}x{}, rejected",
                w, h, self.config.min_width, self.config.min_height
            );
            return None;
        }
        Some((x, y, w, h))
    }

    fn binarize(&self, gray: &GrayImage) -> GrayImage {
        match self.config.contour_source {
            ContourSource::Edges => {
                let edges = canny(gray, self.config.canny_low, self.config.canny_high);
                if self.config.edge_dilation == 0 {
                    edges
                } else {
                    dilate(&edges, Norm::LInf, self.config.edge_dilation)
                }
            }
            ContourSource::Threshold { level } => {
                let mut binary = gray.clone();
                for pixel in binary.pixels_mut() {
                    *pixel = Luma([if pixel[0] > level { 255 } else { 0 }]);
                }
                binary
            }
        }
    }
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self::new(RegionConfig::default())
    }
}

// Shoelace formula over the contour polygon.
fn enclosed_area(contour: &Contour<i32>) -> f64 {
    let points = &contour.points;
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y)
        })
        .sum();
    twice.unsigned_abs() as f64 / 2.0
}

fn bounding_rect(contour: &Contour<i32>) -> (u32, u32, u32, u32) {
    let xs = contour.points.iter().map(|p| p.x);
    let ys = contour.points.iter().map(|p| p.y);
    let min_x = xs.clone().min().unwrap_or(0).max(0);
    let max_x = xs.max().unwrap_or(0).max(0);
    let min_y = ys.clone().min().unwrap_or(0).max(0);
    let max_y = ys.max().unwrap_or(0).max(0);
    (
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    )
}
