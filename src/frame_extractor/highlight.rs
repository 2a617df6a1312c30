use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, dilate};
use serde::{Deserialize, Serialize};

use crate::core::error::{CaptureError, Result};

const MASK_ON: u8 = 255;
const BACKGROUND: u8 = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enabled: bool,
    /// Saturation (0-255) above which a pixel is a highlight candidate.
    pub saturation_min: u8,
    /// Brightness (0-255) above which a pixel may be masked; keeps dark ink visible.
    pub brightness_min: u8,
    /// Side of the square structuring element; must be odd.
    pub kernel_size: u8,
    pub dilate_iterations: u8,
    /// `None` compares plain grayscale.
    pub binarize_threshold: Option<u8>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            saturation_min: 20,
            brightness_min: 50,
            kernel_size: 5,
            dilate_iterations: 2,
            binarize_threshold: Some(200),
        }
    }
}

impl HighlightConfig {
    /// 淡色高亮（低饱和度光标）
    pub fn faint_highlight() -> Self {
        Self {
            saturation_min: 10,
            ..Default::default()
        }
    }

    /// 不做高亮遮罩，直接比较灰度图
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            binarize_threshold: None,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(CaptureError::InvalidConfig(format!(
                "kernel_size must be odd and positive, got {}",
                self.kernel_size
            )));
        }
        Ok(())
    }
}

/// Binary highlight mask; a set pixel is excluded from comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask(GrayImage);

impl Mask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] != 0
    }

    pub fn count(&self) -> usize {
        self.0.pixels().filter(|p| p[0] != 0).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }

    pub(crate) fn raw(&self) -> &[u8] {
        self.0.as_raw()
    }
}

/// A frame prepared for comparison: highlight forced to background.
#[derive(Debug, Clone)]
pub struct CleanFrame {
    pub image: GrayImage,
    pub mask: Mask,
}

/// 彩色高亮遮罩：HSV 阈值 + 闭运算 + 膨胀
pub struct HighlightMasker {
    config: HighlightConfig,
}

impl HighlightMasker {
    pub fn new(config: HighlightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    pub fn mask(&self, frame: &RgbImage) -> Mask {
        let (width, height) = frame.dimensions();
        if !self.config.enabled {
            return Mask::empty(width, height);
        }

        let s_min = self.config.saturation_min;
        let v_min = self.config.brightness_min;
        let candidates = GrayImage::from_fn(width, height, |x, y| {
            let (s, v) = saturation_value(&frame.get_pixel(x, y).0);
            Luma([if s > s_min && v > v_min { MASK_ON } else { 0 }])
        });

        // 5x5 矩形核 == L∞ 半径 2
        let radius = self.config.kernel_size / 2;
        if radius == 0 {
            return Mask(candidates);
        }
        let closed = close(&candidates, Norm::LInf, radius);
        let grow = u32::from(radius) * u32::from(self.config.dilate_iterations);
        if grow == 0 {
            return Mask(closed);
        }
        Mask(dilate(&closed, Norm::LInf, grow.min(u32::from(u8::MAX)) as u8))
    }

    /// Grayscale (optionally binarized) frame with masked pixels set to white.
    pub fn clean(&self, frame: &RgbImage, mask: &Mask) -> GrayImage {
        let threshold = self.config.binarize_threshold;
        GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            if mask.is_set(x, y) {
                return Luma([BACKGROUND]);
            }
            let gray = luminance(&frame.get_pixel(x, y).0);
            Luma([match threshold {
                Some(level) if gray > level => 255,
                Some(_) => 0,
                None => gray,
            }])
        })
    }

    pub fn process(&self, frame: &RgbImage) -> CleanFrame {
        let mask = self.mask(frame);
        let image = self.clean(frame, &mask);
        CleanFrame { image, mask }
    }
}

impl Default for HighlightMasker {
    fn default() -> Self {
        Self::new(HighlightConfig::default())
    }
}

fn luminance(rgb: &[u8; 3]) -> u8 {
    ((rgb[0] as u32 * 299 + rgb[1] as u32 * 587 + rgb[2] as u32 * 114 + 500) / 1000) as u8
}

/// HSV 中的 S、V 分量（0-255 刻度）
fn saturation_value(rgb: &[u8; 3]) -> (u8, u8) {
    let max = rgb.iter().copied().max().unwrap_or(0);
    let min = rgb.iter().copied().min().unwrap_or(0);
    if max == 0 {
        return (0, 0);
    }
    let s = (255.0 * f32::from(max - min) / f32::from(max)).round() as u8;
    (s, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const INK: Rgb<u8> = Rgb([10, 10, 10]);
    const RED: Rgb<u8> = Rgb([230, 40, 40]);

    fn create_test_frame(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, WHITE)
    }

    #[test]
    fn test_saturation_value() {
        assert_eq!(saturation_value(&[255, 255, 255]), (0, 255));
        assert_eq!(saturation_value(&[0, 0, 0]), (0, 0));
        assert_eq!(saturation_value(&[255, 0, 0]), (255, 255));
        assert_eq!(saturation_value(&[200, 190, 185]), (19, 200));
    }

    #[test]
    fn test_white_and_ink_are_not_masked() {
        let mut frame = create_test_frame(20, 20);
        for x in 0..20 {
            frame.put_pixel(x, 10, INK);
        }
        let mask = HighlightMasker::default().mask(&frame);
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn test_colored_pixel_masked_and_dilated() {
        let mut frame = create_test_frame(30, 30);
        frame.put_pixel(15, 15, RED);

        let mask = HighlightMasker::default().mask(&frame);
        assert_eq!(mask.dimensions(), (30, 30));
        assert!(mask.is_set(15, 15));
        // 5x5 核膨胀两次 => 半径 4
        assert!(mask.is_set(19, 15));
        assert!(mask.is_set(11, 11));
        assert!(!mask.is_set(20, 15));
        assert!(!mask.is_set(0, 0));
    }

    #[test]
    fn test_closing_fills_gaps() {
        let mut frame = create_test_frame(30, 30);
        for x in 10..20 {
            if x != 15 {
                frame.put_pixel(x, 15, RED);
            }
        }
        let config = HighlightConfig {
            dilate_iterations: 0,
            ..Default::default()
        };
        let mask = HighlightMasker::new(config).mask(&frame);
        assert!(mask.is_set(15, 15));
        assert!(!mask.is_set(15, 10));
    }

    #[test]
    fn test_faint_highlight_preset() {
        let mut frame = create_test_frame(10, 10);
        frame.put_pixel(5, 5, Rgb([200, 190, 185]));

        assert_eq!(HighlightMasker::default().mask(&frame).count(), 0);
        let faint = HighlightMasker::new(HighlightConfig::faint_highlight()).mask(&frame);
        assert!(faint.is_set(5, 5));
    }

    #[test]
    fn test_clean_forces_masked_pixels_to_background() {
        let mut frame = create_test_frame(30, 30);
        frame.put_pixel(2, 2, INK);
        frame.put_pixel(3, 3, Rgb([150, 150, 150]));
        frame.put_pixel(15, 15, INK);
        frame.put_pixel(16, 15, RED);

        let masker = HighlightMasker::default();
        let clean = masker.process(&frame);
        assert_eq!(clean.image.get_pixel(2, 2)[0], 0);
        assert_eq!(clean.image.get_pixel(3, 3)[0], 0);
        assert_eq!(clean.image.get_pixel(0, 0)[0], 255);
        // 墨迹被高亮覆盖时同样视为背景
        assert_eq!(clean.image.get_pixel(15, 15)[0], 255);
    }

    #[test]
    fn test_disabled_keeps_grayscale() {
        let mut frame = create_test_frame(4, 4);
        frame.put_pixel(1, 1, Rgb([150, 150, 150]));
        frame.put_pixel(2, 2, RED);

        let clean = HighlightMasker::new(HighlightConfig::disabled()).process(&frame);
        assert_eq!(clean.mask.count(), 0);
        assert_eq!(clean.image.get_pixel(1, 1)[0], 150);
        assert_eq!(clean.image.get_pixel(2, 2)[0], luminance(&RED.0));
    }

    #[test]
    fn test_kernel_validation() {
        assert!(HighlightConfig::default().validate().is_ok());
        let even = HighlightConfig {
            kernel_size: 4,
            ..Default::default()
        };
        assert!(even.validate().is_err());
    }
}
