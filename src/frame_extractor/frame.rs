use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

use crate::core::error::{CaptureError, Result};

/// 分析区域（百分比，0-100）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Roi {
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
}

impl Default for Roi {
    fn default() -> Self {
        Self::full()
    }
}

impl Roi {
    pub fn full() -> Self {
        Self {
            x_start: 0.0,
            x_end: 100.0,
            y_start: 0.0,
            y_end: 100.0,
        }
    }

    pub fn new(x_start: f64, x_end: f64, y_start: f64, y_end: f64) -> Self {
        Self {
            x_start,
            x_end,
            y_start,
            y_end,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if ![self.x_start, self.x_end, self.y_start, self.y_end]
            .into_iter()
            .all(in_range)
        {
            return Err(CaptureError::InvalidConfig(format!(
                "ROI percentages must lie in [0, 100]: {:?}",
                self
            )));
        }
        if self.x_start > self.x_end || self.y_start > self.y_end {
            return Err(CaptureError::InvalidConfig(format!("ROI is inverted: {:?}", self)));
        }
        Ok(())
    }

    /// Pixel rectangle `(x, y, width, height)` for a frame of the given size.
    pub fn pixel_rect(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let to_px = |pct: f64, extent: u32| ((extent as f64 * pct / 100.0) as u32).min(extent);
        let x1 = to_px(self.x_start, width);
        let x2 = to_px(self.x_end, width);
        let y1 = to_px(self.y_start, height);
        let y2 = to_px(self.y_end, height);
        (x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1))
    }

    pub fn crop(&self, frame: &RgbImage) -> Result<RgbImage> {
        let (x, y, w, h) = self.pixel_rect(frame.width(), frame.height());
        if w == 0 || h == 0 {
            return Err(CaptureError::EmptyRoi {
                width: w,
                height: h,
            });
        }
        Ok(imageops::crop_imm(frame, x, y, w, h).to_image())
    }
}

/// 采样帧：ROI 已裁剪
#[derive(Debug, Clone)]
pub struct SampleFrame {
    pub image: RgbImage,
    pub timestamp: f64,
    pub frame_number: u64,
}

impl SampleFrame {
    pub fn new(image: RgbImage, timestamp: f64, frame_number: u64) -> Self {
        Self {
            image,
            timestamp,
            frame_number,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_count(&self) -> usize {
        (self.width() * self.height()) as usize
    }
}

/// A frame accepted by the stability tracker.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub image: RgbImage,
    pub timestamp: f64,
    pub frame_number: u64,
}

impl From<SampleFrame> for CapturedFrame {
    fn from(frame: SampleFrame) -> Self {
        Self {
            image: frame.image,
            timestamp: frame.timestamp,
            frame_number: frame.frame_number,
        }
    }
}

/// A capture cropped to its dominant content.
#[derive(Debug, Clone)]
pub struct ExtractedRegion {
    pub image: RgbImage,
    pub timestamp: f64,
    /// `(x, y, width, height)` inside the captured frame.
    pub bounds: (u32, u32, u32, u32),
}

/// 帧元数据（轻量级，用于日志和统计）
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub timestamp: f64,
    pub frame_number: u64,
}

impl FrameInfo {
    pub fn from_capture(frame: &CapturedFrame) -> Self {
        Self {
            width: frame.image.width(),
            height: frame.image.height(),
            timestamp: frame.timestamp,
            frame_number: frame.frame_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_full_roi_keeps_frame() {
        let frame = RgbImage::from_pixel(100, 50, Rgb([1, 2, 3]));
        let cropped = Roi::full().crop(&frame).unwrap();
        assert_eq!(cropped.dimensions(), (100, 50));
    }

    #[test]
    fn test_roi_crop_by_percent() {
        let mut frame = RgbImage::new(200, 100);
        frame.put_pixel(120, 80, Rgb([255, 0, 0]));

        let roi = Roi::new(50.0, 100.0, 70.0, 100.0);
        assert_eq!(roi.pixel_rect(200, 100), (100, 70, 100, 30));

        let cropped = roi.crop(&frame).unwrap();
        assert_eq!(cropped.dimensions(), (100, 30));
        assert_eq!(cropped.get_pixel(20, 10), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_zero_area_roi() {
        let frame = RgbImage::new(3, 3);
        let roi = Roi::new(10.0, 20.0, 0.0, 100.0);
        assert!(matches!(
            roi.crop(&frame),
            Err(CaptureError::EmptyRoi { width: 0, .. })
        ));
    }

    #[test]
    fn test_roi_validation() {
        assert!(Roi::full().validate().is_ok());
        assert!(Roi::new(60.0, 40.0, 0.0, 100.0).validate().is_err());
        assert!(Roi::new(0.0, 140.0, 0.0, 100.0).validate().is_err());
    }

    #[test]
    fn test_capture_info() {
        let sample = SampleFrame::new(RgbImage::new(10, 20), 4.0, 120);
        assert_eq!(sample.pixel_count(), 200);

        let captured = CapturedFrame::from(sample);
        let info = FrameInfo::from_capture(&captured);
        assert_eq!((info.width, info.height), (10, 20));
        assert_eq!(info.frame_number, 120);
    }
}
