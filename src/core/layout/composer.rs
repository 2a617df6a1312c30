use log::warn;
use serde::{Deserialize, Serialize};

use crate::core::error::{CaptureError, Result};

/// Slack allowed when comparing accumulated heights.
pub const EPSILON: f64 = 1e-6;

/// 页面几何（任意长度单位，默认毫米）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    /// Vertical gap between consecutive images on one page.
    pub spacing: f64,
    /// Layout units to PDF points.
    pub unit_to_point: f64,
    /// One image per page, centred on both axes.
    pub one_per_page: bool,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 10.0,
            spacing: 5.0,
            unit_to_point: 72.0 / 25.4,
            one_per_page: false,
        }
    }
}

impl PageLayout {
    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f64 {
        self.page_height - 2.0 * self.margin
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.content_width()) || !positive(self.content_height()) {
            return Err(CaptureError::InvalidConfig(format!(
                "page {}x{} leaves no room inside margin {}",
                self.page_width, self.page_height, self.margin
            )));
        }
        if !(self.spacing >= 0.0) || !(self.margin >= 0.0) {
            return Err(CaptureError::InvalidConfig(
                "margin and spacing must be non-negative".into(),
            ));
        }
        if !positive(self.unit_to_point) {
            return Err(CaptureError::InvalidConfig(format!(
                "unit_to_point must be positive, got {}",
                self.unit_to_point
            )));
        }
        Ok(())
    }
}

/// Where one image lands on a page; `y` grows downwards from the page top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub image_index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub placements: Vec<Placement>,
    /// Image heights plus inner spacing used so far.
    pub used_height: f64,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }
}

/// 按顺序把图片纵向排入固定尺寸的页面
pub struct PageComposer {
    layout: PageLayout,
}

impl PageComposer {
    pub fn new(layout: PageLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Display size for an image of `width x height` pixels: full content
    /// width, or full content height when that would be too tall.
    pub fn fit(&self, width: u32, height: u32) -> Option<(f64, f64)> {
        if width == 0 || height == 0 {
            return None;
        }
        let (w, h) = (f64::from(width), f64::from(height));
        let max_w = self.layout.content_width();
        let max_h = self.layout.content_height();

        let display_h = max_w * h / w;
        if display_h > max_h {
            Some(((max_h * w / h).min(max_w), max_h))
        } else {
            Some((max_w, display_h))
        }
    }

    pub fn compose(&self, sizes: &[(u32, u32)]) -> Vec<Page> {
        let layout = &self.layout;
        let mut pages = Vec::new();
        let mut current = Page::default();

        for (index, &(w, h)) in sizes.iter().enumerate() {
            let Some((width, height)) = self.fit(w, h) else {
                warn!("⚠️ image #{} has zero size ({}x{}), skipped", index, w, h);
                continue;
            };

            if layout.one_per_page {
                pages.push(Page {
                    placements: vec![Placement {
                        image_index: index,
                        x: (layout.page_width - width) / 2.0,
                        y: (layout.page_height - height) / 2.0,
                        width,
                        height,
                    }],
                    used_height: height,
                });
                continue;
            }

            let mut gap = if current.is_empty() { 0.0 } else { layout.spacing };
            if !current.is_empty()
                && current.used_height + gap + height > layout.content_height() + EPSILON
            {
                pages.push(std::mem::take(&mut current));
                gap = 0.0;
            }

            current.placements.push(Placement {
                image_index: index,
                x: layout.margin + (layout.content_width() - width) / 2.0,
                y: layout.margin + current.used_height + gap,
                width,
                height,
            });
            current.used_height += gap + height;
        }

        if !current.is_empty() {
            pages.push(current);
        }
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> PageComposer {
        PageComposer::new(PageLayout::default()).unwrap()
    }

    fn assert_within_capacity(pages: &[Page], layout: &PageLayout) {
        for page in pages {
            let heights: f64 = page.placements.iter().map(|p| p.height).sum();
            let gaps = layout.spacing * page.len().saturating_sub(1) as f64;
            assert!(heights + gaps <= layout.content_height() + EPSILON);
            assert!((page.used_height - (heights + gaps)).abs() < 1e-9);
            for p in &page.placements {
                assert!(p.y >= layout.margin - EPSILON);
                assert!(p.y + p.height <= layout.page_height - layout.margin + EPSILON);
                assert!(p.width <= layout.content_width() + EPSILON);
            }
        }
    }

    #[test]
    fn test_scales_to_content_width_and_centres() {
        let pages = composer().compose(&[(380, 100)]);
        assert_eq!(pages.len(), 1);
        let p = pages[0].placements[0];
        assert_eq!((p.width, p.height), (190.0, 50.0));
        assert_eq!((p.x, p.y), (10.0, 10.0));
    }

    #[test]
    fn test_tall_image_fits_by_height() {
        let pages = composer().compose(&[(100, 1000)]);
        let p = pages[0].placements[0];
        assert_eq!(p.height, 277.0);
        assert!((p.width - 27.7).abs() < 1e-9);
        assert!((p.x - (10.0 + (190.0 - 27.7) / 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_spacing_between_images() {
        let pages = composer().compose(&[(190, 50), (190, 50)]);
        let placements = &pages[0].placements;
        assert_eq!(placements[0].y, 10.0);
        assert_eq!(placements[1].y, 65.0);
        assert_eq!(pages[0].used_height, 105.0);
    }

    #[test]
    fn test_identical_images_page_count() {
        let layout = PageLayout::default();
        let composer = composer();
        let capacity_h = layout.content_height();
        let s = layout.spacing;

        for h in [50u32, 60, 90, 130, 277] {
            for n in [1usize, 4, 5, 6, 12, 31] {
                let pages = composer.compose(&vec![(190, h); n]);
                let per_page = ((capacity_h + s) / (f64::from(h) + s)).floor() as usize;
                let expected = (n + per_page - 1) / per_page;
                assert_eq!(pages.len(), expected, "h={} n={}", h, n);
                assert_within_capacity(&pages, &layout);
            }
        }
    }

    #[test]
    fn test_capacity_invariant_mixed_sizes() {
        let mut seed: u64 = 42;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) % 2000) as u32 + 1
        };
        let sizes: Vec<(u32, u32)> = (0..200).map(|_| (next(), next())).collect();

        let layout = PageLayout {
            page_width: 100.0,
            page_height: 80.0,
            margin: 7.5,
            spacing: 3.0,
            ..Default::default()
        };
        let pages = PageComposer::new(layout.clone()).unwrap().compose(&sizes);
        assert_within_capacity(&pages, &layout);

        let placed: Vec<usize> = pages
            .iter()
            .flat_map(|p| p.placements.iter().map(|pl| pl.image_index))
            .collect();
        assert_eq!(placed, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_size_images_skipped() {
        let pages = composer().compose(&[(0, 10), (190, 50), (10, 0)]);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 1);
        assert_eq!(pages[0].placements[0].image_index, 1);
        assert!(composer().compose(&[]).is_empty());
    }

    #[test]
    fn test_one_per_page() {
        let layout = PageLayout {
            one_per_page: true,
            ..Default::default()
        };
        let pages = PageComposer::new(layout).unwrap().compose(&[(190, 50), (190, 50)]);
        assert_eq!(pages.len(), 2);
        let p = pages[1].placements[0];
        assert_eq!((p.x, p.y), (10.0, 123.5));
    }

    #[test]
    fn test_invalid_layout() {
        let layout = PageLayout {
            margin: 120.0,
            ..Default::default()
        };
        assert!(PageComposer::new(layout).is_err());
    }
}
