use super::highlight::CleanFrame;

/// Largest possible mean difference between two 8-bit frames.
pub const MAX_SCORE: f64 = 255.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeScore {
    pub score: f64,
    pub changed: bool,
}

impl ChangeScore {
    /// 首帧没有参照，视为已变化
    pub fn initial() -> Self {
        Self {
            score: MAX_SCORE,
            changed: true,
        }
    }
}

/// 掩码帧差：忽略两帧高亮掩码并集内的像素
pub struct ChangeDetector {
    threshold: f64,
    previous: Option<CleanFrame>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::with_threshold(5.0)
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            previous: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn compare(&self, previous: &CleanFrame, current: &CleanFrame) -> ChangeScore {
        let score = masked_difference(previous, current);
        ChangeScore {
            score,
            changed: score > self.threshold,
        }
    }

    /// Scores `frame` against the last observed frame, then keeps it as
    /// the new reference.
    pub fn observe(&mut self, frame: CleanFrame) -> ChangeScore {
        let result = match &self.previous {
            Some(previous) => self.compare(previous, &frame),
            None => ChangeScore::initial(),
        };
        self.previous = Some(frame);
        result
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean absolute difference over all pixels; pixels under either mask count as 0.
/// Frames of different size are maximally different.
pub fn masked_difference(previous: &CleanFrame, current: &CleanFrame) -> f64 {
    if previous.image.dimensions() != current.image.dimensions()
        || previous.mask.dimensions() != current.image.dimensions()
        || current.mask.dimensions() != current.image.dimensions()
    {
        return MAX_SCORE;
    }

    let total = previous.image.as_raw().len();
    if total == 0 {
        return 0.0;
    }

    let sum: u64 = previous
        .image
        .as_raw()
        .iter()
        .zip(current.image.as_raw())
        .zip(previous.mask.raw().iter().zip(current.mask.raw()))
        .filter(|(_, (m1, m2))| **m1 == 0 && **m2 == 0)
        .map(|((a, b), _)| u64::from(a.abs_diff(*b)))
        .sum();

    sum as f64 / total as f64
}
