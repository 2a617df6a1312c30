use std::path::Path;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::cancel::CancelToken;
use crate::core::error::{CaptureError, Result};
use crate::core::video::{SourceGuard, VideoSource};
use crate::frame_extractor::diff_filter::ChangeDetector;
use crate::frame_extractor::frame::{CapturedFrame, ExtractedRegion, FrameInfo, Roi, SampleFrame};
use crate::frame_extractor::highlight::{HighlightConfig, HighlightMasker};
use crate::frame_extractor::region::{RegionConfig, RegionExtractor};
use crate::frame_extractor::sampler::{FrameSampler, DEFAULT_FPS};
use crate::frame_extractor::state_machine::{StabilityConfig, StabilityTracker, TrackerAction};

const PROGRESS_EVERY: u64 = 90;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub roi: Roi,
    pub sampling_interval_sec: f64,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    /// Used when the source reports no frame rate.
    pub default_fps: f64,
    pub change_threshold: f64,
    pub highlight: HighlightConfig,
    pub stability: StabilityConfig,
    pub region: RegionConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            roi: Roi::full(),
            sampling_interval_sec: 1.0,
            start_time: None,
            end_time: None,
            default_fps: DEFAULT_FPS,
            change_threshold: 5.0,
            highlight: HighlightConfig::default(),
            stability: StabilityConfig::default(),
            region: RegionConfig::default(),
        }
    }
}

impl ExtractionConfig {
    /// 快速翻页的谱面：更短的稳定时间
    pub fn for_fast_scroll() -> Self {
        Self {
            stability: StabilityConfig::for_fast_scroll(),
            ..Default::default()
        }
    }

    /// 早期做法：纯灰度比较，不遮罩高亮，原始阈值轮廓
    pub fn legacy_grayscale() -> Self {
        Self {
            highlight: HighlightConfig::disabled(),
            region: RegionConfig::raw_threshold(),
            ..Default::default()
        }
    }

    /// Loads a (possibly partial) JSON config; missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.roi.validate()?;
        self.highlight.validate()?;

        let invalid = |msg: String| Err(CaptureError::InvalidConfig(msg));
        if !self.sampling_interval_sec.is_finite() || self.sampling_interval_sec <= 0.0 {
            return invalid(format!(
                "sampling_interval_sec must be positive, got {}",
                self.sampling_interval_sec
            ));
        }
        if !self.default_fps.is_finite() || self.default_fps <= 0.0 {
            return invalid(format!("default_fps must be positive, got {}", self.default_fps));
        }
        if !(self.change_threshold >= 0.0) {
            return invalid(format!(
                "change_threshold must be non-negative, got {}",
                self.change_threshold
            ));
        }
        if !(self.stability.stable_duration_sec >= 0.0) {
            return invalid(format!(
                "stable_duration_sec must be non-negative, got {}",
                self.stability.stable_duration_sec
            ));
        }
        let start = self.start_time.unwrap_or(0.0);
        if !(start >= 0.0) {
            return invalid(format!("start_time must be non-negative, got {}", start));
        }
        if let Some(end) = self.end_time {
            if !(end >= start) {
                return invalid(format!("end_time {} is before start_time {}", end, start));
            }
        }
        Ok(())
    }
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub sampled_frames: u64,
    pub skipped_frames: u64,
    pub transitions: u64,
    pub captures: u64,
    pub regions: u64,
}

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub regions: Vec<ExtractedRegion>,
    pub captures: Vec<FrameInfo>,
    pub stats: RunStats,
}

/// 抽帧 -> 遮罩 -> 帧差 -> 稳定性判定 -> 区域裁剪
pub struct CaptureExtractor {
    masker: HighlightMasker,
    detector: ChangeDetector,
    tracker: StabilityTracker,
    region_extractor: RegionExtractor,
    config: ExtractionConfig,
}

impl CaptureExtractor {
    pub fn new() -> Self {
        Self::with_config(ExtractionConfig::default())
    }

    pub fn with_config(config: ExtractionConfig) -> Self {
        Self {
            masker: HighlightMasker::new(config.highlight.clone()),
            detector: ChangeDetector::with_threshold(config.change_threshold),
            tracker: StabilityTracker::with_config(config.stability.clone()),
            region_extractor: RegionExtractor::new(config.region.clone()),
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Feeds one sampled frame through masking, diffing and the tracker.
    pub fn process_frame(&mut self, frame: SampleFrame) -> Option<CapturedFrame> {
        let clean = self.masker.process(&frame.image);
        let change = self.detector.observe(clean);
        let action = self.tracker.update(frame.timestamp, change.changed);

        debug!(
            "t={:.2}s score={:.3} changed={} -> {:?}",
            frame.timestamp,
            change.score,
            change.changed,
            action
        );

        match action {
            TrackerAction::Capture => Some(CapturedFrame::from(frame)),
            TrackerAction::Hold | TrackerAction::Idle => None,
        }
    }

    /// Samples the whole configured window and returns the captures in
    /// time order. The source is closed on every exit path.
    pub fn capture_frames<S: VideoSource + ?Sized>(
        &mut self,
        source: &mut S,
        cancel: &CancelToken,
    ) -> Result<(Vec<CapturedFrame>, RunStats)> {
        self.reset();
        let mut guard = SourceGuard::new(source);
        let mut sampler = FrameSampler::new(
            &mut *guard,
            self.config.roi,
            self.config.start_time,
            self.config.end_time,
            self.config.sampling_interval_sec,
            self.config.default_fps,
        )?;

        let mut captures = Vec::new();
        for frame in sampler.by_ref() {
            cancel.check()?;
            let frame = frame?;
            let timestamp = frame.timestamp;

            if let Some(captured) = self.process_frame(frame) {
                info!(
                    "📸 capture #{} at {:.2}s",
                    captures.len() + 1,
                    captured.timestamp
                );
                captures.push(captured);
            }

            if self.tracker.frame_count() % PROGRESS_EVERY == 0 {
                info!(
                    "⏳ {} frames sampled, t={:.1}s, in_transition={}, stable_accum={:.2}s",
                    self.tracker.frame_count(),
                    timestamp,
                    self.tracker.is_in_transition(),
                    self.tracker.stable_accum()
                );
            }
        }

        let stats = RunStats {
            sampled_frames: sampler.sampled_count(),
            skipped_frames: sampler.skipped_count(),
            transitions: self.tracker.transition_count(),
            captures: self.tracker.capture_count(),
            regions: 0,
        };
        if stats.skipped_frames > 0 {
            warn!("⚠️ {} frames skipped: empty region of interest", stats.skipped_frames);
        }
        Ok((captures, stats))
    }

    /// 并行裁剪（各帧相互独立），保持时间顺序
    pub fn extract_regions(&self, captures: &[CapturedFrame]) -> Vec<ExtractedRegion> {
        captures
            .par_iter()
            .filter_map(|frame| {
                let region = self.region_extractor.extract(frame);
                if region.is_none() {
                    warn!("⚠️ no content region in capture at {:.2}s", frame.timestamp);
                }
                region
            })
            .collect()
    }

    pub fn run<S: VideoSource + ?Sized>(
        &mut self,
        source: &mut S,
        cancel: &CancelToken,
    ) -> Result<ExtractionResult> {
        let (captures, mut stats) = self.capture_frames(source, cancel)?;
        let regions = self.extract_regions(&captures);
        stats.regions = regions.len() as u64;

        info!(
            "✅ run finished: {} sampled, {} skipped, {} transitions, {} captures, {} regions",
            stats.sampled_frames, stats.skipped_frames, stats.transitions, stats.captures, stats.regions
        );

        if regions.is_empty() {
            return Err(CaptureError::NoContentFound {
                captures: captures.len(),
            });
        }

        Ok(ExtractionResult {
            regions,
            captures: captures.iter().map(FrameInfo::from_capture).collect(),
            stats,
        })
    }

    pub fn reset(&mut self) {
        self.detector.reset();
        self.tracker.reset();
    }
}

impl Default for CaptureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
