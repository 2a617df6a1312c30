use std::iter::FusedIterator;

use log::{debug, info};

use super::frame::{Roi, SampleFrame};
use crate::core::error::{CaptureError, Result};
use crate::core::video::VideoSource;

pub const DEFAULT_FPS: f64 = 30.0;

/// 固定时间间隔采样，产出已裁剪 ROI 的帧
///
/// Seeks once to the start time, then decodes and discards `step - 1`
/// frames between samples. Frames whose ROI crop is empty are skipped
/// without being yielded. `frame_number` counts frames actually decoded
/// since the seek target.
pub struct FrameSampler<'a, S: VideoSource + ?Sized> {
    source: &'a mut S,
    roi: Roi,
    step: u64,
    end_time: f64,
    frame_number: u64,
    sampled: u64,
    skipped: u64,
    finished: bool,
}

impl<'a, S: VideoSource + ?Sized> FrameSampler<'a, S> {
    pub fn new(
        source: &'a mut S,
        roi: Roi,
        start_time: Option<f64>,
        end_time: Option<f64>,
        interval_sec: f64,
        default_fps: f64,
    ) -> Result<Self> {
        let fps = source
            .frame_rate()
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(default_fps);
        let step = ((fps * interval_sec).round() as u64).max(1);

        let duration = source.duration();
        let known_duration = duration.is_finite() && duration > 0.0;
        let end_time = match end_time {
            Some(end) if !known_duration || end < duration => end,
            _ if known_duration => duration,
            _ => f64::INFINITY,
        };

        let start = start_time.unwrap_or(0.0);
        source.seek_to_time(start).map_err(|e| match e {
            CaptureError::SourceUnavailable(_) => e,
            other => CaptureError::SourceUnavailable(format!("seek failed: {}", other)),
        })?;

        info!(
            "🎯 FrameSampler: fps={:.2}, step={} frames, window={:.2}s..{:.2}s",
            fps, step, start, end_time
        );
        let first_frame = (source.position() * fps).round() as u64;

        Ok(Self {
            source,
            roi,
            step,
            end_time,
            frame_number: first_frame,
            sampled: 0,
            skipped: 0,
            finished: false,
        })
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn sampled_count(&self) -> u64 {
        self.sampled
    }

    /// Frames dropped because the ROI crop was empty.
    pub fn skipped_count(&self) -> u64 {
        self.skipped
    }

    fn fail(&mut self, e: CaptureError) -> Option<Result<SampleFrame>> {
        self.finished = true;
        Some(Err(e))
    }
}

impl<S: VideoSource + ?Sized> Iterator for FrameSampler<'_, S> {
    type Item = Result<SampleFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            let timestamp = self.source.position();
            if timestamp > self.end_time {
                self.finished = true;
                return None;
            }

            let frame = match self.source.read_next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => return self.fail(e),
            };
            let frame_number = self.frame_number;
            self.frame_number += 1;

            for _ in 1..self.step {
                match self.source.skip_frame() {
                    Ok(true) => self.frame_number += 1,
                    Ok(false) => break,
                    Err(e) => return self.fail(e),
                }
            }

            match self.roi.crop(&frame) {
                Ok(image) => {
                    self.sampled += 1;
                    return Some(Ok(SampleFrame::new(image, timestamp, frame_number)));
                }
                Err(e) if e.is_recoverable() => {
                    self.skipped += 1;
                    debug!("⏭️ frame {} at {:.2}s skipped: {}", frame_number, timestamp, e);
                }
                Err(e) => return self.fail(e),
            }
        }
    }
}

impl<S: VideoSource + ?Sized> FusedIterator for FrameSampler<'_, S> {}
