//! FFmpeg 解码源（`ffmpeg` feature）

use std::path::Path;

use ffmpeg_next as ffmpeg;
use image::RgbImage;
use log::{debug, info};

use super::source::VideoSource;
use crate::core::error::{CaptureError, Result};

fn init_ffmpeg() -> Result<()> {
    static INIT: std::sync::OnceLock<std::result::Result<(), String>> = std::sync::OnceLock::new();
    INIT.get_or_init(|| ffmpeg::init().map_err(|e| e.to_string()))
        .clone()
        .map_err(|e| CaptureError::SourceUnavailable(format!("FFmpeg init failed: {}", e)))
}

fn unavailable(context: &str, e: ffmpeg::Error) -> CaptureError {
    CaptureError::SourceUnavailable(format!("{}: {}", context, e))
}

struct Decoding {
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    time_base: f64,
    eof: bool,
}

impl Decoding {
    fn next_decoded(&mut self) -> Result<Option<ffmpeg::frame::Video>> {
        loop {
            let mut decoded = ffmpeg::frame::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.eof {
                return Ok(None);
            }
            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() == self.stream_index {
                        self.decoder
                            .send_packet(&packet)
                            .map_err(|e| unavailable("send packet", e))?;
                    }
                }
                None => {
                    self.decoder.send_eof().ok();
                    self.eof = true;
                }
            }
        }
    }

    fn to_rgb(&mut self, decoded: &ffmpeg::frame::Video) -> Result<RgbImage> {
        let mut converted = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut converted)
            .map_err(|e| unavailable("convert frame", e))?;

        let width = converted.width();
        let height = converted.height();
        let stride = converted.stride(0);
        let data = converted.data(0);
        let row_len = width as usize * 3;

        let mut pixels = Vec::with_capacity(row_len * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&data[start..start + row_len]);
        }

        RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| CaptureError::SourceUnavailable("frame buffer size mismatch".into()))
    }

    fn timestamp_of(&self, decoded: &ffmpeg::frame::Video) -> Option<f64> {
        decoded.timestamp().map(|ts| ts as f64 * self.time_base)
    }
}

/// 通过 ffmpeg-next 解码视频文件
pub struct FfmpegSource {
    inner: Option<Decoding>,
    fps: Option<f64>,
    duration: f64,
    position: f64,
    pending: Option<(f64, ffmpeg::frame::Video)>,
}

impl FfmpegSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        init_ffmpeg()?;
        let path = path.as_ref();

        let input = ffmpeg::format::input(&path)
            .map_err(|e| unavailable(&format!("open {}", path.display()), e))?;

        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| CaptureError::SourceUnavailable("no video stream".into()))?;
        let stream_index = stream.index();
        let time_base = f64::from(stream.time_base());
        let rate = f64::from(stream.avg_frame_rate());
        let fps = (rate.is_finite() && rate > 0.0).then_some(rate);

        let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| unavailable("decoder context", e))?
            .decoder()
            .video()
            .map_err(|e| unavailable("video decoder", e))?;

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| unavailable("scaler", e))?;

        let duration = input.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE);

        info!(
            "🎬 FfmpegSource: opened {} ({}x{}, fps={:?}, duration={:.2}s)",
            path.display(),
            decoder.width(),
            decoder.height(),
            fps,
            duration
        );

        Ok(Self {
            inner: Some(Decoding {
                input,
                decoder,
                scaler,
                stream_index,
                time_base,
                eof: false,
            }),
            fps,
            duration,
            position: 0.0,
            pending: None,
        })
    }

    fn decoding(&mut self) -> Result<&mut Decoding> {
        self.inner
            .as_mut()
            .ok_or_else(|| CaptureError::SourceUnavailable("source already closed".into()))
    }

    fn frame_period(&self) -> f64 {
        1.0 / self.fps.unwrap_or(30.0)
    }

    fn next_timed(&mut self) -> Result<Option<(f64, ffmpeg::frame::Video)>> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }
        let fallback = self.position;
        let decoding = self.decoding()?;
        Ok(decoding.next_decoded()?.map(|frame| {
            let ts = decoding.timestamp_of(&frame).unwrap_or(fallback);
            (ts, frame)
        }))
    }
}

impl VideoSource for FfmpegSource {
    fn frame_rate(&self) -> Option<f64> {
        self.fps
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn seek_to_time(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(CaptureError::SourceUnavailable(format!(
                "cannot seek to {}s",
                seconds
            )));
        }
        self.pending = None;
        let target = (seconds * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;
        {
            let decoding = self.decoding()?;
            decoding
                .input
                .seek(target, ..target)
                .map_err(|e| unavailable("seek", e))?;
            decoding.decoder.flush();
            decoding.eof = false;
        }

        // Container seeks land on a keyframe; decode forward to the target.
        let half_period = self.frame_period() / 2.0;
        while let Some((ts, frame)) = self.next_timed()? {
            if ts + half_period >= seconds {
                self.position = ts;
                self.pending = Some((ts, frame));
                debug!("seek to {:.3}s landed on {:.3}s", seconds, ts);
                return Ok(());
            }
        }
        self.position = seconds;
        Ok(())
    }

    fn read_next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some((ts, frame)) = self.next_timed()? else {
            return Ok(None);
        };
        let rgb = self.decoding()?.to_rgb(&frame)?;
        self.position = ts + self.frame_period();
        Ok(Some(rgb))
    }

    fn skip_frame(&mut self) -> Result<bool> {
        match self.next_timed()? {
            Some((ts, _)) => {
                self.position = ts + self.frame_period();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("🗑️ FfmpegSource: released decoder");
        }
        self.pending = None;
    }
}
