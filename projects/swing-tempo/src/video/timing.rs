//! Frame rate and frame count resolution for a video.
//!
//! Containers regularly report `nframes = inf`, zero, or a missing fps. The
//! reported values are advisory: fps falls back to [`DEFAULT_FPS`] and an
//! unusable frame count triggers an exact decode scan.

use super::VideoSource;
use crate::error::{Result, TempoError};
use serde::Serialize;

pub const DEFAULT_FPS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoTiming {
    pub fps: f64,
    pub frame_count: usize,
}

impl VideoTiming {
    /// Timing with an already trusted frame count; fps is still sanitized.
    pub fn new(fps: f64, frame_count: usize) -> Self {
        Self {
            fps: normalize_fps(Some(fps)),
            frame_count,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count as f64 / self.fps
    }

    pub fn frame_to_secs(&self, index: usize) -> f64 {
        index as f64 / self.fps
    }
}

/// Accept a finite positive fps, otherwise [`DEFAULT_FPS`].
pub fn normalize_fps(reported: Option<f64>) -> f64 {
    match reported {
        Some(fps) if fps.is_finite() && fps > 0.0 => fps,
        _ => DEFAULT_FPS,
    }
}

/// Accept a finite positive frame count, otherwise unknown.
pub fn normalize_frame_count(reported: Option<f64>) -> Option<usize> {
    match reported {
        Some(n) if n.is_finite() && n > 0.0 => Some(n as usize).filter(|&n| n > 0),
        _ => None,
    }
}

pub fn resolve_timing(source: &dyn VideoSource) -> Result<VideoTiming> {
    let name = source.describe();
    let reader = source
        .open()
        .map_err(|e| TempoError::video_unreadable(&name, format!("{:#}", e)))?;

    let reported_fps = reader.reported_fps();
    let reported_count = reader.reported_frame_count();
    drop(reader);

    let fps = normalize_fps(reported_fps);
    if !matches!(reported_fps, Some(r) if r == fps) {
        tracing::warn!(
            "{}: unusable fps in metadata ({:?}), falling back to {:.1}",
            name,
            reported_fps,
            DEFAULT_FPS
        );
    }

    let frame_count = match normalize_frame_count(reported_count) {
        Some(n) => n,
        None => {
            tracing::info!(
                "{}: frame count not reported ({:?}), counting frames",
                name,
                reported_count
            );
            count_frames(source, &name)?
        }
    };

    let timing = VideoTiming { fps, frame_count };
    tracing::info!(
        "{}: fps={:.2}, frames={}, duration={:.2}s",
        name,
        fps,
        frame_count,
        timing.duration_secs()
    );

    Ok(timing)
}

/// Decode the whole stream on a fresh reader. A decode error yields 0.
fn count_frames(source: &dyn VideoSource, name: &str) -> Result<usize> {
    let mut reader = source
        .open()
        .map_err(|e| TempoError::video_unreadable(name, format!("{:#}", e)))?;

    let mut count = 0usize;
    loop {
        match reader.next_frame() {
            Ok(Some(_)) => count += 1,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(
                    "{}: decode failed after {} frames while counting ({}), frame count unknown",
                    name,
                    count,
                    e
                );
                return Ok(0);
            }
        }
    }
    Ok(count)
}
