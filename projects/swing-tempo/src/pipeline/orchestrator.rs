// Pipeline orchestrator: runs one analysis from video (or poses) to tempo metrics
//
// Each call owns its own timing, series and events; nothing is shared between runs.

use crate::config::AnalysisConfig;
use crate::error::TempoError;
use crate::pipeline::events::{detect_events, SwingEvents};
use crate::pipeline::series::{build_series, Series};
use crate::pipeline::smoothing::smooth;
use crate::pipeline::tempo::{event_times, EventTimes, TempoMetrics};
use crate::pose::{PoseEstimator, PoseResult};
use crate::video::processor::process_video;
use crate::video::timing::{resolve_timing, VideoTiming};
use crate::video::{Frame, VideoSource};
use anyhow::Result;
use serde::Serialize;

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct SwingAnalysis {
    pub timing: VideoTiming,
    /// Frames that went through pose inference.
    pub analyzed_frames: usize,
    pub missing_frames: usize,
    pub events: SwingEvents,
    pub times: EventTimes,
    pub metrics: TempoMetrics,
    #[serde(skip)]
    pub raw_series: Series,
    #[serde(skip)]
    pub smoothed_series: Series,
}

/// Series → smoothing → event detection → tempo.
pub fn analyze_poses(
    poses: &[PoseResult],
    timing: VideoTiming,
    config: &AnalysisConfig,
) -> std::result::Result<SwingAnalysis, TempoError> {
    let raw_series = build_series(poses, &config.selector());
    let missing_frames = raw_series.missing_count();
    if missing_frames > 0 {
        tracing::info!(
            "{} of {} frames have no tracked wrist, interpolating",
            missing_frames,
            raw_series.len()
        );
    }

    let smoothed_series = smooth(&raw_series, config.smoothing_window);
    let events = detect_events(&smoothed_series, &config.event_config())?;
    let times = event_times(&events, &timing);
    let metrics = TempoMetrics::from_times(&times);

    tracing::info!(
        "address={:.2}s top={:.2}s impact={:.2}s backswing={:.2}s downswing={:.2}s ratio={:.2}",
        times.address_s,
        times.top_s,
        times.impact_s,
        metrics.backswing_s,
        metrics.downswing_s,
        metrics.ratio
    );

    Ok(SwingAnalysis {
        timing,
        analyzed_frames: raw_series.len(),
        missing_frames,
        events,
        times,
        metrics,
        raw_series,
        smoothed_series,
    })
}

/// Run pose inference on every decoded frame, in order.
///
/// A frame the estimator fails on is recorded as "no pose" so the output stays
/// index-aligned. Pixels are dropped right after inference.
pub fn extract_poses(
    source: &dyn VideoSource,
    estimator: &mut dyn PoseEstimator,
    timing: &VideoTiming,
    max_frames: Option<usize>,
) -> Result<Vec<PoseResult>> {
    let mut poses = Vec::with_capacity(timing.frame_count);
    let mut failed = 0usize;

    let stats = process_video(
        source,
        timing.fps,
        timing.frame_count,
        max_frames,
        |frame: Frame| -> Result<()> {
            let pose = match estimator.infer(&frame.pixels) {
                Ok(pose) => pose,
                Err(e) => {
                    failed += 1;
                    tracing::warn!("Pose inference failed on frame {}: {}", frame.index, e);
                    PoseResult::empty()
                }
            };
            poses.push(pose);
            Ok(())
        },
    )
    .map_err(|e| TempoError::video_unreadable(source.describe(), format!("{:#}", e)))?;

    tracing::info!(
        "Extracted poses from {} frames in {:.1}s ({} inference failures)",
        stats.processed_frames,
        stats.duration.as_secs_f64(),
        failed
    );
    Ok(poses)
}

/// Full pipeline for one video.
///
/// Taxonomy failures come back as [`TempoError`] inside the `anyhow::Error`.
pub fn analyze_video(
    source: &dyn VideoSource,
    estimator: &mut dyn PoseEstimator,
    config: &AnalysisConfig,
) -> Result<SwingAnalysis> {
    let timing = resolve_timing(source)?;
    let poses = extract_poses(source, estimator, &timing, config.max_frames)?;
    Ok(analyze_poses(&poses, timing, config)?)
}
