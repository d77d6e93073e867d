//! Golf swing tempo from video.
//!
//! Decoded frames go through a pose estimator, the tracked wrist height
//! becomes a per-frame series, and Address, Top and Impact are located on the
//! smoothed series to produce the backswing:downswing ratio.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod pose;
pub mod run_context;
pub mod video;

pub use config::{AnalysisConfig, WristChoice};
pub use error::{TempoError, MIN_SERIES_LEN};
pub use pipeline::events::{detect_events, EventConfig, SwingEvents};
pub use pipeline::orchestrator::{analyze_poses, analyze_video, extract_poses, SwingAnalysis};
pub use pipeline::series::{build_series, PointSelector, Series};
pub use pipeline::smoothing::smooth;
pub use pipeline::tempo::{compute_tempo, TempoMetrics};
pub use video::timing::{resolve_timing, VideoTiming};
