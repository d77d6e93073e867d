use crate::pipeline::events::{EventConfig, DEFAULT_IMPACT_TOLERANCE};
use crate::pipeline::series::{FixedPoint, MostConfidentWrist, PointSelector};
use crate::pipeline::smoothing::DEFAULT_SMOOTHING_WINDOW;
use crate::pose::{BodyPoint, Landmark, PoseResult, Side};
use crate::video::Backend;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which wrist drives the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WristChoice {
    /// Higher-confidence wrist per frame, right wrist on ties
    #[default]
    Auto,
    Left,
    Right,
}

/// Tunables for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub smoothing_window: usize,
    pub impact_tolerance: f64,
    pub wrist: WristChoice,
    /// Landmarks below this confidence count as not found.
    pub min_confidence: f32,
    /// Stop decoding after this many frames.
    pub max_frames: Option<usize>,
    pub backend: Backend,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            impact_tolerance: DEFAULT_IMPACT_TOLERANCE,
            wrist: WristChoice::Auto,
            min_confidence: 0.0,
            max_frames: None,
            backend: Backend::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn event_config(&self) -> EventConfig {
        EventConfig {
            impact_tolerance: self.impact_tolerance,
        }
    }

    pub fn selector(&self) -> WristSelector {
        match self.wrist {
            WristChoice::Auto => WristSelector::Auto(MostConfidentWrist {
                tie_break: Side::Right,
                min_confidence: self.min_confidence,
            }),
            WristChoice::Left => WristSelector::Fixed(
                FixedPoint(BodyPoint::LeftWrist),
                self.min_confidence,
            ),
            WristChoice::Right => WristSelector::Fixed(
                FixedPoint(BodyPoint::RightWrist),
                self.min_confidence,
            ),
        }
    }
}

/// Point selector built from [`AnalysisConfig`].
#[derive(Debug, Clone, Copy)]
pub enum WristSelector {
    Auto(MostConfidentWrist),
    Fixed(FixedPoint, f32),
}

impl PointSelector for WristSelector {
    fn select(&self, pose: &PoseResult) -> Option<Landmark> {
        match self {
            WristSelector::Auto(s) => s.select(pose),
            WristSelector::Fixed(s, min_confidence) => s
                .select(pose)
                .filter(|l| l.confidence.map_or(true, |c| c >= *min_confidence)),
        }
    }
}
