//! Per-frame landmark trace.
//!
//! A [`Series`] is index-aligned with the analyzed frames: a frame without a
//! usable point keeps a `None` placeholder instead of being dropped, because
//! every later stage works on positions. Non-finite positions are stored as
//! missing, so NaN never reaches smoothing or detection.

use crate::pose::{BodyPoint, Landmark, PoseResult, Side};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series(Vec<Option<f64>>);

impl Series {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self(values.into_iter().map(|v| v.filter(|y| y.is_finite())).collect())
    }

    /// A series from plain samples; NaN or infinite entries become missing.
    pub fn from_values(values: &[f64]) -> Self {
        Self(values.iter().map(|&y| Some(y).filter(|y| y.is_finite())).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied().flatten()
    }

    pub fn as_slice(&self) -> &[Option<f64>] {
        &self.0
    }

    pub fn missing_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_none()).count()
    }

    pub fn is_gap_free(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    /// All values, or `None` if any sample is missing.
    pub fn dense(&self) -> Option<Vec<f64>> {
        self.0.iter().copied().collect()
    }
}

/// Picks the tracked point out of one frame's pose.
pub trait PointSelector {
    fn select(&self, pose: &PoseResult) -> Option<Landmark>;
}

impl<F> PointSelector for F
where
    F: Fn(&PoseResult) -> Option<Landmark>,
{
    fn select(&self, pose: &PoseResult) -> Option<Landmark> {
        self(pose)
    }
}

/// Always the same named point.
#[derive(Debug, Clone, Copy)]
pub struct FixedPoint(pub BodyPoint);

impl PointSelector for FixedPoint {
    fn select(&self, pose: &PoseResult) -> Option<Landmark> {
        pose.get(self.0)
    }
}

/// The wrist the estimator is more sure about.
///
/// Wrists below `min_confidence` count as not found. A wrist that reports a
/// confidence beats one that does not. Equal confidence (or none on both
/// sides) resolves to `tie_break`.
#[derive(Debug, Clone, Copy)]
pub struct MostConfidentWrist {
    pub tie_break: Side,
    pub min_confidence: f32,
}

impl Default for MostConfidentWrist {
    fn default() -> Self {
        Self {
            tie_break: Side::Right,
            min_confidence: 0.0,
        }
    }
}

impl MostConfidentWrist {
    fn usable(&self, landmark: Option<Landmark>) -> Option<Landmark> {
        landmark.filter(|l| l.confidence.map_or(true, |c| c >= self.min_confidence))
    }
}

impl PointSelector for MostConfidentWrist {
    fn select(&self, pose: &PoseResult) -> Option<Landmark> {
        let left = self.usable(pose.get(BodyPoint::wrist(Side::Left)));
        let right = self.usable(pose.get(BodyPoint::wrist(Side::Right)));

        match (left, right) {
            (None, None) => None,
            (Some(l), None) => Some(l),
            (None, Some(r)) => Some(r),
            (Some(l), Some(r)) => {
                let winner = match (l.confidence, r.confidence) {
                    (Some(lc), Some(rc)) if lc > rc => Side::Left,
                    (Some(lc), Some(rc)) if rc > lc => Side::Right,
                    (Some(_), None) => Side::Left,
                    (None, Some(_)) => Side::Right,
                    _ => self.tie_break,
                };
                match winner {
                    Side::Left => Some(l),
                    Side::Right => Some(r),
                }
            }
        }
    }
}

/// Vertical position of the selected point for every pose, in order.
/// A point with a non-finite `y` counts as not found.
pub fn build_series(poses: &[PoseResult], selector: &impl PointSelector) -> Series {
    Series::new(
        poses
            .iter()
            .map(|pose| selector.select(pose).map(|l| l.y as f64))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TempoError;
    use crate::pipeline::events::{detect_events, EventConfig};
    use crate::pipeline::smoothing::smooth;

    fn lm(y: f32, confidence: Option<f32>) -> Landmark {
        Landmark {
            x: 0.5,
            y,
            confidence,
        }
    }

    fn wrists(left: Option<Landmark>, right: Option<Landmark>) -> PoseResult {
        let mut pose = PoseResult::empty();
        if let Some(l) = left {
            pose = pose.with_landmark(BodyPoint::LeftWrist, l);
        }
        if let Some(r) = right {
            pose = pose.with_landmark(BodyPoint::RightWrist, r);
        }
        pose
    }

    #[test]
    fn test_missing_pose_keeps_placeholder() {
        let poses = vec![
            wrists(None, Some(lm(0.4, Some(0.9)))),
            PoseResult::empty(),
            wrists(None, Some(lm(0.6, Some(0.9)))),
        ];
        let series = build_series(&poses, &FixedPoint(BodyPoint::RightWrist));
        assert_eq!(series.len(), 3);
        assert_eq!(series.as_slice()[1], None);
        assert_eq!(series.missing_count(), 1);
        assert!((series.get(2).unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_higher_confidence_wrist_wins() {
        let selector = MostConfidentWrist::default();
        let pose = wrists(Some(lm(0.2, Some(0.95))), Some(lm(0.7, Some(0.4))));
        assert_eq!(selector.select(&pose).unwrap().y, 0.2);

        let pose = wrists(Some(lm(0.2, Some(0.3))), Some(lm(0.7, Some(0.8))));
        assert_eq!(selector.select(&pose).unwrap().y, 0.7);
    }

    #[test]
    fn test_equal_confidence_uses_tie_break() {
        let pose = wrists(Some(lm(0.2, Some(0.5))), Some(lm(0.7, Some(0.5))));
        assert_eq!(MostConfidentWrist::default().select(&pose).unwrap().y, 0.7);

        let left_handed = MostConfidentWrist {
            tie_break: Side::Left,
            min_confidence: 0.0,
        };
        assert_eq!(left_handed.select(&pose).unwrap().y, 0.2);

        let no_conf = wrists(Some(lm(0.2, None)), Some(lm(0.7, None)));
        assert_eq!(MostConfidentWrist::default().select(&no_conf).unwrap().y, 0.7);
    }

    #[test]
    fn test_reported_confidence_beats_unknown() {
        let pose = wrists(Some(lm(0.2, Some(0.1))), Some(lm(0.7, None)));
        assert_eq!(MostConfidentWrist::default().select(&pose).unwrap().y, 0.2);
    }

    #[test]
    fn test_low_confidence_wrists_are_not_found() {
        let selector = MostConfidentWrist {
            tie_break: Side::Right,
            min_confidence: 0.5,
        };
        let pose = wrists(Some(lm(0.2, Some(0.6))), Some(lm(0.7, Some(0.3))));
        assert_eq!(selector.select(&pose).unwrap().y, 0.2);

        let pose = wrists(Some(lm(0.2, Some(0.1))), Some(lm(0.7, Some(0.3))));
        assert!(selector.select(&pose).is_none());
    }

    #[test]
    fn test_closure_selector() {
        let poses = vec![
            PoseResult::empty().with_landmark(BodyPoint::Nose, lm(0.1, None)),
            PoseResult::empty(),
        ];
        let series = build_series(&poses, &|p: &PoseResult| p.get(BodyPoint::Nose));
        assert_eq!(series.as_slice(), &[Some(0.1f32 as f64), None]);
    }

    #[test]
    fn test_all_missing_is_valid() {
        let poses = vec![PoseResult::empty(); 40];
        let series = build_series(&poses, &MostConfidentWrist::default());
        assert_eq!(series.len(), 40);
        assert_eq!(series.missing_count(), 40);
        assert!(series.dense().is_none());
    }

    #[test]
    fn test_non_finite_samples_are_missing() {
        let series = Series::new(vec![Some(0.2), Some(f64::NAN), Some(f64::INFINITY), None]);
        assert_eq!(series.as_slice(), &[Some(0.2), None, None, None]);
        assert_eq!(Series::from_values(&[f64::NEG_INFINITY, 0.4]).missing_count(), 1);
    }

    fn step_dip_poses(nan_at: Option<usize>) -> Vec<PoseResult> {
        (0..40)
            .map(|i| {
                let y = match i {
                    _ if Some(i) == nan_at => f32::NAN,
                    20..=34 => 0.1,
                    _ => 0.5,
                };
                wrists(None, Some(lm(y, Some(0.9))))
            })
            .collect()
    }

    #[test]
    fn test_nan_landmark_is_interpolated_like_a_gap() {
        let selector = MostConfidentWrist::default();
        let clean = build_series(&step_dip_poses(None), &selector);
        let with_nan = build_series(&step_dip_poses(Some(3)), &selector);

        assert_eq!(with_nan.as_slice()[3], None);
        assert_eq!(with_nan.missing_count(), 1);

        let smoothed = smooth(&with_nan, 9);
        let values = smoothed.dense().unwrap();
        assert!(values.iter().all(|y| y.is_finite()));

        let expected = detect_events(&smooth(&clean, 9), &EventConfig::default()).unwrap();
        let events = detect_events(&smoothed, &EventConfig::default()).unwrap();
        assert_eq!(events, expected);
    }

    #[test]
    fn test_unsmoothed_nan_is_rejected_by_detection() {
        let series = build_series(&step_dip_poses(Some(3)), &MostConfidentWrist::default());
        assert!(matches!(
            detect_events(&series, &EventConfig::default()),
            Err(TempoError::InvalidSwingSequence(_))
        ));
    }
}
