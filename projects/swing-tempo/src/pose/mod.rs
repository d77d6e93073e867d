//! Pose estimation boundary.
//!
//! An estimator maps one image to the named body points it found. Concrete
//! models live behind cargo features; everything downstream only sees
//! [`PoseResult`].

#[cfg(feature = "pose")]
pub mod rtmo;

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// COCO-17 body keypoints, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPoint {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPoint {
    pub const ALL: [BodyPoint; 17] = [
        BodyPoint::Nose,
        BodyPoint::LeftEye,
        BodyPoint::RightEye,
        BodyPoint::LeftEar,
        BodyPoint::RightEar,
        BodyPoint::LeftShoulder,
        BodyPoint::RightShoulder,
        BodyPoint::LeftElbow,
        BodyPoint::RightElbow,
        BodyPoint::LeftWrist,
        BodyPoint::RightWrist,
        BodyPoint::LeftHip,
        BodyPoint::RightHip,
        BodyPoint::LeftKnee,
        BodyPoint::RightKnee,
        BodyPoint::LeftAnkle,
        BodyPoint::RightAnkle,
    ];

    pub fn from_coco_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn wrist(side: Side) -> Self {
        match side {
            Side::Left => BodyPoint::LeftWrist,
            Side::Right => BodyPoint::RightWrist,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    #[default]
    Right,
}

/// A body point in normalized image coordinates, `y` = 0 at the image top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub confidence: Option<f32>,
}

/// Body points found in one frame. Empty when nobody was detected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseResult {
    pub landmarks: BTreeMap<BodyPoint, Landmark>,
}

impl PoseResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_landmark(mut self, point: BodyPoint, landmark: Landmark) -> Self {
        self.landmarks.insert(point, landmark);
        self
    }

    pub fn get(&self, point: BodyPoint) -> Option<Landmark> {
        self.landmarks.get(&point).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

pub trait PoseEstimator {
    fn infer(&mut self, image: &RgbImage) -> Result<PoseResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_indices() {
        assert_eq!(BodyPoint::from_coco_index(0), Some(BodyPoint::Nose));
        assert_eq!(BodyPoint::from_coco_index(9), Some(BodyPoint::LeftWrist));
        assert_eq!(BodyPoint::from_coco_index(10), Some(BodyPoint::RightWrist));
        assert_eq!(BodyPoint::from_coco_index(16), Some(BodyPoint::RightAnkle));
        assert_eq!(BodyPoint::from_coco_index(17), None);
    }

    #[test]
    fn test_body_point_names_round_trip_through_serde() {
        let name = serde_json::to_string(&BodyPoint::RightWrist).unwrap();
        assert_eq!(name, "\"right_wrist\"");
        let back: BodyPoint = serde_json::from_str("\"left_shoulder\"").unwrap();
        assert_eq!(back, BodyPoint::LeftShoulder);
    }
}
