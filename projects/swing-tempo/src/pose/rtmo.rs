use super::{BodyPoint, Landmark, PoseEstimator, PoseResult};
use anyhow::Result;
use image::{DynamicImage, RgbImage};
use usls::models::RTMO;
use usls::{Config, Image};

/// A wrapper around the USLS RTMO model that keeps the most confident person
/// and normalizes keypoints to image-relative coordinates.
pub struct RtmoPoseEstimator {
    model: RTMO,
}

impl RtmoPoseEstimator {
    /// Create an estimator, optionally overriding the default model file.
    pub fn new(model_path: Option<&str>) -> Result<Self> {
        let mut config = Config::rtmo_s();
        if let Some(path) = model_path {
            config = config.with_model_file(path);
        }

        #[cfg(target_os = "macos")]
        let config = config.with_model_device(usls::Device::CoreMl);

        let config = config.commit()?;
        let model = RTMO::new(config)?;
        Ok(Self { model })
    }
}

impl PoseEstimator for RtmoPoseEstimator {
    fn infer(&mut self, image: &RgbImage) -> Result<PoseResult> {
        let (width, height) = image.dimensions();
        let input = Image::from(DynamicImage::ImageRgb8(image.clone()));
        let ys = self.model.forward(&[input])?;

        let Some(y) = ys.into_iter().next() else {
            return Ok(PoseResult::empty());
        };

        // One golfer per clip: keep the person whose keypoints are most confident overall.
        let best = y.keypointss.into_iter().max_by(|a, b| {
            mean_confidence(a)
                .partial_cmp(&mean_confidence(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut result = PoseResult::empty();
        if let Some(keypoints) = best {
            for (index, kpt) in keypoints.iter().enumerate() {
                let Some(point) = BodyPoint::from_coco_index(index) else {
                    continue;
                };
                let confidence = kpt.confidence();
                if confidence == Some(0.0) {
                    // RTMO pads invisible points with zeros
                    continue;
                }
                result.landmarks.insert(
                    point,
                    Landmark {
                        x: kpt.x() / width as f32,
                        y: kpt.y() / height as f32,
                        confidence,
                    },
                );
            }
        }
        Ok(result)
    }
}

fn mean_confidence(keypoints: &[usls::Keypoint]) -> f32 {
    if keypoints.is_empty() {
        return 0.0;
    }
    keypoints
        .iter()
        .map(|k| k.confidence().unwrap_or(0.0))
        .sum::<f32>()
        / keypoints.len() as f32
}
