use crate::config::AnalysisConfig;
use crate::pipeline::orchestrator::SwingAnalysis;
use crate::pose::{BodyPoint, Landmark, PoseResult};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: [&str; 2] = ["mp4", "mov"];

/// Upper bound on frame indices in a landmark file (over an hour at 240 fps).
pub const MAX_LANDMARK_FRAMES: usize = 1_000_000;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VideoMetadata {
    pub original_name: String,
    pub created_at: DateTime<Utc>,
    pub run_id: String,
    pub config: AnalysisConfig,
    #[serde(skip)]
    pub output_dir: PathBuf,
}

pub fn list_videos(video_root: &Path) -> Vec<PathBuf> {
    let mut videos: Vec<PathBuf> = WalkDir::new(video_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| VIDEO_EXTENSIONS.contains(&s.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    videos.sort();
    videos
}

/// Run directory name for an input: its path below `input_root` without the
/// extension, or just the file stem when there is no root.
pub fn run_id_for(input: &Path, input_root: Option<&Path>) -> Result<PathBuf> {
    let relative = input_root
        .and_then(|root| input.strip_prefix(root).ok())
        .filter(|rel| rel.components().all(|c| matches!(c, Component::Normal(_))))
        .map(Path::to_path_buf)
        .or_else(|| input.file_name().map(PathBuf::from))
        .ok_or_else(|| anyhow::anyhow!("Invalid input path: {}", input.display()))?;

    if relative.file_stem().is_none() {
        anyhow::bail!("Invalid input path: {}", input.display());
    }
    Ok(relative.with_extension(""))
}

/// Fails if a run with this id already has a directory under `output_root`.
pub fn ensure_run_available(output_root: &Path, run_id: &Path) -> Result<()> {
    if output_root.join(run_id).exists() {
        anyhow::bail!("Output directory already exists for: {}", run_id.display());
    }
    Ok(())
}

/// Creates `<output_root>/<run_id>/` and writes `metadata.json`.
/// Fails if the run directory already exists.
pub fn create_run(
    output_root: &Path,
    run_id: &Path,
    original_name: &str,
    config: &AnalysisConfig,
) -> Result<VideoMetadata> {
    ensure_run_available(output_root, run_id)?;

    let output_dir = output_root.join(run_id);
    fs::create_dir_all(&output_dir)?;

    let metadata = VideoMetadata {
        original_name: original_name.to_string(),
        created_at: Utc::now(),
        run_id: run_id.to_string_lossy().into_owned(),
        config: config.clone(),
        output_dir: output_dir.clone(),
    };

    let metadata_path = output_dir.join("metadata.json");
    let content = serde_json::to_string_pretty(&metadata)?;
    fs::write(metadata_path, content)?;

    Ok(metadata)
}

/// Writes a finished analysis as a new run: metadata, series and summary.
/// A partially written run directory is removed again.
pub fn save_run(
    output_root: &Path,
    run_id: &Path,
    original_name: &str,
    config: &AnalysisConfig,
    analysis: &SwingAnalysis,
) -> Result<VideoMetadata> {
    let metadata = create_run(output_root, run_id, original_name, config)?;

    let written = write_series_csv(&metadata, analysis)
        .and_then(|_| write_analysis(&metadata, analysis));
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_dir_all(&metadata.output_dir) {
            tracing::warn!(
                "Failed to remove incomplete run {}: {}",
                metadata.output_dir.display(),
                cleanup
            );
        }
        return Err(e);
    }

    tracing::info!("Wrote run artifacts to {}", metadata.output_dir.display());
    Ok(metadata)
}

#[derive(Serialize)]
struct SeriesRow {
    frame_index: usize,
    raw_y: Option<f64>,
    smoothed_y: Option<f64>,
}

/// `series.csv`: one row per analyzed frame, empty cells for missing samples.
pub fn write_series_csv(metadata: &VideoMetadata, analysis: &SwingAnalysis) -> Result<PathBuf> {
    let path = metadata.output_dir.join("series.csv");
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let smoothed = analysis.smoothed_series.as_slice();
    for (frame_index, raw_y) in analysis.raw_series.as_slice().iter().enumerate() {
        writer.serialize(SeriesRow {
            frame_index,
            raw_y: *raw_y,
            smoothed_y: smoothed.get(frame_index).copied().flatten(),
        })?;
    }
    writer.flush()?;
    Ok(path)
}

pub fn write_analysis(metadata: &VideoMetadata, analysis: &SwingAnalysis) -> Result<PathBuf> {
    let path = metadata.output_dir.join("analysis.json");
    fs::write(&path, serde_json::to_string_pretty(analysis)?)?;
    Ok(path)
}

#[derive(Deserialize)]
struct LandmarkRow {
    frame: usize,
    point: BodyPoint,
    x: f32,
    y: f32,
    confidence: Option<f32>,
}

/// Poses from a landmark CSV (`frame,point,x,y,confidence`).
///
/// Frames without rows become empty poses. The frame count is the highest
/// frame index + 1 unless `frame_count` is given. Both are capped at
/// [`MAX_LANDMARK_FRAMES`].
pub fn load_landmarks_csv(path: &Path, frame_count: Option<usize>) -> Result<Vec<PoseResult>> {
    if let Some(n) = frame_count.filter(|&n| n > MAX_LANDMARK_FRAMES) {
        anyhow::bail!(
            "Declared frame count {} exceeds the limit of {}",
            n,
            MAX_LANDMARK_FRAMES
        );
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open landmark file {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<LandmarkRow>().enumerate() {
        let row = record.with_context(|| format!("Bad landmark row {}", line + 1))?;
        if row.frame >= MAX_LANDMARK_FRAMES {
            anyhow::bail!(
                "Landmark row {} references frame {}, beyond the limit of {} frames",
                line + 1,
                row.frame,
                MAX_LANDMARK_FRAMES
            );
        }
        rows.push(row);
    }

    let inferred = rows.iter().map(|r| r.frame + 1).max().unwrap_or(0);
    let total = match frame_count {
        Some(n) if n < inferred => anyhow::bail!(
            "Landmark file references frame {} but only {} frames were declared",
            inferred - 1,
            n
        ),
        Some(n) => n,
        None => inferred,
    };

    let mut poses = vec![PoseResult::empty(); total];
    for row in rows {
        poses[row.frame].landmarks.insert(
            row.point,
            Landmark {
                x: row.x,
                y: row.y,
                confidence: row.confidence,
            },
        );
    }

    tracing::info!(
        "Loaded {} frames ({} with a pose) from {}",
        poses.len(),
        poses.iter().filter(|p| !p.is_empty()).count(),
        path.display()
    );
    Ok(poses)
}
