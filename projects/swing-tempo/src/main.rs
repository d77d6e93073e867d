mod cli;

use anyhow::{Context, Result};
use cli::{AnalysisOpts, Args, Command, VideoOpts};
use serde_json::json;
use std::path::{Path, PathBuf};
use swing_tempo::config::AnalysisConfig;
use swing_tempo::pipeline::orchestrator::{analyze_poses, analyze_video, SwingAnalysis};
use swing_tempo::pipeline::tempo::compute_tempo;
use swing_tempo::pose::PoseEstimator;
use swing_tempo::run_context::{
    ensure_run_available, list_videos, load_landmarks_csv, run_id_for, save_run,
};
use swing_tempo::video::timing::VideoTiming;
use swing_tempo::video::FileSource;

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse_args();

    match args.command {
        Command::Analyze {
            video,
            video_opts,
            analysis,
        } => run_analyze(&video, &video_opts, &analysis),
        Command::Batch {
            video_root,
            video_opts,
            analysis,
        } => run_batch(&video_root, &video_opts, &analysis),
        Command::Landmarks {
            csv,
            fps,
            frames,
            analysis,
        } => run_landmarks(&csv, fps, frames, &analysis),
        Command::Tempo {
            address,
            top,
            impact,
        } => {
            let metrics = compute_tempo(address, top, impact);
            println!("{}", serde_json::to_string_pretty(&metrics)?);
            Ok(())
        }
    }
}

#[cfg(feature = "pose")]
fn build_estimator(model: Option<&str>) -> Result<Box<dyn PoseEstimator>> {
    use swing_tempo::pose::rtmo::RtmoPoseEstimator;
    Ok(Box::new(RtmoPoseEstimator::new(model)?))
}

#[cfg(not(feature = "pose"))]
fn build_estimator(_model: Option<&str>) -> Result<Box<dyn PoseEstimator>> {
    anyhow::bail!("Pose estimation is not compiled in (rebuild with --features pose)")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("video")
        .to_string()
}

/// Where a run will be saved, checked before any work is done.
struct RunTarget<'a> {
    output_root: &'a Path,
    run_id: PathBuf,
}

fn plan_run<'a>(
    output_root: Option<&'a Path>,
    input: &Path,
    input_root: Option<&Path>,
) -> Result<Option<RunTarget<'a>>> {
    let Some(output_root) = output_root else {
        return Ok(None);
    };
    let run_id = run_id_for(input, input_root)?;
    ensure_run_available(output_root, &run_id)?;
    Ok(Some(RunTarget {
        output_root,
        run_id,
    }))
}

fn finish_run(
    target: Option<RunTarget<'_>>,
    input: &Path,
    config: &AnalysisConfig,
    analysis: &SwingAnalysis,
) -> Result<()> {
    if let Some(target) = target {
        save_run(
            target.output_root,
            &target.run_id,
            &file_name(input),
            config,
            analysis,
        )?;
    }
    Ok(())
}

/// Analyze one video; run artifacts are only written when the analysis succeeds.
fn analyze_one(
    video: &Path,
    video_root: Option<&Path>,
    config: &AnalysisConfig,
    estimator: &mut dyn PoseEstimator,
    output_root: Option<&Path>,
) -> Result<SwingAnalysis> {
    let target = plan_run(output_root, video, video_root)?;
    let source = FileSource::new(video, config.backend);
    let analysis = analyze_video(&source, estimator, config)
        .with_context(|| format!("Analysis failed for {}", video.display()))?;
    finish_run(target, video, config, &analysis)?;
    Ok(analysis)
}

fn run_analyze(video: &Path, video_opts: &VideoOpts, opts: &AnalysisOpts) -> Result<()> {
    let config = opts.to_config(Some(video_opts));
    let mut estimator = build_estimator(video_opts.model.as_deref())?;
    let analysis = analyze_one(
        video,
        None,
        &config,
        estimator.as_mut(),
        opts.output_root.as_deref(),
    )?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn run_batch(video_root: &Path, video_opts: &VideoOpts, opts: &AnalysisOpts) -> Result<()> {
    let config = opts.to_config(Some(video_opts));
    let videos = list_videos(video_root);
    tracing::info!("Found {} videos under {}", videos.len(), video_root.display());

    let mut estimator = build_estimator(video_opts.model.as_deref())?;
    let mut results = Vec::with_capacity(videos.len());
    let mut failures = 0;
    for video in &videos {
        match analyze_one(
            video,
            Some(video_root),
            &config,
            estimator.as_mut(),
            opts.output_root.as_deref(),
        ) {
            Ok(analysis) => results.push(json!({
                "video": video,
                "analysis": analysis,
            })),
            Err(e) => {
                failures += 1;
                tracing::error!("{:#}", e);
                results.push(json!({
                    "video": video,
                    "error": format!("{:#}", e),
                }));
            }
        }
    }

    tracing::info!(
        "Batch finished: {} analyzed, {} failed",
        videos.len() - failures,
        failures
    );
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn run_landmarks(csv: &Path, fps: f64, frames: Option<usize>, opts: &AnalysisOpts) -> Result<()> {
    let config = opts.to_config(None);
    let target = plan_run(opts.output_root.as_deref(), csv, None)?;

    let poses = load_landmarks_csv(csv, frames)?;
    let timing = VideoTiming::new(fps, poses.len());
    let analysis = analyze_poses(&poses, timing, &config)
        .with_context(|| format!("Analysis failed for {}", csv.display()))?;

    finish_run(target, csv, &config, &analysis)?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
