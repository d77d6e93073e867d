use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use swing_tempo::config::{AnalysisConfig, WristChoice};
use swing_tempo::pipeline::events::DEFAULT_IMPACT_TOLERANCE;
use swing_tempo::pipeline::smoothing::DEFAULT_SMOOTHING_WINDOW;
use swing_tempo::video::Backend;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a single swing video
    Analyze {
        /// Video file to analyze
        #[arg(long)]
        video: PathBuf,

        #[command(flatten)]
        video_opts: VideoOpts,

        #[command(flatten)]
        analysis: AnalysisOpts,
    },

    /// Analyze every .mp4/.mov under a directory
    Batch {
        /// Root directory for video files
        #[arg(long, env = "SWING_TEMPO_VIDEO_ROOT")]
        video_root: PathBuf,

        #[command(flatten)]
        video_opts: VideoOpts,

        #[command(flatten)]
        analysis: AnalysisOpts,
    },

    /// Analyze precomputed landmarks (frame,point,x,y,confidence)
    Landmarks {
        /// Landmark CSV file
        #[arg(long)]
        csv: PathBuf,

        /// Frame rate the landmarks were sampled at
        #[arg(long)]
        fps: f64,

        /// Total frame count, if trailing frames have no pose
        #[arg(long)]
        frames: Option<usize>,

        #[command(flatten)]
        analysis: AnalysisOpts,
    },

    /// Tempo from manually placed markers, in seconds
    Tempo {
        #[arg(long)]
        address: f64,

        #[arg(long)]
        top: f64,

        #[arg(long)]
        impact: f64,
    },
}

#[derive(ClapArgs, Debug)]
pub struct VideoOpts {
    /// Video decoding backend
    #[arg(long, value_enum, default_value_t = Backend::Ffmpeg, env = "SWING_TEMPO_BACKEND")]
    pub backend: Backend,

    /// Pose model file (defaults to the RTMO-s release)
    #[arg(long, env = "SWING_TEMPO_MODEL")]
    pub model: Option<String>,

    /// Stop decoding after this many frames
    #[arg(long)]
    pub max_frames: Option<usize>,
}

#[derive(ClapArgs, Debug)]
pub struct AnalysisOpts {
    /// Root directory for output artifacts
    #[arg(long, env = "SWING_TEMPO_OUTPUT_ROOT")]
    pub output_root: Option<PathBuf>,

    /// Moving average window, in frames
    #[arg(long, default_value_t = DEFAULT_SMOOTHING_WINDOW, env = "SWING_TEMPO_SMOOTHING_WINDOW")]
    pub smoothing_window: usize,

    /// Distance from the address height that counts as impact
    #[arg(long, default_value_t = DEFAULT_IMPACT_TOLERANCE, env = "SWING_TEMPO_IMPACT_TOLERANCE")]
    pub impact_tolerance: f64,

    /// Wrist to track
    #[arg(long, value_enum, default_value_t = WristChoice::Auto, env = "SWING_TEMPO_WRIST")]
    pub wrist: WristChoice,

    /// Ignore landmarks below this confidence
    #[arg(long, default_value_t = 0.0, env = "SWING_TEMPO_MIN_CONFIDENCE")]
    pub min_confidence: f32,
}

impl AnalysisOpts {
    pub fn to_config(&self, video_opts: Option<&VideoOpts>) -> AnalysisConfig {
        AnalysisConfig {
            smoothing_window: self.smoothing_window,
            impact_tolerance: self.impact_tolerance,
            wrist: self.wrist,
            min_confidence: self.min_confidence,
            max_frames: video_opts.and_then(|v| v.max_frames),
            backend: video_opts.map(|v| v.backend).unwrap_or_default(),
        }
    }
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_analyze_defaults() {
        let args = Args::try_parse_from(["swing-tempo", "analyze", "--video", "swing.mp4"]).unwrap();
        let Command::Analyze {
            video,
            video_opts,
            analysis,
        } = args.command
        else {
            panic!("expected analyze");
        };
        assert_eq!(video, PathBuf::from("swing.mp4"));
        let config = analysis.to_config(Some(&video_opts));
        assert_eq!(config.smoothing_window, 9);
        assert_eq!(config.impact_tolerance, 0.03);
        assert_eq!(config.backend, Backend::Ffmpeg);
    }

    #[test]
    fn test_landmarks_options() {
        let args = Args::try_parse_from([
            "swing-tempo",
            "landmarks",
            "--csv",
            "poses.csv",
            "--fps",
            "60",
            "--wrist",
            "left",
            "--smoothing-window",
            "7",
        ])
        .unwrap();
        let Command::Landmarks {
            fps,
            frames,
            analysis,
            ..
        } = args.command
        else {
            panic!("expected landmarks");
        };
        assert_eq!(fps, 60.0);
        assert_eq!(frames, None);
        let config = analysis.to_config(None);
        assert_eq!(config.wrist, WristChoice::Left);
        assert_eq!(config.smoothing_window, 7);
    }

    #[test]
    fn test_landmarks_requires_fps() {
        assert!(Args::try_parse_from(["swing-tempo", "landmarks", "--csv", "poses.csv"]).is_err());
    }
}
