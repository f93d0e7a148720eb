// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::keypoints::Visibility;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Examples:
    pose-annotator info --output dataset/
    pose-annotator label -o dataset/ --frames squat_01/ --frame 5 --point nose=100,100
    pose-annotator label -o dataset/ --video squat.mp4 --frame 5 --point left_eye=92,95,1 --yes
    pose-annotator show -o dataset/ --image-id 1"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,

    /// Show verbose output
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print dataset statistics and the labeled frames
    Info(InfoArgs),
    /// Label one frame and save it into the dataset
    Label(LabelArgs),
    /// Replay a saved record
    Show(ShowArgs),
}

/// Arguments for the info command.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Output directory holding annotations.json and frames/
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for the label command.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["video", "frames"])))]
pub struct LabelArgs {
    /// Output directory holding annotations.json and frames/
    #[arg(short, long)]
    pub output: PathBuf,

    /// Video file to read the frame from
    #[arg(long)]
    pub video: Option<PathBuf>,

    /// Directory of images treated as a frame sequence
    #[arg(long)]
    pub frames: Option<PathBuf>,

    /// 0-based frame index
    #[arg(long, default_value_t = 0)]
    pub frame: usize,

    /// Keypoint to set, as NAME=X,Y[,V] (V: 2 visible, 1 occluded)
    #[arg(long = "point", value_name = "NAME=X,Y[,V]")]
    pub points: Vec<PointArg>,

    /// Keypoint to clear
    #[arg(long = "clear", value_name = "NAME")]
    pub clear: Vec<String>,

    /// Clear every keypoint before applying --point
    #[arg(long, default_value_t = false)]
    pub clear_all: bool,

    /// Overwrite an existing record without asking
    #[arg(short, long, default_value_t = false)]
    pub yes: bool,
}

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output directory holding annotations.json and frames/
    #[arg(short, long)]
    pub output: PathBuf,

    /// Image id of the record
    #[arg(long)]
    pub image_id: u64,

    /// Read the frame live from this video instead of the saved JPEG
    #[arg(long)]
    pub video: Option<PathBuf>,
}

/// A `--point NAME=X,Y[,V]` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct PointArg {
    /// Keypoint name.
    pub name: String,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Visibility, visible when omitted.
    pub visibility: Visibility,
}

impl FromStr for PointArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, coords) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=X,Y[,V], got '{s}'"))?;
        let parts: Vec<&str> = coords.split(',').map(str::trim).collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(format!("expected X,Y[,V] after '=', got '{coords}'"));
        }

        let coord = |v: &str| {
            v.parse::<f64>()
                .ok()
                .filter(|c| c.is_finite())
                .ok_or_else(|| format!("invalid coordinate '{v}'"))
        };
        let visibility = match parts.get(2) {
            Some(v) => v.parse::<Visibility>()?,
            None => Visibility::Visible,
        };

        Ok(Self {
            name: name.trim().to_string(),
            x: coord(parts[0])?,
            y: coord(parts[1])?,
            visibility,
        })
    }
}
