use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List trending topics for a category
    Trending(TrendingArgs),
    /// Generate a video script for a topic
    Script(ScriptArgs),
    /// Full pipeline: script, images, narration, manifest
    Generate(GenerateArgs),
    /// Play the slideshow timing in the terminal
    Preview(PreviewArgs),
    /// Render a manifest into a downloadable video
    Render(RenderArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TrendingArgs {
    /// Topic category (e.g. technology, science, health)
    pub category: String,
}

#[derive(Args, Debug, Clone)]
pub struct ScriptArgs {
    /// Topic to write about
    pub topic: String,

    /// Topic category
    #[arg(short, long)]
    pub category: String,

    /// Optional extra context for the scriptwriter
    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Topic to build a video for
    pub topic: String,

    /// Topic category
    #[arg(short, long)]
    pub category: String,

    /// Optional extra context for the scriptwriter
    #[arg(short, long)]
    pub description: Option<String>,

    /// Narration voice override
    #[arg(long)]
    pub voice: Option<String>,

    /// Output manifest path; defaults to the asset cache directory
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    /// Manifest produced by the generate command
    #[arg(value_hint = ValueHint::FilePath)]
    pub manifest: PathBuf,

    /// Override the narration duration in seconds
    #[arg(long, value_name = "SECONDS")]
    pub duration: Option<f64>,

    /// Start playback from a specific slide (0-based)
    #[arg(long, value_name = "INDEX")]
    pub slide: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Manifest produced by the generate command
    #[arg(value_hint = ValueHint::FilePath)]
    pub manifest: PathBuf,
}
