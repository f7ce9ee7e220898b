use clap::{Args, Parser, Subcommand};

use crate::formats::Category;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Generate(GenerateArgs),
    Normalize(NormalizeArgs),
    Play(PlayArgs),
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// What the story should be about.
    #[arg(long)]
    pub prompt: String,

    /// Photo of the child to feature (jpeg/png/webp).
    #[arg(long)]
    pub image: Option<String>,

    /// Story mode (default: let the model decide).
    #[arg(long, value_enum)]
    pub mode: Option<Category>,

    /// Write the story JSON here instead of stdout.
    #[arg(long)]
    pub out: Option<String>,

    /// Overwrite `--out` if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Raw model output (default: stdin).
    #[arg(long)]
    pub input: Option<String>,

    /// Category used when the output does not name one.
    #[arg(long, value_enum)]
    pub mode: Option<Category>,
}

#[derive(Debug, Args)]
pub struct PlayArgs {
    /// Story JSON (as written by `generate`).
    #[arg(long)]
    pub story: String,

    /// Read n / p / space / q commands from stdin instead of auto-playing.
    #[arg(long, default_value_t = false)]
    pub interactive: bool,

    /// Keep synthesized narration audio in this directory.
    #[arg(long)]
    pub audio_dir: Option<String>,

    /// Seconds a page stays up when there is no narration audio.
    #[arg(long, default_value_t = 5.0)]
    pub dwell_secs: f64,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Story JSON (as written by `generate`).
    #[arg(long)]
    pub story: String,

    /// Output text file (default: stdout).
    #[arg(long, conflicts_with = "out_dir")]
    pub out: Option<String>,

    /// Write `<title>.txt` into this directory.
    #[arg(long)]
    pub out_dir: Option<String>,

    /// Overwrite the output if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}
