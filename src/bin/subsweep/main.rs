mod catalog;
mod config;
mod logger;
mod subsweep;
mod watch;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::subsweep::SubSweep;

#[derive(Parser, Debug, Clone)]
#[command(author, version, name = env!("CARGO_BIN_NAME"), about = "Find subtitle files and place them next to videos")]
pub(crate) struct SubsweepArgs {
    /// Optional library directory or video file
    #[arg(value_hint = clap::ValueHint::AnyPath)]
    path: Option<PathBuf>,

    /// Print debug information
    #[arg(short = 'D', long)]
    debug: bool,

    /// Only report matches without placing files
    #[arg(short, long)]
    discover: bool,

    /// Maximum directory depth below the Subs folder (0 is unlimited)
    #[arg(short = 'z', long, name = "DEPTH")]
    depth: Option<usize>,

    /// Seconds to wait after the last change before sweeping in watch mode
    #[arg(long, name = "SECONDS")]
    delay: Option<u64>,

    /// Accepted subtitle extension
    #[arg(short = 'x', long, num_args = 1, action = clap::ArgAction::Append, name = "EXTENSION")]
    extension: Vec<String>,

    /// Overwrite existing subtitle files
    #[arg(short, long)]
    force: bool,

    /// Write a log file
    #[arg(short = 'g', long)]
    log: bool,

    /// Print the sweep report as JSON
    #[arg(short, long)]
    json: bool,

    /// Language synonyms, for example "fi|fin|finnish"
    #[arg(short = 'L', long, num_args = 1, action = clap::ArgAction::Append, name = "LANGUAGE")]
    language: Vec<String>,

    /// Move subtitle files instead of copying
    #[arg(short, long = "move")]
    move_files: bool,

    /// Only process videos whose name contains the given text
    #[arg(short, long, name = "NAME")]
    name: Option<String>,

    /// Destination file name pattern
    #[arg(short, long, name = "PATTERN")]
    output: Option<String>,

    /// Only process videos whose path contains the given text
    #[arg(short = 'P', long = "path-filter", name = "PATH")]
    path_filter: Option<String>,

    /// Only print changes without placing files
    #[arg(short, long)]
    print: bool,

    /// Only search the Subs folder itself, not its subdirectories
    #[arg(short, long)]
    shallow: bool,

    /// Subtitle location template, for example "Subs/%l%.%fe%"
    #[arg(short, long, num_args = 1, action = clap::ArgAction::Append, name = "TEMPLATE")]
    template: Vec<String>,

    /// Keep running and sweep again when the library changes
    #[arg(short, long, conflicts_with = "print")]
    watch: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = SubsweepArgs::parse();
    if let Some(ref shell) = args.completion {
        subtitle_sweep::generate_shell_completion(*shell, SubsweepArgs::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        SubSweep::new(args)?.run().await
    }
}
