use clap::Parser;
use std::path::PathBuf;

/// Generate an M3U playlist from YouTube references using yt-dlp.
#[derive(Debug, Parser)]
#[command(name = "tubelist", version, about)]
pub struct Args {
    /// Input file with one URL or video id per line.
    #[arg(short, long, default_value = "youtube_urls.txt")]
    pub input: PathBuf,

    /// Output M3U file.
    #[arg(short, long, default_value = "youtube_streams.m3u")]
    pub output: PathBuf,

    /// JSON settings file.
    #[arg(short, long, default_value = "settings_youtube.json")]
    pub config: PathBuf,

    /// Append a timestamp to the output file name.
    #[arg(long)]
    pub timestamp: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
