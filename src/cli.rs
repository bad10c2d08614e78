use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::job::Platform;

#[derive(Debug, Parser)]
#[command(
    name = "reelpost",
    version,
    about = "Publish a short video to Instagram Reels and TikTok"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub publish: PublishArgs,

    /// Settings file (defaults to ./config.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Obtain a TikTok access token (OAuth with PKCE)
    TiktokAuth,
}

#[derive(Debug, Default, Args)]
pub struct PublishArgs {
    /// Video file (.mp4)
    #[arg(long, requires = "text")]
    pub video: Option<PathBuf>,

    /// Text file holding the caption
    #[arg(long, requires = "video")]
    pub text: Option<PathBuf>,

    /// Cover image: local file or http(s) URL
    #[arg(long, value_name = "PATH_OR_URL", conflicts_with = "thumbnail_at")]
    pub thumbnail: Option<String>,

    /// Use the frame at this timestamp as cover (5, 5.5, 0:05, 00:00:05)
    #[arg(long, value_name = "TIMESTAMP")]
    pub thumbnail_at: Option<String>,

    /// Platform to publish to; repeat for several (default: every configured one)
    #[arg(long = "platform", value_enum)]
    pub platforms: Vec<Platform>,

    /// Validate everything and print a summary without publishing
    #[arg(long)]
    pub dry_run: bool,
}
