use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "subcover")]
#[command(author, version, about = "Subtitle coverage for your media library")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show per-episode subtitle coverage
    Coverage {
        /// Language profile id (defaults to profile_id from config)
        #[arg(long)]
        profile: Option<i64>,

        /// Case-insensitive search over title and path
        #[arg(short, long)]
        search: Option<String>,

        /// Sort key: title, path, season, episode, status, added_at
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Page to show (1-based)
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Count missing and upgradeable subtitles
    Missing {
        /// Language profile id (defaults to profile_id from config)
        #[arg(long)]
        profile: Option<i64>,
    },

    /// Start a backend search for every missing subtitle
    SearchMissing {
        /// Language profile id (defaults to profile_id from config)
        #[arg(long)]
        profile: Option<i64>,

        /// Follow progress until the batch finishes
        #[arg(short, long)]
        follow: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        #[arg(value_name = "CONFIG")]
        path: Option<PathBuf>,
    },

    /// Print the language code normalization table
    Languages,

    /// Display version information
    Version,
}
