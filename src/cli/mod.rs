pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedcache")]
#[command(about = "Keeps local copies of remote feed files up to date", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/feedcache/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache root directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Number of parallel workers for fetching feeds
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Log at debug level when RUST_LOG is not set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the feeds of a rule file
    Fetch {
        /// Path to the rule file
        rule: PathBuf,

        /// Only fetch this feed
        #[arg(short, long)]
        feed: Option<String>,

        /// Override the remote URL of every fetched feed
        #[arg(long)]
        remote: Option<String>,

        /// Download even if the cache looks fresh
        #[arg(long)]
        force: bool,

        /// Decompress gzip/zip content after fetching
        #[arg(long)]
        decode: bool,
    },
    /// Fetch a single URL into the cache
    Get {
        /// Remote URL
        url: String,

        /// Feed name, used as the cache file name when the URL has none
        #[arg(short, long, default_value = "feed")]
        feed: String,

        /// Download even if the cache looks fresh
        #[arg(long)]
        force: bool,

        /// Decompress gzip/zip content after fetching
        #[arg(long)]
        decode: bool,
    },
    /// Show the cache state of a rule's feeds
    Status {
        /// Path to the rule file
        rule: PathBuf,

        /// Only show this feed
        #[arg(short, long)]
        feed: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Keep refreshing a rule's feeds until interrupted
    Watch {
        /// Path to the rule file
        rule: PathBuf,

        /// Refresh interval (e.g., "1h", "30m", "6h", "1d")
        #[arg(short, long, default_value = "1h")]
        interval: String,

        /// Skip the refresh on start
        #[arg(long)]
        no_initial_update: bool,
    },
}
