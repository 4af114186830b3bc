use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelforge")]
#[command(author, version, about = "Scheduled short-video generation and publishing")]
pub struct Cli {
    /// Path to config file (JSON, or TOML by extension)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the scheduler and run until interrupted
    Start {
        /// Run one tick immediately instead of waiting for the schedule
        #[arg(long)]
        now: bool,
    },

    /// Run a single tick for all users (or one) and print the run reports
    RunOnce {
        /// Only run the user with this email
        #[arg(long)]
        user: Option<String>,
    },

    /// Fetch content for a topic and print it as JSON
    Fetch {
        /// Topic to search for
        #[arg(required = true)]
        topic: String,

        /// Content source to query (repeatable)
        #[arg(short, long = "source", default_values_t = [String::from("wikipedia")])]
        sources: Vec<String>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// List recorded videos
    Videos {
        /// Show a single video by ID
        #[arg(long, conflicts_with_all = ["user", "limit"])]
        id: Option<String>,

        /// Only videos for this user
        #[arg(long)]
        user: Option<String>,

        /// Maximum number of videos to show
        #[arg(long, default_value = "20")]
        limit: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display version information
    Version,
}
