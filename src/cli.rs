use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "audioslicer")]
#[command(author, version, about = "Split audio files into fixed-length segments without re-encoding")]
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
    /// Start the web page and HTTP API
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Split a single file from the command line
    Split {
        /// Audio file to split
        #[arg(required = true)]
        input: PathBuf,

        /// Segment length in minutes (1-120)
        #[arg(short, long)]
        minutes: Option<u32>,

        /// Directory to write the segments into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Also write all segments as one ZIP archive
        #[arg(long)]
        zip: bool,
    },

    /// Check that ffmpeg and ffprobe are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
