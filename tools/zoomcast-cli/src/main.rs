//! Zoomcast CLI — offline export of screen recordings with editing effects.
//!
//! Usage:
//!   zoomcast export <VIDEO> [OPTIONS]   Render a recording to a final mp4
//!   zoomcast info <VIDEO>               Probe a recording and its sidecars
//!   zoomcast check                      Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "zoomcast",
    about = "Screen recording export with automatic zoom and cursor effects",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a recording to video
    Export {
        /// Path to the recorded video
        video: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to a JSON file with full export settings
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Output width
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Output height
        #[arg(long, default_value = "1080")]
        height: u32,

        /// Output frame rate (0 = auto-detect from the recording)
        #[arg(long, default_value = "0")]
        fps: u32,

        /// Video bitrate in bits per second
        #[arg(long)]
        bitrate: Option<u64>,

        /// Codec string in MIME form (avc1.640028, hvc1, ...)
        #[arg(long)]
        codec: Option<String>,

        /// Background: hex color, gradient expression, or image path
        #[arg(long)]
        background: Option<String>,

        /// Blur radius applied to the background, in pixels
        #[arg(long)]
        background_blur: Option<u32>,

        /// Padding around the video as a percentage of the stage (0-50)
        #[arg(long)]
        padding: Option<f64>,

        /// Corner radius in display pixels (0 disables rounding)
        #[arg(long)]
        corner_radius: Option<f64>,

        /// Corner style: squircle|rounded
        #[arg(long)]
        corner_style: Option<String>,

        /// Source crop as normalized x,y,w,h (e.g. 0.1,0.1,0.8,0.8)
        #[arg(long)]
        crop: Option<String>,

        /// Zoom region as start_ms:end_ms:depth[:cx,cy]
        /// (depth: subtle|medium|deep)
        #[arg(long = "zoom")]
        zoom_regions: Vec<String>,

        /// Disable the synthetic cursor overlay
        #[arg(long)]
        no_cursor: bool,

        /// Disable the drop shadow under the video layer
        #[arg(long)]
        no_shadow: bool,

        /// Enable motion blur on fast camera movement
        #[arg(long)]
        motion_blur: bool,
    },

    /// Show recording information
    Info {
        /// Path to the recorded video
        video: PathBuf,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    zoomcast_common::logging::init_logging(&zoomcast_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Export {
            video,
            output,
            settings,
            width,
            height,
            fps,
            bitrate,
            codec,
            background,
            background_blur,
            padding,
            corner_radius,
            corner_style,
            crop,
            zoom_regions,
            no_cursor,
            no_shadow,
            motion_blur,
        } => {
            commands::export::run(commands::export::ExportArgs {
                video,
                output,
                settings,
                width,
                height,
                fps,
                bitrate,
                codec,
                background,
                background_blur,
                padding,
                corner_radius,
                corner_style,
                crop,
                zoom_regions,
                no_cursor,
                no_shadow,
                motion_blur,
            })
            .await
        }
        Commands::Info { video } => commands::info::run(video),
        Commands::Check => commands::check::run(),
    }
}
