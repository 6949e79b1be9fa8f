//! Show recording information.

use std::path::PathBuf;

use zoomcast_effect_model::{load_cursor_data, load_recording_meta};
use zoomcast_render_engine::VideoSource;

pub fn run(video: PathBuf) -> anyhow::Result<()> {
    println!("Recording: {}", video.display());
    println!("{}", "=".repeat(50));

    let source = VideoSource::open(&video)?;
    println!("  Resolution: {}x{}", source.width, source.height);
    println!("  Duration: {:.2}s", source.duration_secs);
    println!("  Codec: {}", source.codec);
    match source.declared_fps {
        Some(fps) => println!("  Declared fps: {fps:.3}"),
        None => println!("  Declared fps: (none)"),
    }

    match load_recording_meta(&video)? {
        Some(meta) => {
            println!("  Metadata sidecar: found");
            if let Some(fps) = meta.fps {
                println!("    fps: {fps}");
            }
            if let Some(resolution) = &meta.resolution {
                println!("    resolution: {resolution}");
            }
            if let Some(quality) = &meta.quality {
                println!("    quality: {quality}");
            }
            if let Some(duration) = meta.duration {
                println!("    duration: {duration:.2}s");
            }
            if let Some(timestamp) = meta.timestamp {
                println!("    recorded: {timestamp}");
            }
        }
        None => println!("  Metadata sidecar: not found"),
    }

    match load_cursor_data(&video)? {
        Some(cursor) => {
            println!("  Cursor sidecar: found");
            let clicks = cursor
                .positions
                .iter()
                .filter(|p| p.click_start.unwrap_or(false))
                .count();
            println!("    samples: {}", cursor.positions.len());
            println!("    clicks: {clicks}");
            println!(
                "    screen: {}x{}",
                cursor.screen_width, cursor.screen_height
            );
        }
        None => println!("  Cursor sidecar: not found"),
    }

    println!();
    println!(
        "  Resolved frame rate: {} fps",
        source.resolve_frame_rate(None)
    );

    Ok(())
}
