//! Check system capabilities.

use zoomcast_render_engine::{command_exists, encoder};

pub fn run() -> anyhow::Result<()> {
    println!("Zoomcast System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = command_exists("ffmpeg");
    let ffprobe = command_exists("ffprobe");
    println!(
        "{} ffmpeg",
        if ffmpeg { "[OK]  " } else { "[FAIL]" }
    );
    println!(
        "{} ffprobe",
        if ffprobe { "[OK]  " } else { "[FAIL]" }
    );

    if ffmpeg {
        for codec in ["avc1.640028", "hvc1", "vp09.00.10.08"] {
            match encoder::select_encoder(codec) {
                Ok(name) => println!("[OK]   {codec} -> {name}"),
                Err(err) => println!("[WARN] {codec}: {err}"),
            }
        }
    }

    println!();
    if ffmpeg && ffprobe {
        println!("All required tools are available. Zoomcast is ready.");
    } else {
        println!("ffmpeg and ffprobe are required for export. Install ffmpeg first.");
    }

    Ok(())
}
