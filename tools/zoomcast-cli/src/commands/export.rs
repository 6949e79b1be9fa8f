//! Export a recording to video.

use std::path::PathBuf;

use zoomcast_common::config::AppConfig;
use zoomcast_effect_model::{
    load_cursor_data, BackgroundSpec, CornerStyle, CropRegion, ExportSettings, FocusPoint,
    ZoomDepth, ZoomRegion,
};
use zoomcast_render_engine::{export, CancelFlag, ExportJob, ExportProgress, ProgressCallback};

pub struct ExportArgs {
    pub video: PathBuf,
    pub output: Option<PathBuf>,
    pub settings: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate: Option<u64>,
    pub codec: Option<String>,
    pub background: Option<String>,
    pub background_blur: Option<u32>,
    pub padding: Option<f64>,
    pub corner_radius: Option<f64>,
    pub corner_style: Option<String>,
    pub crop: Option<String>,
    pub zoom_regions: Vec<String>,
    pub no_cursor: bool,
    pub no_shadow: bool,
    pub motion_blur: bool,
}

pub async fn run(args: ExportArgs) -> anyhow::Result<()> {
    println!("Exporting recording: {}", args.video.display());

    let settings = build_settings(&args)?;

    let output_path = args.output.unwrap_or_else(|| {
        let mut path = args.video.clone();
        path.set_extension("export.mp4");
        path
    });

    println!("  Output: {}", output_path.display());
    println!("  Resolution: {}x{}", settings.width, settings.height);
    println!("  Codec: {}", settings.codec);
    if !settings.zoom_regions.is_empty() {
        println!("  Zoom regions: {}", settings.zoom_regions.len());
    }
    if settings.cursor_data.is_some() {
        println!("  Cursor sidecar: found");
    }

    let job = ExportJob {
        input_path: args.video,
        output_path: output_path.clone(),
        settings,
    };

    let cancel = CancelFlag::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling export...");
            ctrl_c_cancel.cancel();
        }
    });

    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.percentage, p.current_frame, p.total_frames, p.eta_secs,
        );
    });

    let result =
        tokio::task::spawn_blocking(move || export(&job, Some(progress_cb), &cancel)).await?;

    match result {
        Ok(outcome) => {
            println!(
                "\nExport complete: {} ({} frames)",
                outcome.output_path.display(),
                outcome.frames
            );
            Ok(())
        }
        Err(err) if err.is_cancelled() => {
            println!("\nExport cancelled.");
            Ok(())
        }
        Err(err) => Err(anyhow::anyhow!("Export failed: {err}")),
    }
}

/// Merge defaults, an optional settings file, and flag overrides.
fn build_settings(args: &ExportArgs) -> anyhow::Result<ExportSettings> {
    let defaults = AppConfig::load().export;

    let mut settings = match &args.settings {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
            serde_json::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))?
        }
        None => ExportSettings {
            width: args.width,
            height: args.height,
            frame_rate: defaults.fps,
            bitrate: defaults.bitrate,
            codec: defaults.codec.clone(),
            background: BackgroundSpec::parse(&defaults.background)
                .map_err(|e| anyhow::anyhow!("Bad default background: {e}"))?,
            padding_percent: defaults.padding_percent,
            ..Default::default()
        },
    };

    if args.fps > 0 {
        settings.frame_rate = args.fps;
    }
    if let Some(bitrate) = args.bitrate {
        settings.bitrate = bitrate;
    }
    if let Some(codec) = &args.codec {
        settings.codec = codec.clone();
    }
    if let Some(background) = &args.background {
        settings.background = BackgroundSpec::parse(background)
            .map_err(|e| anyhow::anyhow!("Bad background '{background}': {e}"))?;
    }
    if let Some(blur) = args.background_blur {
        settings.background_blur_px = blur;
    }
    if let Some(padding) = args.padding {
        settings.padding_percent = padding;
    }
    if let Some(radius) = args.corner_radius {
        settings.corners.radius = radius;
    }
    if let Some(style) = &args.corner_style {
        settings.corners.style = match style.as_str() {
            "squircle" => CornerStyle::Squircle,
            "rounded" => CornerStyle::Rounded,
            other => {
                return Err(anyhow::anyhow!(
                    "Unknown corner style '{other}'. Use: squircle, rounded"
                ))
            }
        };
    }
    if let Some(crop) = &args.crop {
        settings.crop = parse_crop(crop)?;
    }
    if args.no_cursor {
        settings.cursor.enabled = false;
    }
    if args.no_shadow {
        settings.shadow.enabled = false;
    }
    if args.motion_blur {
        settings.motion_blur = true;
    }

    for (i, spec) in args.zoom_regions.iter().enumerate() {
        settings.zoom_regions.push(parse_zoom_region(i, spec)?);
    }

    if settings.cursor.enabled && settings.cursor_data.is_none() {
        settings.cursor_data = load_cursor_data(&args.video)
            .map_err(|e| anyhow::anyhow!("Failed to load cursor sidecar: {e}"))?;
    }

    Ok(settings)
}

/// Parse a normalized `x,y,w,h` crop window.
fn parse_crop(spec: &str) -> anyhow::Result<CropRegion> {
    let parts: Vec<f64> = spec
        .split(',')
        .map(|p| p.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|_| anyhow::anyhow!("Bad crop '{spec}'. Use x,y,w,h in [0, 1]"))?;
    if parts.len() != 4 {
        return Err(anyhow::anyhow!("Bad crop '{spec}'. Use x,y,w,h in [0, 1]"));
    }
    Ok(CropRegion::new(parts[0], parts[1], parts[2], parts[3]))
}

/// Parse `start_ms:end_ms:depth[:cx,cy]`, e.g. `1000:4000:medium:0.3,0.7`.
fn parse_zoom_region(index: usize, spec: &str) -> anyhow::Result<ZoomRegion> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() < 3 || parts.len() > 4 {
        return Err(anyhow::anyhow!(
            "Bad zoom region '{spec}'. Use start_ms:end_ms:depth[:cx,cy]"
        ));
    }

    let start_ms: f64 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("Bad zoom start '{}'", parts[0]))?;
    let end_ms: f64 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("Bad zoom end '{}'", parts[1]))?;

    let depth = match parts[2] {
        "subtle" => ZoomDepth::Subtle,
        "medium" => ZoomDepth::Medium,
        "deep" => ZoomDepth::Deep,
        other => {
            return Err(anyhow::anyhow!(
                "Unknown zoom depth '{other}'. Use: subtle, medium, deep"
            ))
        }
    };

    let focus = match parts.get(3) {
        Some(pair) => {
            let (cx, cy) = pair
                .split_once(',')
                .ok_or_else(|| anyhow::anyhow!("Bad focus '{pair}'. Use cx,cy"))?;
            FocusPoint::new(
                cx.trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Bad focus x '{cx}'"))?,
                cy.trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Bad focus y '{cy}'"))?,
            )
        }
        None => FocusPoint::CENTER,
    };

    Ok(ZoomRegion::new(
        format!("cli-{index}"),
        start_ms,
        end_ms,
        depth,
        focus,
    ))
}
