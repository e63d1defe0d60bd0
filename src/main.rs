use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use image::ImageReader;
use tracing::{info, warn};

use docscan::{
    Frame, FrameOutcome, ImageprocOps, Pipeline, ScanSession, ScannerConfig, SkipReason,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Layout {
    /// One document anywhere in the frame
    Document,
    /// Four dark markers in corner guide boxes
    Markers,
}

#[derive(Parser)]
#[command(name = "docscan")]
#[command(about = "Find a document in camera frames and rectify it")]
struct Cli {
    /// Image files fed to the scanner as consecutive frames
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// How many frames each image is repeated for
    #[arg(long, default_value_t = 10)]
    repeat: u32,

    /// Detection preset (ignored when --config is given)
    #[arg(long, value_enum, default_value_t = Layout::Document)]
    layout: Layout,

    /// JSON scanner configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the rectified document (PNG)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Save preprocessing stages of the first frame to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = match &args.config {
        Some(path) => ScannerConfig::from_json_file(path)?,
        None => match args.layout {
            Layout::Document => ScannerConfig::document(),
            Layout::Markers => ScannerConfig::markers(),
        },
    };

    let fps = if config.session.target_fps > 0.0 {
        config.session.target_fps
    } else {
        10.0
    };
    let frame_interval = Duration::from_secs_f64(1.0 / fps as f64);

    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let img = ImageReader::open(path)?
            .decode()
            .map_err(|e| anyhow::anyhow!("Failed to decode image {}: {}", path.display(), e))?;
        info!(path = %path.display(), width = img.width(), height = img.height(), "Image loaded");
        images.push(img);
    }

    let (width, height) = (images[0].width(), images[0].height());

    if let Some(debug_dir) = args.debug_out {
        let first = Frame::new(images[0].clone(), Duration::ZERO);
        Pipeline::from_config(&config.preprocess)
            .with_debug(debug_dir.clone())?
            .run(&first, &ImageprocOps)?;
        println!("Saved preprocessing stages to {}", debug_dir.display());
    }

    let mut session = ScanSession::new(config);
    session.start(width, height);

    let mut frame_index: u32 = 0;
    for img in &images {
        for _ in 0..args.repeat {
            let frame = Frame::new(img.clone(), frame_interval * frame_index);
            frame_index += 1;

            match session.process_frame(&frame) {
                FrameOutcome::Captured { document, report } => {
                    for warning in &report.warnings {
                        warn!(?warning, "Capture warning");
                    }
                    println!(
                        "Captured {}x{} document after {} frames{}",
                        document.image.width(),
                        document.image.height(),
                        frame_index,
                        if document.fallback { " (fallback)" } else { "" }
                    );
                    let q = document.quad;
                    println!(
                        "  corners: TL ({:.1}, {:.1}) TR ({:.1}, {:.1}) BL ({:.1}, {:.1}) BR ({:.1}, {:.1})",
                        q.top_left().x, q.top_left().y,
                        q.top_right().x, q.top_right().y,
                        q.bottom_left().x, q.bottom_left().y,
                        q.bottom_right().x, q.bottom_right().y,
                    );
                    if let Some(output) = &args.output {
                        document.image.save(output)?;
                        println!("  saved to {}", output.display());
                    }
                    return Ok(());
                }
                FrameOutcome::Tracking(report) => {
                    for warning in &report.warnings {
                        warn!(?warning, frame = frame_index, "Frame warning");
                    }
                    if args.verbose {
                        let found = report.slots.iter().filter(|s| s.rect.is_some()).count();
                        println!("Frame {}: {}/{} slots tracked", frame_index, found, report.slots.len());
                    }
                }
                FrameOutcome::Skipped(SkipReason::Paced) => {}
                FrameOutcome::Skipped(reason) => warn!(?reason, "Frame skipped"),
                FrameOutcome::Stopped => break,
            }
        }
    }

    anyhow::bail!("No document captured after {} frames", frame_index)
}
