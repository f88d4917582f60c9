//! Preview pipeline demo
//!
//! Synthesizes a short video of a moving disc, runs it through the capture
//! pipeline and prints what the renderer would draw at a few distances.
//!
//! ```text
//! RUST_LOG=debug cargo run --bin preview_pipeline -- --quality high --frames 6
//! ```

use anyhow::Result;
use capture3d_algorithms::RadiusOutlierFilter;
use capture3d_pipeline::prelude::*;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Quality {
    Low,
    Medium,
    High,
}

impl From<Quality> for QualityTier {
    fn from(quality: Quality) -> Self {
        match quality {
            Quality::Low => QualityTier::Low,
            Quality::Medium => QualityTier::Medium,
            Quality::High => QualityTier::High,
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "Run synthetic frames through the capture preview pipeline")]
struct Args {
    #[arg(long, value_enum, default_value = "medium")]
    quality: Quality,

    /// Number of synthetic frames
    #[arg(long, default_value_t = 4)]
    frames: u32,

    /// Frame width and height in pixels
    #[arg(long, default_value_t = 64)]
    size: u32,

    /// Drop isolated samples before indexing
    #[arg(long)]
    filter: bool,

    /// Treat frames as stills instead of video
    #[arg(long)]
    stills: bool,
}

/// A bright disc on a transparent background, shifted a little each frame
fn disc_frame(size: u32, index: u32) -> Frame {
    let mut frame = Frame::filled(size, size, [0, 0, 0, 0]);
    let radius = size as f32 / 4.0;
    let cx = size as f32 / 3.0 + index as f32 * 2.0;
    let cy = size as f32 / 2.0;
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy <= radius * radius {
                let shade = (255 - (index * 20).min(200)) as u8;
                frame.set_pixel(x, y, [shade, 180, 90, 255]);
            }
        }
    }
    frame
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = PipelineConfig::for_quality(args.quality.into()).with_depth_scale(4.0);
    println!(
        "quality {:?}: stride {}, {} levels",
        config.quality,
        config.build.sampler.stride,
        config.level_count()
    );

    let mut pipeline = CapturePipeline::new(config)?;
    if args.filter {
        pipeline = pipeline.with_filter(RadiusOutlierFilter::new(1.5, 2));
    }

    let frames: Vec<Frame> = (0..args.frames).map(|i| disc_frame(args.size, i)).collect();
    let output = if args.stills {
        pipeline.process_frames(&frames, None)?
    } else {
        pipeline.process_video(&frames, None)?
    };

    println!(
        "generation {}: {} indexed points, {} octree leaves, depth {}",
        output.generation(),
        output.index.len(),
        output.index.leaf_count(),
        output.index.depth()
    );
    for (i, level) in output.levels.iter().enumerate() {
        println!(
            "  level {}: ratio {:.4}, {} points",
            i,
            level.decimation_ratio,
            level.len()
        );
    }

    for distance in [2.0, 8.0, 15.0, 30.0, 80.0] {
        let active = output.active_level(distance)?;
        println!("distance {:>5.1}: drawing {} points", distance, active.len());
    }

    let snapshot = pipeline
        .shared_index()
        .snapshot()
        .ok_or_else(|| anyhow::anyhow!("index was not published"))?;
    let nearest = snapshot.find_k_nearest(&Point3f::origin(), 5);
    log::info!("5 nearest to origin: {:?}", nearest);

    Ok(())
}
