use clap::Parser;
use st_config::Config;
use st_core::telemetry;
use st_motion::image::GrayImage;
use st_motion::utils::{checkerboard_frame, frame_with_block};
use st_motion::{DetectionSession, MotionResult};
use std::process;

/// Edge length of the drifting block in the synthetic scene
const BLOCK: u32 = 24;

/// Frame index that flips half the scene to exercise the noise gate
const FLASH_TICK: u32 = 60;

/// Synthetic scene options for a demonstration run
#[derive(Parser, Debug)]
#[command(name = "stakeout", about = "Three-frame differencing motion detector")]
struct Args {
    /// Number of frames to synthesize and judge
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u32).range(1..=1_000_000))]
    frames: u32,

    /// Synthetic frame width
    #[arg(long, default_value_t = 320, value_parser = clap::value_parser!(u32).range(64..=4096))]
    width: u32,

    /// Synthetic frame height
    #[arg(long, default_value_t = 240, value_parser = clap::value_parser!(u32).range(64..=4096))]
    height: u32,
}

fn main() {
    telemetry::init_tracing("development", "stakeout");
    tracing::info!("stakeout starting");

    let args = Args::parse();

    // Load configuration - exit with non-zero if invalid
    let config = match Config::load() {
        Ok(config) => {
            tracing::debug!(?config, "Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let min_changed_pixels = config.trigger.min_changed_pixels;
    let session = match config.scan_window() {
        Some(roi) => DetectionSession::with_roi(config.motion_config(), roi),
        None => DetectionSession::new(config.motion_config()),
    };
    let mut session = match session {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to create detection session: {}", e);
            process::exit(1);
        }
    };

    tracing::info!(
        frames = args.frames,
        width = args.width,
        height = args.height,
        min_changed_pixels,
        "Detector configured and ready"
    );

    let mut motion_frames = 0u32;
    for tick in 0..args.frames {
        let frame = scene_frame(tick, args.width, args.height);
        match session.advance(frame) {
            Ok(result) => {
                if report(tick, &result, min_changed_pixels) {
                    motion_frames += 1;
                }
            }
            Err(e) => {
                tracing::error!(tick, "Detection failed: {}", e);
                process::exit(1);
            }
        }
    }

    tracing::info!(frames = args.frames, motion_frames, "Run complete");
}

/// Synthesize the demonstration scene: a bright block drifting over a dark
/// background, with one chaotic frame mid-run to exercise the noise gate.
fn scene_frame(tick: u32, width: u32, height: u32) -> GrayImage {
    if tick == FLASH_TICK {
        // Flash cells sit on the scene background so only half the frame changes
        let mut flash = checkerboard_frame(width, height, 2);
        for pixel in flash.iter_mut() {
            if *pixel == 0 {
                *pixel = 64;
            }
        }
        return flash;
    }

    let x = (tick * 3) % (width - BLOCK);
    let y = (tick * 2) % (height - BLOCK);
    frame_with_block(width, height, x, y, BLOCK, BLOCK, 200)
}

/// Log one result, returning whether it counts as a motion event
fn report(tick: u32, result: &MotionResult, min_changed_pixels: u32) -> bool {
    match &result.region {
        Some(region) if result.changed_pixels >= min_changed_pixels => {
            tracing::info!(
                tick,
                changed_pixels = result.changed_pixels,
                region = ?region,
                "Motion detected"
            );
            true
        }
        Some(region) => {
            tracing::debug!(
                tick,
                changed_pixels = result.changed_pixels,
                region = ?region,
                "Change below trigger threshold"
            );
            false
        }
        None => {
            tracing::debug!(tick, "Quiet frame");
            false
        }
    }
}
