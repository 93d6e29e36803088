//! ABOUTME: Integration tests for the three-frame detection session
//! ABOUTME: Covers known motion scenarios, noise gating, scan windows, and error paths

use st_motion::image::GrayImage;
use st_motion::{
    utils::{checkerboard_frame, frame_with_block, moving_block_triplet, uniform_frame},
    DetectionSession, MotionConfig, MotionResult, Region, Roi,
};

/// Test session creation with and without a scan window
#[tokio::test]
async fn test_session_creation() {
    let session = DetectionSession::new(MotionConfig::default());
    assert!(session.is_ok());

    let roi = Roi {
        x_start: 10,
        x_stop: 200,
        y_start: 10,
        y_stop: 150,
    };
    let windowed = DetectionSession::with_roi(MotionConfig::default(), roi);
    assert!(windowed.is_ok());
    assert_eq!(windowed.unwrap().roi(), Some(roi));
}

/// Test the full pipeline against a known jumping-block scenario
#[tokio::test]
async fn test_known_motion_scenario() {
    let mut session = DetectionSession::new(MotionConfig::default()).unwrap();
    let (prev, curr, next) = moving_block_triplet(320, 240, 16, 16, 8, 8);

    // Warm-up frames report the quiet result
    assert_eq!(session.advance(prev).unwrap(), MotionResult::quiet());
    assert_eq!(session.advance(curr).unwrap(), MotionResult::quiet());

    // The block lands at (32,32); erosion leaves a 7x7 core and the stride-2
    // scan samples 16 of those pixels
    let result = session.advance(next).unwrap();
    assert!(result.has_motion());
    assert_eq!(result.changed_pixels, 16);
    assert_eq!(
        result.region,
        Some(Region {
            min_x: 22,
            min_y: 22,
            max_x: 48,
            max_y: 48,
        })
    );
}

/// Test that a static scene never reports motion
#[tokio::test]
async fn test_static_scene_stays_quiet() {
    let mut session = DetectionSession::new(MotionConfig::default()).unwrap();
    let frame = frame_with_block(320, 240, 40, 40, 30, 30, 200);

    for _ in 0..6 {
        let result = session.advance(frame.clone()).unwrap();
        assert_eq!(result, MotionResult::quiet());
    }
}

/// Test that a globally chaotic frame is suppressed by the noise gate
#[tokio::test]
async fn test_global_flash_is_gated() {
    let background = uniform_frame(320, 240, 0);
    let flash = checkerboard_frame(320, 240, 2);

    let mut session = DetectionSession::new(MotionConfig::default()).unwrap();
    session.advance(background.clone()).unwrap();
    session.advance(background.clone()).unwrap();

    // Half the frame changes at once; the mask stddev blows past the gate
    let result = session.advance(flash.clone()).unwrap();
    assert_eq!(result, MotionResult::quiet());

    // The same frames pass once the gate is opened wide, proving the gate is
    // what suppressed the detection
    let open_config = MotionConfig {
        max_stddev_for_motion: 200.0,
        ..Default::default()
    };
    let mut open_session = DetectionSession::new(open_config).unwrap();
    open_session.advance(background.clone()).unwrap();
    open_session.advance(background).unwrap();
    let result = open_session.advance(flash).unwrap();
    assert!(result.has_motion());
    assert!(result.changed_pixels > 1000);
}

/// Test that a fixed scan window ignores motion outside it
#[tokio::test]
async fn test_scan_window_restricts_detection() {
    let roi = Roi {
        x_start: 0,
        x_stop: 100,
        y_start: 0,
        y_stop: 100,
    };

    // Motion inside the window is reported normally
    let mut session = DetectionSession::with_roi(MotionConfig::default(), roi).unwrap();
    let (prev, curr, next) = moving_block_triplet(320, 240, 16, 16, 8, 8);
    session.advance(prev).unwrap();
    session.advance(curr).unwrap();
    let inside = session.advance(next).unwrap();
    assert_eq!(inside.changed_pixels, 16);

    // The same motion shifted outside the window goes unreported
    let mut session = DetectionSession::with_roi(MotionConfig::default(), roi).unwrap();
    let (prev, curr, next) = moving_block_triplet(320, 240, 160, 120, 8, 8);
    session.advance(prev).unwrap();
    session.advance(curr).unwrap();
    let outside = session.advance(next).unwrap();
    assert_eq!(outside, MotionResult::quiet());
}

/// Test detection from raw grayscale buffers
#[tokio::test]
async fn test_raw_frame_detection() {
    let mut session = DetectionSession::new(MotionConfig::default()).unwrap();

    let flat = vec![64u8; 100 * 100];
    let mut moved = flat.clone();
    for y in 40..46 {
        for x in 40..46 {
            moved[y * 100 + x] = 200;
        }
    }

    session.advance_raw(&flat, 100, 100).unwrap();
    session.advance_raw(&flat, 100, 100).unwrap();

    let result = session.advance_raw(&moved, 100, 100).unwrap();
    assert!(result.has_motion());
    assert_eq!(result.changed_pixels, 9);
    assert_eq!(
        result.region,
        Some(Region {
            min_x: 30,
            min_y: 30,
            max_x: 54,
            max_y: 54,
        })
    );
}

/// Test that container slack past width*height never changes a decision
#[tokio::test]
async fn test_padded_frame_containers_judged_identically() {
    let config = MotionConfig {
        erosion_kernel_size: 1,
        ..Default::default()
    };

    let flat = vec![64u8; 64 * 64];
    let mut speck = flat.clone();
    for y in 10..14 {
        for x in 10..14 {
            speck[y * 64 + x] = 200;
        }
    }

    let mut exact = DetectionSession::new(config.clone()).unwrap();
    exact.advance_raw(&flat, 64, 64).unwrap();
    exact.advance_raw(&flat, 64, 64).unwrap();
    let expected = exact.advance_raw(&speck, 64, 64).unwrap();
    assert!(expected.has_motion());

    // The same visible scene, every container padded with slack bytes that
    // differ wildly between frames
    let with_slack = |data: &[u8], fill: u8| {
        let mut buf = data.to_vec();
        buf.resize(64 * 64 + 4096, fill);
        GrayImage::from_raw(64, 64, buf).unwrap()
    };

    let mut padded = DetectionSession::new(config).unwrap();
    padded.advance(with_slack(&flat, 0)).unwrap();
    padded.advance(with_slack(&flat, 0)).unwrap();
    let result = padded.advance(with_slack(&speck, 255)).unwrap();

    assert_eq!(result, expected);
}

/// Test error handling with malformed input
#[tokio::test]
async fn test_error_handling() {
    let mut session = DetectionSession::new(MotionConfig::default()).unwrap();

    // Buffer too small for the declared dimensions
    let truncated = vec![128u8; 50];
    let result = session.advance_raw(&truncated, 100, 100);
    assert!(result.is_err());

    // Frame dimensions drifting mid-session
    session.advance(uniform_frame(100, 100, 64)).unwrap();
    let result = session.advance(uniform_frame(50, 50, 64));
    assert!(result.is_err());
}

/// Test that reset clears the window and restarts warm-up
#[tokio::test]
async fn test_reset_behavior() {
    let mut session = DetectionSession::new(MotionConfig::default()).unwrap();
    let (prev, curr, next) = moving_block_triplet(320, 240, 16, 16, 8, 8);

    session.advance(prev).unwrap();
    session.advance(curr).unwrap();
    session.reset();
    assert!(!session.is_warm());

    // The frame right after a reset is a warm-up frame again
    let result = session.advance(next).unwrap();
    assert_eq!(result, MotionResult::quiet());
}

/// Performance smoke test for steady-state detection
/// Optional heavy benchmark; ignored by default.
/// Run with: `cargo test -p st_motion -- --ignored` (use `--ignored --nocapture` to see timings).
#[ignore = "heavy benchmark; run with --ignored"]
#[tokio::test]
async fn test_detection_performance() {
    let mut session = DetectionSession::new(MotionConfig::default()).unwrap();
    let (prev, curr, next) = moving_block_triplet(640, 480, 100, 100, 16, 16);
    let frames = [prev, curr, next];

    // Warm the window before timing
    session.advance(frames[0].clone()).unwrap();
    session.advance(frames[1].clone()).unwrap();

    let iterations = 30;
    let start_time = std::time::Instant::now();

    for i in 0..iterations {
        let frame = frames[(i + 2) % frames.len()].clone();
        session.advance(frame).unwrap();
    }

    let total_time = start_time.elapsed();
    let avg_ms = total_time.as_secs_f64() * 1000.0 / iterations as f64;

    println!("Detection performance:");
    println!("  Total time: {:?}", total_time);
    println!("  Average advance time: {:.2}ms", avg_ms);
    println!("  Iterations: {}", iterations);

    // A 640x480 window should judge well under 100ms per frame
    assert!(avg_ms < 100.0, "Detection too slow: {:.2}ms", avg_ms);
}
