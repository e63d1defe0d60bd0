mod common;

use common::*;
use docscan::detection::preprocessing::{PreprocessConfig, preprocess};
use docscan::{Pipeline, ScanError};

#[test]
fn test_step_order_follows_config() {
    let document = Pipeline::from_config(&PreprocessConfig::document());
    assert_eq!(document.step_names(), ["Gaussian Blur", "Threshold", "Edge Detection"]);

    let markers = Pipeline::from_config(&PreprocessConfig::markers());
    assert_eq!(markers.step_names(), [
            "Gaussian Blur",
            "Histogram Equalization",
            "Threshold",
            "Edge Detection"
        ]);

    let bare = Pipeline::from_config(&PreprocessConfig {
        threshold: None,
        ..PreprocessConfig::document()
    });
    assert_eq!(bare.step_names(), ["Gaussian Blur", "Edge Detection"]);
}

#[test]
fn test_preprocess_outputs_match_frame_size() -> anyhow::Result<()> {
    let frame = square_frame(0);
    let out = preprocess(&frame, &PreprocessConfig::document(), &ImageprocOps)?;
    assert_eq!(out.gray.dimensions(), frame.dimensions());
    assert_eq!(out.edges.dimensions(), frame.dimensions());
    assert!(out.edges.pixels().all(|p| p[0] == 0 || p[0] == 255));
    assert!(out.edges.pixels().any(|p| p[0] == 255));
    // Edges hug the square outline, not its interior
    assert_eq!(out.edges.get_pixel(200, 200)[0], 0);
    Ok(())
}

#[test]
fn test_empty_frame_rejected() {
    let empty = Frame::new(image::DynamicImage::new_luma8(0, 10), std::time::Duration::ZERO);
    let err = preprocess(&empty, &PreprocessConfig::document(), &ImageprocOps).unwrap_err();
    assert!(matches!(err, ScanError::InputUnavailable(_)));
}

#[test]
fn test_inverted_canny_thresholds_rejected() {
    let config = PreprocessConfig {
        canny_low: 200.0,
        canny_high: 100.0,
        ..PreprocessConfig::document()
    };
    let err = preprocess(&square_frame(0), &config, &ImageprocOps).unwrap_err();
    assert!(matches!(err, ScanError::Precondition(_)), "{:?}", err);
}

#[test]
fn test_debug_output_saved_per_step() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("stages");
    let pipeline = Pipeline::from_config(&PreprocessConfig::markers()).with_debug(debug_dir.clone())?;
    pipeline.run(&markers_frame(0), &ImageprocOps)?;

    let mut files: Vec<String> = std::fs::read_dir(&debug_dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    files.sort();
    assert_eq!(
        files,
        [
            "00_grayscale.png",
            "01_gaussian_blur.png",
            "02_histogram_equalization.png",
            "03_threshold.png",
            "04_edge_detection.png"
        ]
    );

    // A directory that already holds output is refused
    let err = Pipeline::from_config(&PreprocessConfig::markers())
        .with_debug(debug_dir)
        .err()
        .expect("non-empty directory");
    assert!(matches!(err, ScanError::Precondition(_)));
    Ok(())
}
