use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::contrast::{ThresholdType, equalize_histogram, otsu_level, threshold};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{Interpolation, warp_into};

use crate::detection::preprocessing::ThresholdMode;
use crate::error::Result;
use crate::geometry;
use crate::models::Point;
use crate::rectify::Homography;

/// Vision primitives the scanner needs from an image-processing backend.
///
/// The pipeline only talks to this trait, so a different backend (or a fake
/// in tests) can be swapped in without touching detection logic.
pub trait ImageOps {
    fn grayscale(&self, image: &DynamicImage) -> GrayImage;

    /// Gaussian blur with an odd square kernel; sizes below 3 leave the image untouched
    fn gaussian_blur(&self, image: &GrayImage, kernel_size: u32) -> GrayImage;

    fn equalize_histogram(&self, image: &GrayImage) -> GrayImage;

    fn threshold(&self, image: &GrayImage, mode: &ThresholdMode) -> GrayImage;

    fn detect_edges(&self, image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage;

    /// Outermost borders of the non-zero regions, one point list per border
    fn find_external_contours(&self, edges: &GrayImage) -> Vec<Vec<Point>>;

    /// Closed-contour polygon approximation
    fn approximate_polygon(&self, contour: &[Point], epsilon: f32) -> Vec<Point> {
        geometry::simplify_closed(contour, epsilon)
    }

    /// Resample `image` into a `width` x `height` buffer through `homography`,
    /// which maps source coordinates to output coordinates.
    fn warp_perspective(
        &self,
        image: &RgbaImage,
        homography: &Homography,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage>;
}

/// [`ImageOps`] backed by the `image` and `imageproc` crates
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocOps;

impl ImageOps for ImageprocOps {
    fn grayscale(&self, image: &DynamicImage) -> GrayImage {
        image.to_luma8()
    }

    fn gaussian_blur(&self, image: &GrayImage, kernel_size: u32) -> GrayImage {
        if kernel_size < 3 {
            return image.clone();
        }
        gaussian_blur_f32(image, sigma_for_kernel(kernel_size))
    }

    fn equalize_histogram(&self, image: &GrayImage) -> GrayImage {
        equalize_histogram(image)
    }

    fn threshold(&self, image: &GrayImage, mode: &ThresholdMode) -> GrayImage {
        let kind = |invert: bool| {
            if invert {
                ThresholdType::BinaryInverted
            } else {
                ThresholdType::Binary
            }
        };
        match *mode {
            ThresholdMode::Fixed { level, invert } => threshold(image, level, kind(invert)),
            ThresholdMode::Otsu { invert } => threshold(image, otsu_level(image), kind(invert)),
            ThresholdMode::Adaptive { block_size, c, invert } => {
                let integral = IntegralImage::new(image);
                let radius = block_size / 2;
                adaptive_binarize(image, invert, |x, y| integral.mean(x, y, radius) - c)
            }
        }
    }

    fn detect_edges(&self, image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
        canny(image, low_threshold, high_threshold)
    }

    fn find_external_contours(&self, edges: &GrayImage) -> Vec<Vec<Point>> {
        let contours: Vec<Contour<u32>> = find_contours(edges);
        contours
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| {
                c.points
                    .into_iter()
                    .map(|p| Point::new(p.x as f32, p.y as f32))
                    .collect()
            })
            .collect()
    }

    fn warp_perspective(
        &self,
        image: &RgbaImage,
        homography: &Homography,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage> {
        let mut output = RgbaImage::new(width, height);
        warp_into(
            image,
            homography.projection(),
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
            &mut output,
        );
        Ok(output)
    }
}

/// Sigma OpenCV derives for a Gaussian kernel when none is given
fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Pixels strictly above their local threshold become 255 (0 when inverted).
/// `imageproc::contrast::adaptive_threshold` has no offset, hence the integral image.
fn adaptive_binarize<F>(image: &GrayImage, invert: bool, threshold_at: F) -> GrayImage
where
    F: Fn(u32, u32) -> f32,
{
    let (hi, lo) = if invert { (0u8, 255u8) } else { (255u8, 0u8) };
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = image.get_pixel(x, y).0[0] as f32;
        Luma([if value > threshold_at(x, y) { hi } else { lo }])
    })
}

/// Summed-area table for constant-time local means
struct IntegralImage {
    table: Vec<u64>,
    width: u32,
    height: u32,
}

impl IntegralImage {
    fn new(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let stride = (w + 1) as usize;
        let mut table = vec![0u64; stride * (h + 1) as usize];

        for y in 0..h {
            let mut row_sum: u64 = 0;
            for x in 0..w {
                row_sum += gray.get_pixel(x, y).0[0] as u64;
                let idx = (y + 1) as usize * stride + (x + 1) as usize;
                let above = y as usize * stride + (x + 1) as usize;
                table[idx] = row_sum + table[above];
            }
        }

        Self {
            table,
            width: w,
            height: h,
        }
    }

    /// Mean of the square window of `radius` around (cx, cy), clamped to the image
    fn mean(&self, cx: u32, cy: u32, radius: u32) -> f32 {
        let stride = (self.width + 1) as usize;
        let x1 = cx.saturating_sub(radius) as usize;
        let y1 = cy.saturating_sub(radius) as usize;
        let x2 = ((cx + radius + 1) as usize).min(self.width as usize);
        let y2 = ((cy + radius + 1) as usize).min(self.height as usize);

        let area = ((x2 - x1) * (y2 - y1)) as f64;
        if area == 0.0 {
            return 128.0;
        }

        let sum = self.table[y2 * stride + x2] as f64 - self.table[y1 * stride + x2] as f64
            - self.table[y2 * stride + x1] as f64
            + self.table[y1 * stride + x1] as f64;
        (sum / area) as f32
    }
}
