//! Pupil localization by dark-blob detection

use image::{imageops, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::morphology::{dilate, erode};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::GazeConfig;

/// Pupil search parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PupilParams {
    pub threshold: u8,
    pub eyebrow_fraction: f32,
    pub erode_iterations: u8,
    pub dilate_iterations: u8,
    pub median_radius: u32,
    pub min_blob_area: u32,
    pub max_blob_area: u32,
}

impl From<&GazeConfig> for PupilParams {
    fn from(config: &GazeConfig) -> Self {
        Self {
            threshold: config.threshold,
            eyebrow_fraction: config.eyebrow_fraction,
            erode_iterations: config.erode_iterations,
            dilate_iterations: config.dilate_iterations,
            median_radius: config.median_radius,
            min_blob_area: config.min_blob_area,
            max_blob_area: config.max_blob_area,
        }
    }
}

impl Default for PupilParams {
    fn default() -> Self {
        Self::from(&GazeConfig::default())
    }
}

/// Binarize: bright pixels white, pupil candidates black
fn binarize(eye: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(eye.width(), eye.height(), |x, y| {
        if eye.get_pixel(x, y).0[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Pupil centroid inside an eye region, in eye-region coordinates.
///
/// Returns `None` when no dark blob falls in the accepted area range.
pub fn locate_pupil(eye: &GrayImage, params: &PupilParams) -> Option<(f32, f32)> {
    let (w, h) = eye.dimensions();
    let brow = (h as f32 * params.eyebrow_fraction) as u32;
    if brow >= h || w == 0 {
        return None;
    }
    let below_brow = imageops::crop_imm(eye, 0, brow, w, h - brow).to_image();

    let mut mask = binarize(&below_brow, params.threshold);
    if params.erode_iterations > 0 {
        mask = erode(&mask, Norm::LInf, params.erode_iterations);
    }
    if params.dilate_iterations > 0 {
        mask = dilate(&mask, Norm::LInf, params.dilate_iterations);
    }
    if params.median_radius > 0 {
        mask = median_filter(&mask, params.median_radius, params.median_radius);
    }

    // Dark pixels are foreground
    let labels = connected_components(&mask, Connectivity::Eight, Luma([255u8]));

    // label -> (area, sum_x, sum_y)
    let mut blobs: Vec<(u32, u64, u64)> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label.0[0] as usize;
        if id == 0 {
            continue;
        }
        if blobs.len() < id {
            blobs.resize(id, (0, 0, 0));
        }
        let blob = &mut blobs[id - 1];
        blob.0 += 1;
        blob.1 += u64::from(x);
        blob.2 += u64::from(y);
    }

    blobs
        .into_iter()
        .filter(|(area, _, _)| *area >= params.min_blob_area && *area <= params.max_blob_area)
        .max_by_key(|(area, _, _)| *area)
        .map(|(area, sx, sy)| {
            let n = area as f32;
            (sx as f32 / n, sy as f32 / n + brow as f32)
        })
}
