//! Detection overlays for evidence frames

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::{Detection, ObjectDetector};

const PROHIBITED: Rgb<u8> = Rgb([255, 0, 0]);
const PERMITTED: Rgb<u8> = Rgb([0, 255, 0]);

/// Draw every detection, prohibited items in red and the rest in green.
/// Boxes are two pixels thick.
pub fn annotate_detections(image: &mut RgbImage, detector: &ObjectDetector, detections: &[Detection]) {
    for detection in detections {
        let color = if detector.is_prohibited(detection) {
            PROHIBITED
        } else {
            PERMITTED
        };
        let b = &detection.bbox;
        draw_hollow_rect_mut(
            image,
            Rect::at(b.x as i32, b.y as i32).of_size(b.width, b.height),
            color,
        );
        if b.width > 2 && b.height > 2 {
            draw_hollow_rect_mut(
                image,
                Rect::at(b.x as i32 + 1, b.y as i32 + 1).of_size(b.width - 2, b.height - 2),
                color,
            );
        }
    }
}
