//! Draws detection boxes and labels over a copy of the input image.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{debug, info};

use crate::application::ports::AnnotatorPort;
use crate::domain::detection::Detection;

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Box colours, cycled by class id.
const PALETTE: [Rgb<u8>; 10] = [
    Rgb([255, 56, 56]),
    Rgb([255, 157, 151]),
    Rgb([255, 112, 31]),
    Rgb([255, 178, 29]),
    Rgb([207, 210, 49]),
    Rgb([72, 249, 10]),
    Rgb([26, 147, 52]),
    Rgb([0, 212, 187]),
    Rgb([44, 153, 168]),
    Rgb([0, 194, 255]),
];

const SYSTEM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct BoxAnnotator {
    font: Option<FontVec>,
    font_scale: f32,
    thickness: u32,
}

impl Default for BoxAnnotator {
    /// No font (boxes only), 16px labels, 2px box outline.
    fn default() -> Self {
        Self { font: None, font_scale: 16.0, thickness: 2 }
    }
}

impl BoxAnnotator {
    pub fn with_font_path(font_path: &Path) -> Result<Self> {
        let data = std::fs::read(font_path)?;
        let font = FontVec::try_from_vec(data)
            .map_err(|_| anyhow!("failed to parse font file: {}", font_path.display()))?;
        Ok(Self { font: Some(font), ..Self::default() })
    }

    /// Uses the first readable system font; labels are skipped if none is found.
    pub fn with_system_font() -> Self {
        for path in SYSTEM_FONTS {
            if let Ok(annotator) = Self::with_font_path(Path::new(path)) {
                info!("Annotation font: {}", path);
                return annotator;
            }
        }
        debug!("No system font found, annotations will carry boxes only");
        Self::default()
    }

    pub fn with_thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness.max(1);
        self
    }

    fn draw_detection(&self, img: &mut RgbImage, det: &Detection) {
        let (img_w, img_h) = img.dimensions();
        if img_w == 0 || img_h == 0 {
            return;
        }
        let color = PALETTE[det.class_id % PALETTE.len()];

        let x1 = (det.x1.floor() as i64).clamp(0, img_w as i64 - 1) as i32;
        let y1 = (det.y1.floor() as i64).clamp(0, img_h as i64 - 1) as i32;
        let x2 = (det.x2.ceil() as i64).clamp(x1 as i64 + 1, img_w as i64) as i32;
        let y2 = (det.y2.ceil() as i64).clamp(y1 as i64 + 1, img_h as i64) as i32;

        for t in 0..self.thickness as i32 {
            let w = x2 - x1 - 2 * t;
            let h = y2 - y1 - 2 * t;
            if w <= 0 || h <= 0 {
                break;
            }
            draw_hollow_rect_mut(img, Rect::at(x1 + t, y1 + t).of_size(w as u32, h as u32), color);
        }

        if let Some(font) = &self.font {
            let text = format!("{} {:.2}", det.label, det.score);
            let scale = PxScale::from(self.font_scale);
            let (tw, th) = text_size(scale, font, &text);
            let tag_h = th + 4;
            // above the box when there is room, inside it otherwise
            let tag_y = if y1 >= tag_h as i32 { y1 - tag_h as i32 } else { y1 };
            draw_filled_rect_mut(img, Rect::at(x1, tag_y).of_size(tw.max(1) + 4, tag_h), color);
            draw_text_mut(img, TEXT_COLOR, x1 + 2, tag_y + 2, scale, font, &text);
        }
    }
}

impl AnnotatorPort for BoxAnnotator {
    fn annotate(&self, image: &DynamicImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        for det in detections {
            self.draw_detection(&mut canvas, det);
        }
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: usize, b: [f32; 4]) -> Detection {
        Detection {
            x1: b[0],
            y1: b[1],
            x2: b[2],
            y2: b[3],
            score: 0.9,
            class_id,
            label: "dog".into(),
        }
    }

    #[test]
    fn keeps_dimensions_and_draws_outline() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([0, 0, 0])));
        let out = BoxAnnotator::default().annotate(&img, &[det(0, [5.0, 5.0, 20.0, 15.0])]);

        assert_eq!(out.dimensions(), (40, 30));
        assert_eq!(out.get_pixel(5, 5), &PALETTE[0]);
        assert_eq!(out.get_pixel(12, 10), &Rgb([0, 0, 0]));
    }

    #[test]
    fn thickness_widens_the_outline_inwards() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([0, 0, 0])));
        let d = [det(0, [5.0, 5.0, 30.0, 30.0])];

        let thin = BoxAnnotator::default().with_thickness(1).annotate(&img, &d);
        let thick = BoxAnnotator::default().with_thickness(3).annotate(&img, &d);
        assert_eq!(thin.get_pixel(7, 15), &Rgb([0, 0, 0]));
        assert_eq!(thick.get_pixel(7, 15), &PALETTE[0]);
        assert_eq!(thick.get_pixel(8, 15), &Rgb([0, 0, 0]));

        // zero is bumped to a 1px outline
        let zero = BoxAnnotator::default().with_thickness(0).annotate(&img, &d);
        assert_eq!(zero.get_pixel(5, 15), &PALETTE[0]);
    }

    #[test]
    fn colour_follows_class() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(20, 20));
        let out = BoxAnnotator::default().annotate(&img, &[det(13, [0.0, 0.0, 10.0, 10.0])]);
        assert_eq!(out.get_pixel(0, 0), &PALETTE[3]);
    }

    #[test]
    fn degenerate_and_out_of_bounds_boxes_do_not_panic() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let dets = [
            det(0, [3.0, 3.0, 3.0, 3.0]),
            det(1, [-50.0, -50.0, 500.0, 500.0]),
            det(2, [9.9, 9.9, 10.0, 10.0]),
        ];
        let out = BoxAnnotator::default().with_thickness(4).annotate(&img, &dets);
        assert_eq!(out.dimensions(), (10, 10));
    }

    #[test]
    fn labels_render_when_a_font_is_available() {
        let annotator = BoxAnnotator::with_system_font();
        let img = DynamicImage::ImageRgb8(RgbImage::new(120, 80));
        let out = annotator.annotate(&img, &[det(0, [2.0, 2.0, 60.0, 40.0])]);
        assert_eq!(out.dimensions(), (120, 80));
    }
}
