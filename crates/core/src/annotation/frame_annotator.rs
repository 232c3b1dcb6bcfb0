use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::Rgb;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::classification::domain::demographics::{AgeBucket, Gender};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;
const LABEL_HEIGHT: f32 = 16.0;
/// Distance from the top of the box to the baseline of each label.
const GENDER_LABEL_OFFSET: i32 = 10;
const AGE_LABEL_OFFSET: i32 = 30;

/// A committed face and the labels it was classified with.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceAnnotation {
    pub region: Region,
    pub age: AgeBucket,
    pub gender: Gender,
}

/// Draws committed faces onto outgoing frames.
pub struct FrameAnnotator {
    font: Option<FontVec>,
    scale: PxScale,
}

impl FrameAnnotator {
    /// Boxes only.
    pub fn new() -> Self {
        Self {
            font: None,
            scale: PxScale::from(LABEL_HEIGHT),
        }
    }

    /// Boxes plus gender and age labels rendered with the given TrueType
    /// or OpenType font.
    pub fn with_font(font_data: Vec<u8>) -> Result<Self, Box<dyn std::error::Error>> {
        let font = FontVec::try_from_vec(font_data).map_err(|e| format!("invalid font: {e}"))?;
        Ok(Self {
            font: Some(font),
            scale: PxScale::from(LABEL_HEIGHT),
        })
    }

    pub fn from_font_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read(path)
            .map_err(|e| format!("cannot read font {}: {e}", path.display()))?;
        Self::with_font(data)
    }

    pub fn draws_labels(&self) -> bool {
        self.font.is_some()
    }

    /// Draws every annotation onto `frame` in place. Frames that are not
    /// RGB are left untouched.
    pub fn annotate(&self, frame: &mut Frame, faces: &[FaceAnnotation]) {
        if faces.is_empty() {
            return;
        }
        let Some(mut canvas) = frame.to_rgb_image() else {
            log::warn!("Skipping annotation of non-RGB frame {}", frame.index());
            return;
        };

        for face in faces {
            let r = &face.region;
            for inset in 0..BOX_THICKNESS {
                let w = r.width - 2 * inset;
                let h = r.height - 2 * inset;
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = Rect::at(r.x + inset, r.y + inset).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
            }

            if let Some(font) = &self.font {
                let text_top = |offset: i32| r.y - offset - LABEL_HEIGHT as i32;
                draw_text_mut(
                    &mut canvas,
                    BOX_COLOR,
                    r.x,
                    text_top(GENDER_LABEL_OFFSET),
                    self.scale,
                    font,
                    face.gender.label(),
                );
                draw_text_mut(
                    &mut canvas,
                    BOX_COLOR,
                    r.x,
                    text_top(AGE_LABEL_OFFSET),
                    self.scale,
                    font,
                    face.age.label(),
                );
            }
        }

        frame.data_mut().copy_from_slice(canvas.as_raw());
    }
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width() + x) * 3) as usize;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    fn face(x: i32, y: i32, w: i32, h: i32) -> FaceAnnotation {
        FaceAnnotation {
            region: Region::new(x, y, w, h, 0.9),
            age: AgeBucket::From26To35,
            gender: Gender::Woman,
        }
    }

    #[test]
    fn test_draws_two_pixel_green_box() {
        let mut frame = Frame::blank(64, 64, 0);
        FrameAnnotator::new().annotate(&mut frame, &[face(10, 10, 20, 20)]);

        assert_eq!(pixel(&frame, 10, 10), [0, 255, 0]);
        assert_eq!(pixel(&frame, 11, 11), [0, 255, 0]);
        assert_eq!(pixel(&frame, 29, 20), [0, 255, 0]);
        assert_eq!(pixel(&frame, 28, 20), [0, 255, 0]);
        // Interior and outside untouched
        assert_eq!(pixel(&frame, 20, 20), [0, 0, 0]);
        assert_eq!(pixel(&frame, 9, 9), [0, 0, 0]);
        assert_eq!(pixel(&frame, 30, 30), [0, 0, 0]);
    }

    #[test]
    fn test_no_faces_leaves_frame_unchanged() {
        let mut frame = Frame::blank(16, 16, 0);
        FrameAnnotator::new().annotate(&mut frame, &[]);
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_box_partly_outside_frame_is_clipped() {
        let mut frame = Frame::blank(32, 32, 0);
        FrameAnnotator::new().annotate(&mut frame, &[face(20, 20, 40, 40)]);
        assert_eq!(pixel(&frame, 20, 25), [0, 255, 0]);
        assert_eq!(pixel(&frame, 31, 31), [0, 0, 0]);
    }

    #[test]
    fn test_thin_region_does_not_panic() {
        let mut frame = Frame::blank(32, 32, 0);
        FrameAnnotator::new().annotate(&mut frame, &[face(5, 5, 1, 1)]);
        assert_eq!(pixel(&frame, 5, 5), [0, 255, 0]);
    }

    #[test]
    fn test_without_font_draws_no_labels() {
        let annotator = FrameAnnotator::new();
        assert!(!annotator.draws_labels());
        let mut frame = Frame::blank(64, 64, 0);
        annotator.annotate(&mut frame, &[face(10, 40, 20, 20)]);
        // Label area above the box stays black
        for y in 0..38 {
            for x in 0..64 {
                assert_eq!(pixel(&frame, x, y), [0, 0, 0]);
            }
        }
    }

    #[test]
    fn test_invalid_font_rejected() {
        assert!(FrameAnnotator::with_font(vec![0, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_missing_font_file_rejected() {
        assert!(FrameAnnotator::from_font_file(Path::new("/nonexistent/font.ttf")).is_err());
    }
}
