use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Cuts a detected face out of the frame.
///
/// The box is clamped to the frame first. Returns `None` when the visible
/// part is narrower or shorter than `min_size` pixels; such detections are
/// filtered out rather than treated as errors.
pub fn extract(frame: &Frame, region: &Region, min_size: u32) -> Option<Frame> {
    let (x, y, w, h) = region.clamp_to(frame.width(), frame.height())?;
    if w < min_size || h < min_size {
        return None;
    }
    Some(frame.crop(x, y, w, h))
}

/// Prepares a face crop for the age and gender models.
///
/// Resizes to `size` x `size`, scales channel values to [0, 1] and lays the
/// result out as `[1, size, size, 3]` in BGR order, which is what the
/// pretrained Keras models were fed.
pub fn normalize(crop: &Frame, size: u32) -> Result<Array4<f32>, Box<dyn std::error::Error>> {
    let rgb = crop
        .to_rgb_image()
        .ok_or_else(|| format!("expected an RGB crop, got {} channels", crop.channels()))?;
    let resized = imageops::resize(&rgb, size, size, FilterType::Triangle);

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, side, side, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (row, col) = (y as usize, x as usize);
        tensor[[0, row, col, 0]] = b as f32 / 255.0;
        tensor[[0, row, col, 1]] = g as f32 / 255.0;
        tensor[[0, row, col, 2]] = r as f32 / 255.0;
    }
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_extract_inside_frame() {
        let frame = Frame::blank(640, 480, 0);
        let crop = extract(&frame, &Region::new(100, 50, 40, 60, 0.9), 10).unwrap();
        assert_eq!((crop.width(), crop.height()), (40, 60));
    }

    #[test]
    fn test_extract_clamps_partially_visible_face() {
        let frame = Frame::blank(640, 480, 0);
        let crop = extract(&frame, &Region::new(-20, 460, 50, 50, 0.9), 10).unwrap();
        assert_eq!((crop.width(), crop.height()), (30, 20));
    }

    #[rstest]
    #[case::narrow(Region::new(10, 10, 9, 50, 0.9))]
    #[case::short(Region::new(10, 10, 50, 9, 0.9))]
    #[case::clamped_below_minimum(Region::new(635, 10, 50, 50, 0.9))]
    #[case::off_frame(Region::new(700, 10, 50, 50, 0.9))]
    fn test_extract_rejects_small_crops(#[case] region: Region) {
        let frame = Frame::blank(640, 480, 0);
        assert!(extract(&frame, &region, 10).is_none());
    }

    #[test]
    fn test_extract_accepts_exact_minimum() {
        let frame = Frame::blank(640, 480, 0);
        assert!(extract(&frame, &Region::new(0, 0, 10, 10, 0.9), 10).is_some());
    }

    #[test]
    fn test_normalize_shape_and_bgr_order() {
        let crop = solid(30, 20, [255, 0, 51]);
        let tensor = normalize(&crop, 96).unwrap();
        assert_eq!(tensor.shape(), &[1, 96, 96, 3]);
        assert_relative_eq!(tensor[[0, 50, 50, 0]], 0.2, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 50, 50, 1]], 0.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 50, 50, 2]], 1.0, epsilon = 0.01);
    }

    #[test]
    fn test_normalize_values_in_unit_range() {
        let crop = solid(12, 12, [200, 100, 0]);
        let tensor = normalize(&crop, 16).unwrap();
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_normalize_rejects_non_rgb() {
        let crop = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        assert!(normalize(&crop, 8).is_err());
    }
}
