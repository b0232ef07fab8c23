// ============================================================
// Layer 4 — External Image Decoding
// ============================================================
// Reads a digit picture from disk the way MNIST stores digits:
// one 8-bit grayscale channel, 28x28, scaled into [0, 1].
//
// Colour images are converted to luma. Pictures of any other
// size are resized with a triangle filter so a quick photo or a
// hand-drawn PNG still maps onto the model's input layout.

use anyhow::{Context, Result};
use image::{imageops::FilterType, GrayImage};
use std::path::Path;

use crate::domain::sample::{IMAGE_SIDE, INPUT_DIM};

/// Decode the file at `path` into a flattened 784-value vector.
pub fn load_digit_image(path: impl AsRef<Path>) -> Result<Vec<f32>> {
    let path  = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("Cannot decode image '{}'", path.display()))?
        .to_luma8();
    Ok(to_input_vector(image))
}

/// Resize (when needed) and normalise a grayscale image.
pub fn to_input_vector(image: GrayImage) -> Vec<f32> {
    let side  = IMAGE_SIDE as u32;
    let image = if image.dimensions() == (side, side) {
        image
    } else {
        tracing::warn!(
            "Image is {}x{}, resizing to {side}x{side}",
            image.width(),
            image.height()
        );
        image::imageops::resize(&image, side, side, FilterType::Triangle)
    };

    let pixels: Vec<f32> = image.as_raw().iter().map(|&p| p as f32 / 255.0).collect();
    debug_assert_eq!(pixels.len(), INPUT_DIM);
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_native_size_is_scaled_only() {
        let mut img = GrayImage::new(28, 28);
        img.put_pixel(3, 0, Luma([255]));
        let pixels = to_input_vector(img);

        assert_eq!(pixels.len(), INPUT_DIM);
        assert_eq!(pixels[3], 1.0);
        assert_eq!(pixels[4], 0.0);
    }

    #[test]
    fn test_other_sizes_are_resized() {
        let img    = GrayImage::from_pixel(56, 40, Luma([128]));
        let pixels = to_input_vector(img);

        assert_eq!(pixels.len(), INPUT_DIM);
        assert!(pixels.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_roundtrip_through_png_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("digit.png");
        GrayImage::from_pixel(28, 28, Luma([255])).save(&path).unwrap();

        let pixels = load_digit_image(&path).unwrap();
        assert!(pixels.iter().all(|&p| p == 1.0));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_digit_image("does/not/exist.png").is_err());
    }
}
