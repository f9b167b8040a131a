//! Image -> NCHW tensor conversion.

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

/// Per-channel `(x / 255 - mean) / std`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    /// Plain `[0, 1]` scaling.
    pub const UNIT: Normalization = Normalization {
        mean: [0.0, 0.0, 0.0],
        std: [1.0, 1.0, 1.0],
    };

    pub const IMAGENET: Normalization = Normalization {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };
}

/// Resize to exactly `width`x`height`, then convert.
pub fn resize_to_array(
    image: &DynamicImage,
    width: u32,
    height: u32,
    filter: FilterType,
    norm: Normalization,
) -> Array4<f32> {
    let resized = image.resize_exact(width, height, filter).to_rgb8();
    image_to_array(&resized, norm)
}

/// Converts to a `(1, 3, height, width)` tensor.
pub fn image_to_array(image: &RgbImage, norm: Normalization) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut array = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            array[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - norm.mean[c]) / norm.std[c];
        }
    }

    array
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn test_layout_is_nchw() {
        let img: RgbImage = ImageBuffer::from_fn(3, 2, |x, y| Rgb([255, (x * 10) as u8, (y * 100) as u8]));
        let array = image_to_array(&img, Normalization::UNIT);
        assert_eq!(array.dim(), (1, 3, 2, 3));
        assert_eq!(array[[0, 0, 1, 2]], 1.0);
        assert_eq!(array[[0, 1, 0, 2]], 20.0 / 255.0);
        assert_eq!(array[[0, 2, 1, 0]], 100.0 / 255.0);
    }

    #[test]
    fn test_imagenet_normalization() {
        let img: RgbImage = ImageBuffer::from_pixel(1, 1, Rgb([0, 0, 0]));
        let array = image_to_array(&img, Normalization::IMAGENET);
        assert!((array[[0, 0, 0, 0]] + 0.485 / 0.229).abs() < 1e-6);
    }

    #[test]
    fn test_resize_to_model_input() {
        let img = DynamicImage::new_rgb8(640, 480);
        let array = resize_to_array(&img, 320, 320, FilterType::Triangle, Normalization::UNIT);
        assert_eq!(array.dim(), (1, 3, 320, 320));
    }
}
