//! Image preprocessing for WD tagger inference.
//!
//! WD v3 taggers expect:
//! - Input size: S×S pixels (448 for the v3 ViT models), letterboxed on white
//! - Values: raw 0-255 floats, no normalization
//! - Channel order: BGR
//! - Tensor layout: NHWC [batch, height, width, channels]
//!
//! The transform is fully deterministic: the same image and size always yield
//! the same tensor bit for bit.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
use ndarray::Array4;

/// Number of color channels (BGR).
pub const CHANNELS: usize = 3;

const WHITE: [u8; 3] = [255, 255, 255];

/// Preprocess an image into a `(1, target_size, target_size, 3)` BGR tensor.
pub fn preprocess(image: &DynamicImage, target_size: u32) -> Array4<f32> {
    let rgb = flatten_alpha(image);
    let square = pad_to_square(&rgb);

    let square = if square.width() != target_size {
        // CatmullRom is the bicubic kernel.
        imageops::resize(&square, target_size, target_size, FilterType::CatmullRom)
    } else {
        square
    };

    let size = target_size as usize;
    Array4::from_shape_fn((1, size, size, CHANNELS), |(_, y, x, c)| {
        let pixel = square.get_pixel(x as u32, y as u32);
        pixel[CHANNELS - 1 - c] as f32
    })
}

/// Composite transparent images onto white; convert everything else to RGB.
fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let (width, height) = image.dimensions();
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &image.to_rgba8(), 0, 0);
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Center the image on a white square whose side is the longer edge.
///
/// Offsets use floor division, so odd padding leans top-left.
fn pad_to_square(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let side = width.max(height);
    if width == height {
        return image.clone();
    }

    let left = (side - width) / 2;
    let top = (side - height) / 2;
    let mut canvas = RgbImage::from_pixel(side, side, Rgb(WHITE));
    imageops::replace(&mut canvas, image, i64::from(left), i64::from(top));
    canvas
}
