use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

/// Settings for turning a photo into OCR input.
#[derive(Clone, Copy, Debug)]
pub struct PreprocessOptions {
    /// Images shorter than this are scaled up; Tesseract misreads small glyphs.
    pub upscale_min_height: u32,
    /// When set, binarize keeping only pixels brighter than this value.
    pub binarize_threshold: Option<u8>,
}

/// Grayscale, upscale small images, then optionally binarize.
pub fn prepare_for_ocr(img: &DynamicImage, options: &PreprocessOptions) -> GrayImage {
    let gray = upscale_to_min_height(img.to_luma8(), options.upscale_min_height);
    match options.binarize_threshold {
        Some(threshold) => threshold_bright_pixels(&gray, threshold),
        None => gray,
    }
}

/// Scales the image up by an integer factor until it is at least `min_height` tall.
pub fn upscale_to_min_height(img: GrayImage, min_height: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if height == 0 || height >= min_height {
        return img;
    }
    let factor = min_height.div_ceil(height);
    imageops::resize(&img, width * factor, height * factor, FilterType::CatmullRom)
}

/// Converts image to binary by keeping only bright pixels.
///
/// Pixels brighter than `threshold` become black (text), everything else white.
/// Suits bright digits on a dark background, such as LED clocks and phone
/// lock screens.
pub fn threshold_bright_pixels(img: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let value = if pixel[0] > threshold { 0u8 } else { 255u8 };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}
