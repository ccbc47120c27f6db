use image::DynamicImage;
use imageproc::filter::{box_filter, gaussian_blur_f32};

/// Sigma matching a Gaussian kernel of `kernel_size` taps
/// (same rule as OpenCV when sigma is left at 0).
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Light Gaussian blur. Suppresses sensor noise without eroding digit strokes.
pub fn gaussian(image: DynamicImage, kernel_size: u32) -> DynamicImage {
    let gray = image.to_luma8();
    if kernel_size <= 1 {
        return DynamicImage::ImageLuma8(gray);
    }
    DynamicImage::ImageLuma8(gaussian_blur_f32(&gray, sigma_for_kernel(kernel_size)))
}

/// Mean filter over a `kernel_size` square window
pub fn mean(image: DynamicImage, kernel_size: u32) -> DynamicImage {
    let gray = image.to_luma8();
    let radius = kernel_size / 2;
    if radius == 0 {
        return DynamicImage::ImageLuma8(gray);
    }
    DynamicImage::ImageLuma8(box_filter(&gray, radius, radius))
}
