use image::{DynamicImage, GrayImage};
use imageproc::filter::median_filter;

/// Median filter of radius `kernel_size / 2`.
/// Removes salt-and-pepper specks on the meter glass while keeping stroke edges.
pub fn apply(image: DynamicImage, kernel_size: u32) -> DynamicImage {
    let gray = image.to_luma8();
    let radius = kernel_size / 2;
    if radius == 0 {
        return DynamicImage::ImageLuma8(gray);
    }
    DynamicImage::ImageLuma8(median(&gray, radius))
}

fn median(gray: &GrayImage, radius: u32) -> GrayImage {
    median_filter(gray, radius, radius)
}
