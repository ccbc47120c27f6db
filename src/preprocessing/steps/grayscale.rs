use image::DynamicImage;

/// Collapse to a single luminance channel (sRGB luma weights).
/// Already-gray input passes through with its pixels intact.
pub fn apply(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) => image,
        other => DynamicImage::ImageLuma8(other.to_luma8()),
    }
}
