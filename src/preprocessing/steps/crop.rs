use crate::preprocessing::roi::CropRect;
use image::DynamicImage;

/// Cut the display region out of the raw photo.
/// The source image is left untouched; the caller has already resolved the
/// rectangle against the image dimensions.
pub fn apply(image: &DynamicImage, rect: &CropRect) -> DynamicImage {
    image.crop_imm(rect.x, rect.y, rect.width, rect.height)
}
