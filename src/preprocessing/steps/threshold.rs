use image::{DynamicImage, GrayImage, Luma};

/// Sauvola parameters
const WINDOW_SIZE: u32 = 15;
const K: f64 = 0.2;
const R: f64 = 128.0;

/// Sauvola adaptive binarization.
///
/// Opt-in only: on some meter drum fonts hard thresholding eats the thin
/// strokes, so the default path stays with light smoothing.
pub fn apply(image: DynamicImage) -> DynamicImage {
    let gray = image.to_luma8();
    DynamicImage::ImageLuma8(sauvola(&gray, WINDOW_SIZE, K))
}

/// threshold = mean * (1 + k * (std_dev / R - 1)) over a square window
fn sauvola(img: &GrayImage, window_size: u32, k: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    let table = IntegralTable::new(img);
    let half = window_size / 2;

    GrayImage::from_fn(width, height, |x, y| {
        let x1 = x.saturating_sub(half);
        let y1 = y.saturating_sub(half);
        let x2 = (x + half).min(width - 1);
        let y2 = (y + half).min(height - 1);

        let (mean, std_dev) = table.window_stats(x1, y1, x2, y2);
        let threshold = mean * (1.0 + k * (std_dev / R - 1.0));

        if img.get_pixel(x, y).0[0] as f64 > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Summed-area tables of values and squared values, row-major with a zero border
struct IntegralTable {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl IntegralTable {
    fn new(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        let stride = width as usize + 1;
        let mut sum = vec![0.0; stride * (height as usize + 1)];
        let mut sum_sq = sum.clone();

        for (x, y, pixel) in img.enumerate_pixels() {
            let v = pixel.0[0] as f64;
            let (x, y) = (x as usize + 1, y as usize + 1);
            let here = y * stride + x;
            let up = (y - 1) * stride + x;
            sum[here] = v + sum[up] + sum[here - 1] - sum[up - 1];
            sum_sq[here] = v * v + sum_sq[up] + sum_sq[here - 1] - sum_sq[up - 1];
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// Mean and standard deviation of the inclusive window
    fn window_stats(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> (f64, f64) {
        let (x1, y1) = (x1 as usize, y1 as usize);
        let (x2, y2) = (x2 as usize + 1, y2 as usize + 1);
        let area = ((x2 - x1) * (y2 - y1)) as f64;

        let rect = |t: &[f64]| {
            t[y2 * self.stride + x2] - t[y1 * self.stride + x2] - t[y2 * self.stride + x1]
                + t[y1 * self.stride + x1]
        };

        let mean = rect(&self.sum) / area;
        let variance = (rect(&self.sum_sq) / area - mean * mean).max(0.0);
        (mean, variance.sqrt())
    }
}
