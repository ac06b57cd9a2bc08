use crate::config::RegionKind;
use image::{imageops::FilterType, DynamicImage, GrayImage, Luma};
use imageproc::{contrast::otsu_level, filter::median_filter};

/// 3×3 sharpening kernel (centre-weighted Laplacian).
const SHARPEN: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// White border around the result; improves Tesseract's text-block detection.
const PAD: u32 = 15;

/// Width of the strike-arrow strip at the left edge of a batter crop,
/// measured on the thresholded (upscaled) image.
pub const ARROW_STRIP: u32 = 20;

/// A strip that is less white than this holds the arrow.
const ARROW_WHITE_RATIO: f64 = 0.95;

/// Turn a scoreboard crop into dark text on a white background.
///
/// Pipeline: upscale (1.5× wide, 1.2× tall, or 3× for tiny crops) →
///           grayscale → median → (score fields: sharpen → median) →
///           Otsu threshold → invert if the background came out dark →
///           white border.
pub fn binarize(crop: &DynamicImage, kind: RegionKind) -> GrayImage {
    let gray = threshold(crop, kind);
    let (gw, gh) = gray.dimensions();
    let mut padded = GrayImage::from_pixel(gw + PAD * 2, gh + PAD * 2, Luma([255u8]));
    image::imageops::overlay(&mut padded, &gray, PAD as i64, PAD as i64);
    padded
}

/// Whether a batter crop carries the on-strike arrow in its leading strip.
pub fn has_strike_arrow(crop: &DynamicImage) -> bool {
    let gray = threshold(crop, RegionKind::Text);
    let strip_w = ARROW_STRIP.min(gray.width());
    let area = strip_w as usize * gray.height() as usize;
    if area == 0 {
        return false;
    }
    let white = (0..gray.height())
        .flat_map(|y| (0..strip_w).map(move |x| (x, y)))
        .filter(|&(x, y)| gray.get_pixel(x, y)[0] == 255)
        .count();
    (white as f64) < area as f64 * ARROW_WHITE_RATIO
}

/// Everything up to, but not including, the border.
fn threshold(crop: &DynamicImage, kind: RegionKind) -> GrayImage {
    let (w, h) = (crop.width().max(1), crop.height().max(1));
    let (sw, sh) = if h < 16 {
        (w * 3, h * 3)
    } else {
        ((w as f32 * 1.5).round() as u32, (h as f32 * 1.2).round() as u32)
    };
    let scaled = crop.resize_exact(sw, sh, FilterType::CatmullRom);

    let mut gray = median_filter(&scaled.to_luma8(), 1, 1);
    if kind == RegionKind::Score {
        gray = image::imageops::filter3x3(&gray, &SHARPEN);
        gray = median_filter(&gray, 1, 1);
    }

    let level = otsu_level(&gray);
    for p in gray.pixels_mut() {
        p[0] = if p[0] > level { 255 } else { 0 };
    }

    // Scoreboards usually draw light text on a dark strip.
    let white = gray.pixels().filter(|p| p[0] == 255).count();
    if white * 2 < (gray.width() * gray.height()) as usize {
        for p in gray.pixels_mut() {
            p[0] = 255 - p[0];
        }
    }
    gray
}
