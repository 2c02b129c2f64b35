use image::{Rgb, RgbImage, RgbaImage};
use tracing::debug;

/// Mean foreground intensity above which the digit counts as light.
pub const LIGHT_DIGIT_THRESHOLD: f64 = 127.0;

/// Solid background the segmented digit is flattened onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundColor {
    Black,
    White,
}

impl BackgroundColor {
    pub fn value(&self) -> u8 {
        match self {
            Self::Black => 0,
            Self::White => 255,
        }
    }
}

/// Pick the background that contrasts most with the digit: black under a
/// light digit, white under a dark one, white when nothing is opaque.
pub fn choose_background(segmented: &RgbaImage) -> BackgroundColor {
    let mut sum = 0u64;
    let mut count = 0u64;
    for px in segmented.pixels().filter(|p| p[3] > 0) {
        sum += px[0] as u64 + px[1] as u64 + px[2] as u64;
        count += 3;
    }

    if count == 0 {
        debug!("No foreground pixels in segmentation, defaulting to white background");
        return BackgroundColor::White;
    }

    let mean = sum as f64 / count as f64;
    let background = if mean > LIGHT_DIGIT_THRESHOLD {
        BackgroundColor::Black
    } else {
        BackgroundColor::White
    };
    debug!(mean_foreground = mean, ?background, "Chose composite background");
    background
}

/// Alpha-composite the segmented image over a solid background.
///
/// Fully transparent pixels become exactly the background color.
pub fn composite(segmented: &RgbaImage) -> RgbImage {
    let bg = choose_background(segmented).value() as u32;
    RgbImage::from_fn(segmented.width(), segmented.height(), |x, y| {
        let px = segmented.get_pixel(x, y);
        let a = px[3] as u32;
        let blend = |c: u8| ((c as u32 * a + bg * (255 - a) + 127) / 255) as u8;
        Rgb([blend(px[0]), blend(px[1]), blend(px[2])])
    })
}
