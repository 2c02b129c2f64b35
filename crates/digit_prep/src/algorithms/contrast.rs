use image::{GrayImage, Luma};
use tracing::debug;

use crate::algorithms::NormalizationParams;

/// Linear stretch of `[min, max]` onto `[0, 255]`. Returns `None` when the
/// buffer has zero range.
pub fn stretch_histogram(image: &GrayImage) -> Option<GrayImage> {
    let raw = image.as_raw();
    let min = *raw.iter().min()?;
    let max = *raw.iter().max()?;
    if max == min {
        return None;
    }
    Some(imageproc::contrast::stretch_contrast(image, min, max))
}

/// Contrast-limited adaptive histogram equalization.
///
/// Each of the `tiles`x`tiles` regions gets a clipped-histogram lookup table;
/// pixels are mapped by bilinear interpolation between the four nearest tile
/// tables.
pub fn clahe(image: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let tiles_x = tiles.clamp(1, w);
    let tiles_y = tiles.clamp(1, h);
    let tile_w = w / tiles_x;
    let tile_h = h / tiles_y;

    let tile_bounds = |t: u32, size: u32, count: u32, len: u32| {
        let start = t * size;
        let end = if t == count - 1 { len } else { start + size };
        (start, end)
    };

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        let (y0, y1) = tile_bounds(ty, tile_h, tiles_y, h);
        for tx in 0..tiles_x {
            let (x0, x1) = tile_bounds(tx, tile_w, tiles_x, w);
            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[image.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            luts[(ty * tiles_x + tx) as usize] = clipped_lut(&mut hist, area, clip_limit);
        }
    }

    // Tile t's table applies fully at p = (t + 0.5) * size.
    let locate = |p: u32, size: u32, count: u32| -> (usize, usize, f32) {
        let f = p as f32 / size as f32 - 0.5;
        let lo = f.floor();
        let frac = f - lo;
        let clamp = |t: f32| t.max(0.0).min((count - 1) as f32) as usize;
        (clamp(lo), clamp(lo + 1.0), frac)
    };

    GrayImage::from_fn(w, h, |x, y| {
        let v = image.get_pixel(x, y)[0] as usize;
        let (tx0, tx1, fx) = locate(x, tile_w, tiles_x);
        let (ty0, ty1, fy) = locate(y, tile_h, tiles_y);
        let lut = |tx: usize, ty: usize| luts[ty * tiles_x as usize + tx][v] as f32;
        let top = lut(tx0, ty0) * (1.0 - fx) + lut(tx1, ty0) * fx;
        let bottom = lut(tx0, ty1) * (1.0 - fx) + lut(tx1, ty1) * fx;
        Luma([(top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8])
    })
}

fn clipped_lut(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let per_bin = excess / 256;
    let remainder = (excess % 256) as usize;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if remainder > 0 {
        let step = (256 / remainder).max(1);
        for bin in hist.iter_mut().step_by(step).take(remainder) {
            *bin += 1;
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (i, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Stretch then equalize. Zero-range crops are returned unchanged.
pub fn normalize_contrast(crop: &GrayImage, params: &NormalizationParams) -> GrayImage {
    match stretch_histogram(crop) {
        Some(stretched) => clahe(&stretched, params.clahe_clip_limit, params.clahe_tiles),
        None => {
            debug!("Zero-range crop, skipping contrast normalization");
            crop.clone()
        }
    }
}
