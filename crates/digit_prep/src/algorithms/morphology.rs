use image::{GrayImage, Luma};

/// Grayscale dilation by a `size`x`size` square whose origin is its
/// bottom-right cell: each pixel takes the max over itself and the
/// `size - 1` pixels above and to the left.
fn dilate_square(image: &GrayImage, size: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mut v = 0u8;
        for sy in y.saturating_sub(size - 1)..=y {
            for sx in x.saturating_sub(size - 1)..=x {
                v = v.max(image.get_pixel(sx, sy)[0]);
            }
        }
        Luma([v])
    })
}

/// Erosion by the reflected square, the dual of [`dilate_square`]. Samples
/// outside the image are ignored.
fn erode_square(image: &GrayImage, size: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mut v = u8::MAX;
        for sy in y..(y + size).min(h) {
            for sx in x..(x + size).min(w) {
                v = v.min(image.get_pixel(sx, sy)[0]);
            }
        }
        Luma([v])
    })
}

/// Morphological closing (dilation then erosion) with a square structuring
/// element. Fills gaps narrower than `size` without shifting the shape.
pub fn close(image: &GrayImage, size: u32) -> GrayImage {
    if size <= 1 {
        return image.clone();
    }
    erode_square(&dilate_square(image, size), size)
}
