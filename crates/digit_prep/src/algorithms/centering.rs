use image::GrayImage;
use tracing::debug;

/// Intensity-weighted centroid `(cx, cy)` from first-order moments, or the
/// geometric center when the image has no mass.
pub fn center_of_mass(image: &GrayImage) -> (f64, f64) {
    let (mut m00, mut m10, mut m01) = (0f64, 0f64, 0f64);
    for (x, y, px) in image.enumerate_pixels() {
        let v = px[0] as f64;
        m00 += v;
        m10 += x as f64 * v;
        m01 += y as f64 * v;
    }
    if m00 == 0.0 {
        return (image.width() as f64 / 2.0, image.height() as f64 / 2.0);
    }
    (m10 / m00, m01 / m00)
}

/// Copy `digit` into a zeroed `size`x`size` canvas so its centroid lands on
/// the canvas center. Pixels falling outside the canvas are dropped.
pub fn place_on_canvas(digit: &GrayImage, size: u32) -> GrayImage {
    let (cx, cy) = center_of_mass(digit);
    let center = (size / 2) as i64;
    let x_offset = center - cx.round() as i64;
    let y_offset = center - cy.round() as i64;
    debug!(cx, cy, x_offset, y_offset, "Centering digit");

    let mut canvas = GrayImage::new(size, size);
    for (x, y, px) in digit.enumerate_pixels() {
        let cx = x as i64 + x_offset;
        let cy = y as i64 + y_offset;
        if (0..size as i64).contains(&cx) && (0..size as i64).contains(&cy) {
            canvas.put_pixel(cx as u32, cy as u32, *px);
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn empty_image_falls_back_to_geometric_center() {
        assert_eq!(center_of_mass(&GrayImage::new(10, 6)), (5.0, 3.0));
    }

    #[test]
    fn symmetric_shape_lands_on_canvas_center() {
        // A plus sign, symmetric about its middle pixel.
        let digit = GrayImage::from_fn(15, 20, |x, y| {
            Luma([if x == 7 || y == 10 || (6..=8).contains(&x) { 255 } else { 0 }])
        });
        let canvas = place_on_canvas(&digit, 28);
        let (cx, cy) = center_of_mass(&canvas);
        assert!((cx - 14.0).abs() <= 1.0, "cx = {}", cx);
        assert!((cy - 14.0).abs() <= 1.0, "cy = {}", cy);
    }

    #[test]
    fn full_block_centroid_within_a_pixel() {
        let digit = GrayImage::from_pixel(20, 20, Luma([200]));
        let canvas = place_on_canvas(&digit, 28);
        let (cx, cy) = center_of_mass(&canvas);
        assert!((cx - 14.0).abs() <= 1.0 && (cy - 14.0).abs() <= 1.0);
        assert_eq!(canvas.as_raw().iter().filter(|&&v| v == 200).count(), 400);
    }

    #[test]
    fn off_center_mass_is_clipped_not_wrapped() {
        // All mass in the far corner pulls the rest of the box off canvas.
        let mut digit = GrayImage::new(20, 20);
        digit.put_pixel(19, 19, Luma([255]));
        digit.put_pixel(0, 0, Luma([1]));
        let canvas = place_on_canvas(&digit, 28);
        assert_eq!(canvas.get_pixel(14, 14)[0], 255);
        assert_eq!(canvas.as_raw().iter().filter(|&&v| v > 0).count(), 1);
    }
}
