//! Raster encoders for single-page exports.

use crate::error::{EditorError, EditorResult};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use std::io::Cursor;

/// Composite `img` over an opaque `background`.
pub fn flatten(img: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let mix = |c: u8, bg: u8| {
            ((u16::from(c) * alpha + u16::from(bg) * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([
            mix(r, background.0[0]),
            mix(g, background.0[1]),
            mix(b, background.0[2]),
        ])
    })
}

pub fn encode_png(img: &RgbaImage) -> EditorResult<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| EditorError::export(format!("png encode: {e}")))?;
    Ok(buf)
}

/// JPEG has no alpha; transparent pixels become white.
pub fn encode_jpeg(img: &RgbaImage, quality: u8) -> EditorResult<Vec<u8>> {
    let rgb = flatten(img, Rgb([255, 255, 255]));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| EditorError::export(format!("jpeg encode: {e}")))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn flatten_blends_over_background() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        let flat = flatten(&img, Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn encoders_emit_magic_bytes() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        let jpg = encode_jpeg(&img, 90).unwrap();
        assert_eq!(&jpg[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded, img);
    }
}
