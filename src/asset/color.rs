// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::ColorError;

/// Longest edge the image is reduced to before counting pixels
const SAMPLE_EDGE: u32 = 64;

/// Bits kept per channel when bucketing pixels (16 levels per channel)
const BUCKET_BITS: u8 = 4;

/// Pixels with alpha below this are ignored
const MIN_ALPHA: u8 = 128;

/// Format an RGB triple as `#rrggbb`
pub fn to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Dominant color of an already decoded image
///
/// Pixels are bucketed into a 16x16x16 histogram; the most populated bucket
/// wins (lowest index on ties) and its pixels are averaged. Returns `None`
/// when the image has no sufficiently opaque pixel.
pub fn dominant_color(image: &DynamicImage) -> Option<String> {
    let sample = if image.width() > SAMPLE_EDGE || image.height() > SAMPLE_EDGE {
        image.thumbnail(SAMPLE_EDGE, SAMPLE_EDGE).to_rgba8()
    } else {
        image.to_rgba8()
    };

    let shift = 8 - BUCKET_BITS;
    let levels = 1usize << BUCKET_BITS;
    let mut counts = vec![0u32; levels * levels * levels];
    let mut sums = vec![[0u64; 3]; levels * levels * levels];

    for pixel in sample.pixels() {
        let [r, g, b, a] = pixel.0;
        if a < MIN_ALPHA {
            continue;
        }
        let bucket = ((r >> shift) as usize * levels + (g >> shift) as usize) * levels
            + (b >> shift) as usize;
        counts[bucket] += 1;
        sums[bucket][0] += r as u64;
        sums[bucket][1] += g as u64;
        sums[bucket][2] += b as u64;
    }

    let (bucket, &count) = counts
        .iter()
        .enumerate()
        .max_by(|(ia, ca), (ib, cb)| ca.cmp(cb).then(ib.cmp(ia)))?;
    if count == 0 {
        return None;
    }

    let count = count as u64;
    let channel = |i: usize| ((sums[bucket][i] + count / 2) / count) as u8;
    Some(to_hex(channel(0), channel(1), channel(2)))
}

/// Decode the image at `path` and compute its dominant color
pub fn extract_color(path: &Path) -> Result<String, ColorError> {
    let decode_failed = |e: image::ImageError| ColorError::DecodeFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let image = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decode_failed(image::ImageError::IoError(e)))?
        .decode()
        .map_err(decode_failed)?;

    dominant_color(&image).ok_or_else(|| ColorError::NoPixels {
        path: path.to_path_buf(),
    })
}

/// [`extract_color`] on the blocking thread pool
pub async fn extract_color_async(path: PathBuf) -> Result<String, ColorError> {
    tokio::task::spawn_blocking(move || extract_color(&path))
        .await
        .map_err(|e| ColorError::TaskFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::tempdir;

    fn is_hex_color(s: &str) -> bool {
        s.len() == 7
            && s.starts_with('#')
            && s[1..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(to_hex(0, 0, 0), "#000000");
        assert_eq!(to_hex(255, 10, 171), "#ff0aab");
        assert_eq!(to_hex(1, 2, 3), "#010203");
    }

    #[test]
    fn solid_image_yields_its_color() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([18, 52, 86])));
        assert_eq!(dominant_color(&image).as_deref(), Some("#123456"));
    }

    #[test]
    fn majority_color_wins() {
        let mut image = RgbImage::from_pixel(10, 10, Rgb([250, 250, 250]));
        for x in 0..10 {
            for y in 0..3 {
                image.put_pixel(x, y, Rgb([10, 20, 200]));
            }
        }
        let color = dominant_color(&DynamicImage::ImageRgb8(image)).unwrap();
        assert_eq!(color, "#fafafa");
    }

    #[test]
    fn transparent_pixels_are_ignored() {
        let mut image = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
        image.put_pixel(0, 0, Rgba([200, 100, 50, 255]));
        let color = dominant_color(&DynamicImage::ImageRgba8(image)).unwrap();
        assert_eq!(color, "#c86432");
    }

    #[test]
    fn fully_transparent_image_has_no_color() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 0]));
        assert_eq!(dominant_color(&DynamicImage::ImageRgba8(image)), None);
    }

    #[test]
    fn extract_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.webp");
        let mut image = RgbImage::new(40, 30);
        for (x, _, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 6) as u8, 90, 160]);
        }
        // Saved as PNG under a .webp name; decoding sniffs the content.
        DynamicImage::ImageRgb8(image)
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let color = extract_color(&path).unwrap();
        assert!(is_hex_color(&color), "not a hex color: {color}");
    }

    #[test]
    fn undecodable_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.webp");
        std::fs::write(&path, b"garbage").unwrap();

        assert!(matches!(
            extract_color(&path),
            Err(ColorError::DecodeFailed { .. })
        ));
    }

    #[tokio::test]
    async fn async_wrapper_reports_missing_file() {
        let dir = tempdir().unwrap();
        let result = extract_color_async(dir.path().join("missing.png")).await;
        assert!(result.is_err());
    }
}
