use anyhow::Result;
use image_hasher::{HashAlg, HasherConfig, ImageHash};

/// Perceptual hash of an encoded image (format is sniffed).
pub fn compute_phash(image_bytes: &[u8]) -> Result<String> {
    let img = image::load_from_memory(image_bytes)?;
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::DoubleGradient)
        .hash_size(8, 8)
        .to_hasher();

    let hash = hasher.hash_image(&img);
    Ok(hash.to_base64())
}

pub fn compute_hamming_distance(lhs: &str, rhs: &str) -> u32 {
    let Ok(h1) = ImageHash::<Vec<u8>>::from_base64(lhs) else {
        return u32::MAX;
    };
    let Ok(h2) = ImageHash::<Vec<u8>>::from_base64(rhs) else {
        return u32::MAX;
    };
    h1.dist(&h2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(f: impl Fn(u32, u32) -> Rgb<u8>) -> Vec<u8> {
        let img = RgbImage::from_fn(32, 32, f);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn identical_images_have_zero_distance() {
        let bytes = png(|x, _| Rgb([(x * 8) as u8, 0, 0]));
        let a = compute_phash(&bytes).unwrap();
        let b = compute_phash(&bytes).unwrap();
        assert_eq!(compute_hamming_distance(&a, &b), 0);
    }

    #[test]
    fn different_images_have_positive_distance() {
        let horizontal = png(|x, _| Rgb([(x * 8) as u8, 0, 0]));
        let vertical = png(|_, y| Rgb([(255 - y * 8) as u8, 0, 0]));
        let a = compute_phash(&horizontal).unwrap();
        let b = compute_phash(&vertical).unwrap();
        assert!(compute_hamming_distance(&a, &b) > 0);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(compute_phash(b"not an image").is_err());
        assert_eq!(compute_hamming_distance("%%", "%%"), u32::MAX);
    }
}
