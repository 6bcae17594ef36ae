use anyhow::{anyhow, Result};
use img_hash::{HashAlg, HasherConfig};
use std::path::Path;

/// 64-bit similarity hashes for one image, each rendered as 16 hex chars.
///
/// `perceptual` (DCT mean hash) is the catalog's primary fingerprint;
/// `average` and `difference` are cheaper variants kept for similarity
/// queries at different accuracy/speed tradeoffs.
#[derive(Debug, Clone)]
pub struct Fingerprints {
    pub perceptual: String,
    pub average: String,
    pub difference: String,
}

pub fn compute_fingerprints(path: &Path) -> Result<Fingerprints> {
    // Decode once, hash three ways. The full-resolution image goes to the
    // hasher directly: the rescale-invariance contract holds only when the
    // sole resample is the hasher's own fixed-size one.
    let img = image::open(path)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    // img_hash bundles its own older `image` types, so rebuild the buffer
    let hash_img = img_hash::image::RgbaImage::from_raw(width, height, rgba.into_raw())
        .ok_or_else(|| anyhow!("failed to convert image for hashing"))?;
    let hash_img = img_hash::image::DynamicImage::ImageRgba8(hash_img);

    let perceptual = HasherConfig::new()
        .hash_size(8, 8)
        .hash_alg(HashAlg::Mean)
        .preproc_dct()
        .to_hasher()
        .hash_image(&hash_img);

    let average = HasherConfig::new()
        .hash_size(8, 8)
        .hash_alg(HashAlg::Mean)
        .to_hasher()
        .hash_image(&hash_img);

    let difference = HasherConfig::new()
        .hash_size(8, 8)
        .hash_alg(HashAlg::Gradient)
        .to_hasher()
        .hash_image(&hash_img);

    Ok(Fingerprints {
        perceptual: to_hex(perceptual.as_bytes()),
        average: to_hex(average.as_bytes()),
        difference: to_hex(difference.as_bytes()),
    })
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hamming distance between two 16-hex-char fingerprints.
pub fn hamming_distance(a: &str, b: &str) -> Result<u32> {
    let a = u64::from_str_radix(a, 16).map_err(|e| anyhow!("invalid fingerprint {a:?}: {e}"))?;
    let b = u64::from_str_radix(b, 16).map_err(|e| anyhow!("invalid fingerprint {b:?}: {e}"))?;
    Ok((a ^ b).count_ones())
}
