use image::DynamicImage;
use image_hasher::{HashAlg, Hasher, HasherConfig, ImageHash};

/// Side length of the hash grid; 8x8 gives a 64-bit hash.
pub const HASH_SIDE: u32 = 8;

/// Computes pHash fingerprints: median threshold over the low-frequency
/// DCT coefficients of a downscaled grayscale image.
pub struct PerceptualHasher {
    hasher: Hasher,
}

impl PerceptualHasher {
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(HASH_SIDE, HASH_SIDE)
            .hash_alg(HashAlg::Median)
            .preproc_dct()
            .to_hasher();
        Self { hasher }
    }

    pub fn hash_image(&self, image: &DynamicImage) -> ImageHash {
        self.hasher.hash_image(image)
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hamming distance between two hashes of the same length.
pub fn distance(a: &ImageHash, b: &ImageHash) -> u32 {
    a.dist(b)
}
