//! Shared fixtures for blobconv-worker integration tests
//!
//! JPEGs are generated in-process with the `image` encoder so tests need no
//! checked-in binaries.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};
use std::path::Path;

/// A small gradient JPEG; `seed` varies the pixels
pub fn jpeg(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let pixels: Vec<u8> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .flat_map(|(x, y)| {
            [
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                seed,
            ]
        })
        .collect();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 85)
        .encode(&pixels, width, height, ExtendedColorType::Rgb8)
        .expect("Failed to encode fixture JPEG");
    out
}

/// Bytes that no decoder accepts
pub fn corrupt_jpeg() -> Vec<u8> {
    let mut bytes = jpeg(16, 16, 0);
    bytes.truncate(48);
    bytes
}

/// Write `data` to `<root>/<container>/<name>`, creating directories
pub fn put_file(root: &Path, container: &str, name: &str, data: &[u8]) {
    let path = root.join(container).join(name);
    std::fs::create_dir_all(path.parent().expect("object path has a parent"))
        .expect("Failed to create fixture directory");
    std::fs::write(&path, data).expect("Failed to write fixture");
}

pub fn is_png(data: &[u8]) -> bool {
    image::guess_format(data).ok() == Some(image::ImageFormat::Png)
}
