//! Per-object conversion
//!
//! Each item is read once, decoded, re-encoded as PNG, and written once. All
//! failures stay local to the item and come back as a failed
//! [`ConversionResult`].

use blobconv_common::{ConversionResult, ObjectName};
use image::{ColorType, ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ItemError;
use crate::storage::ObjectStore;

const OUTPUT_EXTENSION: &str = "png";

/// Output name for `input`: its last extension replaced by `.png`
///
/// Only the final `/`-separated segment is considered, and leading dots do
/// not start an extension, so `.hidden` becomes `.hidden.png`.
pub fn derive_output_name(input: &str) -> ObjectName {
    let segment_start = input.rfind('/').map(|i| i + 1).unwrap_or(0);
    let segment = &input[segment_start..];

    let stem_len = match segment.rfind('.') {
        Some(dot) if !segment[..dot].trim_start_matches('.').is_empty() => dot,
        _ => segment.len(),
    };

    format!(
        "{}.{}",
        &input[..segment_start + stem_len],
        OUTPUT_EXTENSION
    )
}

/// Result of a successful transcode
#[derive(Debug, Clone)]
pub struct Transcoded {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub color: ColorType,
}

/// Decode `bytes` (format sniffed from content) and encode as PNG
pub fn transcode_to_png(bytes: &[u8]) -> Result<Transcoded, ItemError> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| ItemError::Decode(image::ImageError::IoError(err)))?
        .decode()
        .map_err(ItemError::Decode)?;

    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, ImageFormat::Png)
        .map_err(ItemError::Encode)?;

    Ok(Transcoded {
        png: png.into_inner(),
        width: image.width(),
        height: image.height(),
        color: image.color(),
    })
}

/// Hex SHA-256 of `data`
pub fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Converts objects from one store into another
#[derive(Clone)]
pub struct Converter {
    input: Arc<dyn ObjectStore>,
    output: Arc<dyn ObjectStore>,
    skip_existing: bool,
}

impl Converter {
    pub fn new(input: Arc<dyn ObjectStore>, output: Arc<dyn ObjectStore>) -> Self {
        Self {
            input,
            output,
            skip_existing: false,
        }
    }

    /// Leave items alone whose output already exists
    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    /// Convert one object; never fails as a whole
    pub async fn convert(&self, input: &str) -> ConversionResult {
        let output = derive_output_name(input);

        if self.skip_existing {
            match self.output.exists(&output).await {
                Ok(true) => {
                    debug!(object = %input, output = %output, "Output exists, skipping");
                    return ConversionResult::skipped(input, output);
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        object = %input,
                        error = %err,
                        "Could not check for existing output, converting anyway"
                    );
                }
            }
        }

        match self.try_convert(input, &output).await {
            Ok((bytes_written, sum)) => {
                ConversionResult::succeeded(input, output, bytes_written, sum)
            }
            Err(err) => {
                warn!(
                    object = %input,
                    kind = %err.kind(),
                    error = %err,
                    "Conversion failed"
                );
                ConversionResult::failed(input, output, err.kind(), err.to_string())
            }
        }
    }

    async fn try_convert(&self, input: &str, output: &str) -> Result<(u64, String), ItemError> {
        let source = self.input.read(input).await.map_err(ItemError::Read)?;
        debug!(object = %input, bytes = source.len(), "Downloaded");

        let transcoded = tokio::task::spawn_blocking(move || transcode_to_png(&source))
            .await
            .map_err(|err| ItemError::Aborted(err.to_string()))??;

        debug!(
            object = %input,
            width = transcoded.width,
            height = transcoded.height,
            color = ?transcoded.color,
            bytes = transcoded.png.len(),
            "Encoded PNG"
        );

        let size = transcoded.png.len() as u64;
        let sum = checksum(&transcoded.png);
        self.output
            .write(output, transcoded.png)
            .await
            .map_err(ItemError::Write)?;

        debug!(object = %input, output = %output, "Uploaded");
        Ok((size, sum))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use blobconv_common::{ConversionStatus, FailureKind};
    use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let pixels: Vec<u8> = (0..width * height)
            .flat_map(|i| [(i % 251) as u8, (i % 13) as u8 * 19, 200])
            .collect();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 90)
            .encode(&pixels, width, height, ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    #[test]
    fn test_derive_output_name() {
        assert_eq!(derive_output_name("a.jpg"), "a.png");
        assert_eq!(derive_output_name("c.JPEG"), "c.png");
        assert_eq!(derive_output_name("2024/trip/IMG_1.jpg"), "2024/trip/IMG_1.png");
        assert_eq!(derive_output_name("archive.tar.jpg"), "archive.tar.png");
        assert_eq!(derive_output_name("raw"), "raw.png");
        assert_eq!(derive_output_name("v1.2/photo"), "v1.2/photo.png");
        assert_eq!(derive_output_name(".hidden"), ".hidden.png");
        assert_eq!(derive_output_name("dir/.hidden.jpg"), "dir/.hidden.png");
    }

    #[test]
    fn test_transcode_valid_jpeg() {
        let out = transcode_to_png(&jpeg(8, 6)).unwrap();
        assert_eq!((out.width, out.height), (8, 6));
        assert_eq!(
            image::guess_format(&out.png).unwrap(),
            ImageFormat::Png
        );
    }

    #[test]
    fn test_transcode_rejects_garbage() {
        let err = transcode_to_png(b"definitely not a jpeg").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Decode);

        let mut truncated = jpeg(16, 16);
        truncated.truncate(40);
        assert_eq!(
            transcode_to_png(&truncated).unwrap_err().kind(),
            FailureKind::Decode
        );
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_convert_writes_png() {
        let input = MemoryStore::with_objects("images", [("p/a.jpg", jpeg(4, 4))]);
        let output = MemoryStore::new("converted");
        let converter = Converter::new(Arc::new(input), Arc::new(output.clone()));

        let result = converter.convert("p/a.jpg").await;
        assert_eq!(result.output, "p/a.png");
        let ConversionStatus::Succeeded {
            bytes_written,
            checksum: sum,
        } = result.status
        else {
            panic!("expected success, got {:?}", result.status);
        };

        let written = output.get("p/a.png").await.unwrap();
        assert_eq!(bytes_written, written.len() as u64);
        assert_eq!(sum, checksum(&written));
    }

    #[tokio::test]
    async fn test_convert_reports_each_failure_kind() {
        let input = MemoryStore::with_objects(
            "images",
            [("bad.jpg", b"nope".to_vec()), ("ok.jpg", jpeg(2, 2))],
        );
        let output = MemoryStore::new("converted");
        output.fail_writes_to("ok.png").await;
        let converter = Converter::new(Arc::new(input), Arc::new(output));

        let missing = converter.convert("gone.jpg").await;
        let corrupt = converter.convert("bad.jpg").await;
        let rejected = converter.convert("ok.jpg").await;

        for (result, kind) in [
            (missing, FailureKind::Read),
            (corrupt, FailureKind::Decode),
            (rejected, FailureKind::Write),
        ] {
            match result.status {
                ConversionStatus::Failed { kind: actual, .. } => assert_eq!(actual, kind),
                other => panic!("expected {kind} failure, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_skip_existing() {
        let input = MemoryStore::with_objects("images", [("a.jpg", jpeg(2, 2))]);
        let output = MemoryStore::with_objects("converted", [("a.png", b"old".to_vec())]);

        let skipping = Converter::new(Arc::new(input.clone()), Arc::new(output.clone()))
            .skip_existing(true);
        assert_eq!(skipping.convert("a.jpg").await.status, ConversionStatus::Skipped);
        assert_eq!(output.get("a.png").await.unwrap(), b"old");

        let overwriting = Converter::new(Arc::new(input), Arc::new(output.clone()));
        assert!(overwriting.convert("a.jpg").await.is_success());
        assert_ne!(output.get("a.png").await.unwrap(), b"old");
    }
}
