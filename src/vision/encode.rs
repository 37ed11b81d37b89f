//! Frame encoding for transport to the OCR backend
//!
//! Raw buffers suit backends running in the same process; compressed images
//! are needed whenever the frame crosses a process or network boundary.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use anyhow::Context;
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

use crate::capture::Frame;
use crate::error::OcrError;

/// Default JPEG quality (0-100)
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// How captured frames are serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EncodeFormat {
    /// Lossless PNG
    Png,
    /// JPEG at the configured quality
    #[default]
    Jpeg,
    /// Uncompressed RGBA pixels
    Raw,
}

/// Compressed image container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressedFormat {
    Png,
    Jpeg,
}

impl CompressedFormat {
    /// MIME type of the encoded bytes
    pub fn mime_type(&self) -> &'static str {
        match self {
            CompressedFormat::Png => "image/png",
            CompressedFormat::Jpeg => "image/jpeg",
        }
    }

    fn image_format(&self) -> image::ImageFormat {
        match self {
            CompressedFormat::Png => image::ImageFormat::Png,
            CompressedFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// An encoded frame, ready to hand to an OCR backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessedImage {
    /// Compressed image bytes
    Compressed {
        format: CompressedFormat,
        width: u32,
        height: u32,
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
    /// Uncompressed RGBA pixels
    Raw {
        width: u32,
        height: u32,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
}

impl ProcessedImage {
    /// Image dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ProcessedImage::Compressed { width, height, .. } => (*width, *height),
            ProcessedImage::Raw { width, height, .. } => (*width, *height),
        }
    }

    /// Payload size in bytes
    pub fn byte_len(&self) -> usize {
        match self {
            ProcessedImage::Compressed { bytes, .. } => bytes.len(),
            ProcessedImage::Raw { data, .. } => data.len(),
        }
    }

    /// Compressed form of this image; raw images are PNG encoded
    pub fn compressed(&self) -> Result<(CompressedFormat, Cow<'_, [u8]>), OcrError> {
        match self {
            ProcessedImage::Compressed { format, bytes, .. } => {
                Ok((*format, Cow::Borrowed(bytes.as_slice())))
            }
            ProcessedImage::Raw { width, height, data } => {
                let bytes = encode_png(data, *width, *height)?;
                Ok((CompressedFormat::Png, Cow::Owned(bytes)))
            }
        }
    }

    /// `data:<mime>;base64,<payload>` form of the image
    pub fn to_data_url(&self) -> Result<String, OcrError> {
        let (format, bytes) = self.compressed()?;
        Ok(format!(
            "data:{};base64,{}",
            format.mime_type(),
            STANDARD.encode(bytes.as_ref())
        ))
    }
}

/// Frame encoder
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    format: EncodeFormat,
    jpeg_quality: u8,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(EncodeFormat::default(), DEFAULT_JPEG_QUALITY)
    }
}

impl Encoder {
    /// Create a new encoder; quality is clamped to 1-100
    pub fn new(format: EncodeFormat, jpeg_quality: u8) -> Self {
        Self {
            format,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Get the output format
    pub fn format(&self) -> EncodeFormat {
        self.format
    }

    /// Encode a frame
    pub fn encode(&self, frame: &Frame) -> Result<ProcessedImage, OcrError> {
        let image = match self.format {
            EncodeFormat::Raw => ProcessedImage::Raw {
                width: frame.width,
                height: frame.height,
                data: frame.data.clone(),
            },
            EncodeFormat::Png => ProcessedImage::Compressed {
                format: CompressedFormat::Png,
                width: frame.width,
                height: frame.height,
                bytes: encode_png(&frame.data, frame.width, frame.height)?,
            },
            EncodeFormat::Jpeg => ProcessedImage::Compressed {
                format: CompressedFormat::Jpeg,
                width: frame.width,
                height: frame.height,
                bytes: encode_jpeg(frame, self.jpeg_quality)?,
            },
        };

        debug!(
            "Encoded {}x{} frame as {:?}: {} bytes",
            frame.width,
            frame.height,
            self.format,
            image.byte_len()
        );
        Ok(image)
    }
}

/// Decode an encoded image back into an RGBA frame
pub fn decode(image: &ProcessedImage) -> Result<Frame, OcrError> {
    match image {
        ProcessedImage::Raw { width, height, data } => {
            if data.len() != (*width as usize) * (*height as usize) * 4 {
                return Err(OcrError::Encode(format!(
                    "raw buffer of {} bytes does not match {}x{}",
                    data.len(),
                    width,
                    height
                )));
            }
            Ok(Frame::new(data.clone(), *width, *height))
        }
        ProcessedImage::Compressed { format, bytes, .. } => {
            let decoded = image::load_from_memory_with_format(bytes, format.image_format())?;
            Ok(Frame::from_image(decoded.to_rgba8()))
        }
    }
}

/// Write the image as the OCR backend sees it to a PNG file
pub fn save_frame(image: &ProcessedImage, path: &Path) -> anyhow::Result<()> {
    let frame = decode(image)?;
    let buffer = frame
        .to_image()
        .ok_or_else(|| anyhow::anyhow!("frame buffer size mismatch"))?;
    buffer
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write frame to {:?}", path))?;
    Ok(())
}

fn encode_png(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, OcrError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(data, width, height, ExtendedColorType::Rgba8)?;
    Ok(bytes)
}

fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, OcrError> {
    // JPEG has no alpha channel
    let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| OcrError::Encode("frame buffer size mismatch".to_string()))?;
    let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).write_image(
        rgb.as_raw(),
        frame.width,
        frame.height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(bytes)
}

/// Serde helper storing byte buffers as base64 strings
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
