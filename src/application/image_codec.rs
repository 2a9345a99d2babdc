//! Data-URI image decoding and PNG re-encoding.

use std::io::Cursor;

use base64::{prelude::BASE64_STANDARD, Engine};
use image::{DynamicImage, ImageFormat, RgbImage};
use thiserror::Error;

use crate::domain::errors::DomainError;

/// Largest decoded image accepted (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("missing ',' separator in data URI")]
    MissingSeparator,

    #[error("malformed base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("image data is empty")]
    EmptyData,

    #[error("image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("unrecognized image data: {0}")]
    UnrecognizedImage(#[from] image::ImageError),
}

impl From<DecodeError> for DomainError {
    fn from(e: DecodeError) -> Self {
        DomainError::Decode(e.to_string())
    }
}

/// Decodes `data:<mime>;base64,<payload>`; everything up to and including the
/// first comma is treated as header. Whitespace inside the payload (line
/// wrapping) is ignored.
pub fn decode_data_uri(uri: &str) -> Result<DynamicImage, DecodeError> {
    let (_, payload) = uri.split_once(',').ok_or(DecodeError::MissingSeparator)?;
    let compact: Vec<u8> = payload.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    let bytes = BASE64_STANDARD.decode(&compact)?;

    if bytes.is_empty() {
        return Err(DecodeError::EmptyData);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(DecodeError::TooLarge(bytes.len(), MAX_IMAGE_BYTES));
    }

    Ok(image::load_from_memory(&bytes)?)
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

pub fn encode_png_data_uri(image: &RgbImage) -> Result<String, image::ImageError> {
    let png = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", BASE64_STANDARD.encode(png)))
}
