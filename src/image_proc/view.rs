//! Read-only access to 24-bit BGR scan data.

use super::color::ByteColor;
use thiserror::Error;

/// Image input errors
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Invalid image layout: {0}")]
    InvalidLayout(String),

    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Borrowed view of row-major scan data, top-left first, BGR byte order.
///
/// The view only ever reads inside `[0, stride * height)`.
#[derive(Debug, Clone, Copy)]
pub struct RawImageView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
    bytes_per_pixel: usize,
}

impl<'a> RawImageView<'a> {
    /// Wrap scan data, checking that every addressed pixel lies inside `data`.
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        stride: usize,
        bytes_per_pixel: usize,
    ) -> Result<Self, ImageError> {
        if bytes_per_pixel < 3 {
            return Err(ImageError::InvalidLayout(format!(
                "{} bytes per pixel, need at least 3 for BGR",
                bytes_per_pixel
            )));
        }

        let row_bytes = (width as usize)
            .checked_mul(bytes_per_pixel)
            .ok_or_else(|| {
                ImageError::InvalidLayout(format!(
                    "{}-pixel row of {}-byte pixels overflows",
                    width, bytes_per_pixel
                ))
            })?;
        if stride < row_bytes {
            return Err(ImageError::InvalidLayout(format!(
                "stride {} shorter than a {}-pixel row ({} bytes)",
                stride, width, row_bytes
            )));
        }

        if height > 0 && width > 0 {
            let needed = stride
                .checked_mul(height as usize - 1)
                .and_then(|n| n.checked_add(row_bytes))
                .ok_or_else(|| {
                    ImageError::InvalidLayout(format!(
                        "stride {} over {} rows overflows",
                        stride, height
                    ))
                })?;
            if data.len() < needed {
                return Err(ImageError::InvalidLayout(format!(
                    "{}x{} image needs {} bytes, got {}",
                    width,
                    height,
                    needed,
                    data.len()
                )));
            }
        }

        Ok(Self {
            data,
            width,
            height,
            stride,
            bytes_per_pixel,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    /// Pixel at (`x`, `y`). Coordinates outside the image read as white.
    pub fn pixel(&self, x: u32, y: u32) -> ByteColor {
        if x >= self.width || y >= self.height {
            return ByteColor::WHITE;
        }
        let offset = y as usize * self.stride + x as usize * self.bytes_per_pixel;
        match self.data.get(offset..offset + 3) {
            Some(&[b, g, r]) => ByteColor::from_bgr([b, g, r]),
            _ => ByteColor::WHITE,
        }
    }
}

/// Owned, tightly packed 24-bit BGR buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BgrImage {
    /// Image of the given size filled with one color.
    pub fn filled(width: u32, height: u32, color: ByteColor) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&[color.b, color.g, color.r]);
        }
        Self { width, height, data }
    }

    /// Build from an RGB image, swapping channel order.
    pub fn from_rgb(img: &image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for pixel in img.pixels() {
            data.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: ByteColor) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        if let Some(slot) = self.data.get_mut(offset..offset + 3) {
            slot.copy_from_slice(&[color.b, color.g, color.r]);
        }
    }

    pub fn view(&self) -> RawImageView<'_> {
        RawImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width as usize * 3,
            bytes_per_pixel: 3,
        }
    }
}
