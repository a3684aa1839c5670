//! Image file loading and preparation for a panel.
//!
//! Decodes an image file, applies rotation and mirroring, optionally scales
//! it to the panel resolution and hands back an owned BGR buffer ready for
//! [`crate::display::DisplayEngine::display_image`].

use super::view::{BgrImage, ImageError};
use image::{DynamicImage, GenericImageView, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rotation angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl From<u16> for Rotation {
    fn from(degrees: u16) -> Self {
        match degrees {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => Rotation::None,
        }
    }
}

/// How the image is sized against the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    /// Keep the decoded size; the panel pads or crops at the top-left.
    #[default]
    AsIs,
    /// Scale to fit inside the panel, centered on white.
    Fit,
    /// Scale to cover the panel, center-cropping the overflow.
    Fill,
}

/// Image preparation options
#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub rotation: Rotation,
    pub mirror_h: bool,
    pub mirror_v: bool,
    pub placement: Placement,
    /// Target panel width
    pub target_width: u32,
    /// Target panel height
    pub target_height: u32,
}

impl TransformOptions {
    /// Defaults for a panel of the given resolution.
    pub fn for_panel(target_width: u32, target_height: u32) -> Self {
        Self {
            rotation: Rotation::None,
            mirror_h: false,
            mirror_v: false,
            placement: Placement::AsIs,
            target_width,
            target_height,
        }
    }
}

/// Decode an image file and prepare it for the panel.
pub fn load_image<P: AsRef<Path>>(path: P, options: &TransformOptions) -> Result<BgrImage, ImageError> {
    let path = path.as_ref();
    tracing::info!("Loading image {}", path.display());

    let img = image::ImageReader::open(path)?.with_guessed_format()?.decode()?;
    tracing::debug!("Image decoded: {}x{}", img.width(), img.height());

    Ok(BgrImage::from_rgb(&transform_image(img, options)))
}

/// Rotation, then mirroring, then scaling.
pub fn transform_image(img: DynamicImage, options: &TransformOptions) -> RgbImage {
    let img = apply_rotation(img, options.rotation);
    let img = apply_mirroring(img, options.mirror_h, options.mirror_v);

    let (target_width, target_height) = (options.target_width, options.target_height);
    let placed = match options.placement {
        Placement::AsIs => img,
        Placement::Fit => scale_to_fit(img, target_width, target_height),
        Placement::Fill => scale_to_fill(img, target_width, target_height),
    };

    placed.into_rgb8()
}

fn apply_rotation(img: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => img,
        Rotation::Rotate90 => img.rotate90(),
        Rotation::Rotate180 => img.rotate180(),
        Rotation::Rotate270 => img.rotate270(),
    }
}

fn apply_mirroring(mut img: DynamicImage, mirror_h: bool, mirror_v: bool) -> DynamicImage {
    if mirror_h {
        img = img.fliph();
    }
    if mirror_v {
        img = img.flipv();
    }
    img
}

/// Letterbox/pillarbox onto a white canvas of the target size.
fn scale_to_fit(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (src_width, src_height) = img.dimensions();
    if src_width == 0 || src_height == 0 {
        return img;
    }

    let scale = (max_width as f32 / src_width as f32).min(max_height as f32 / src_height as f32);
    let new_width = ((src_width as f32 * scale) as u32).clamp(1, max_width);
    let new_height = ((src_height as f32 * scale) as u32).clamp(1, max_height);

    tracing::debug!(
        "Scaling {}x{} -> {}x{} (fit into {}x{})",
        src_width,
        src_height,
        new_width,
        new_height,
        max_width,
        max_height
    );

    let resized = img.resize_exact(new_width, new_height, image::imageops::FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(max_width, max_height, image::Rgb([255, 255, 255]));

    let offset_x = (max_width - new_width) / 2;
    let offset_y = (max_height - new_height) / 2;
    image::imageops::overlay(&mut canvas, &resized.to_rgb8(), offset_x as i64, offset_y as i64);

    DynamicImage::ImageRgb8(canvas)
}

/// Scale to cover the target, then center-crop.
fn scale_to_fill(img: DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    let (src_width, src_height) = img.dimensions();
    if src_width == 0 || src_height == 0 {
        return img;
    }

    let scale = (target_width as f32 / src_width as f32).max(target_height as f32 / src_height as f32);
    let new_width = ((src_width as f32 * scale).ceil() as u32).max(target_width);
    let new_height = ((src_height as f32 * scale).ceil() as u32).max(target_height);

    tracing::debug!(
        "Scaling {}x{} -> {}x{} (fill {}x{})",
        src_width,
        src_height,
        new_width,
        new_height,
        target_width,
        target_height
    );

    let resized = img.resize_exact(new_width, new_height, image::imageops::FilterType::Triangle);

    let crop_x = (new_width - target_width) / 2;
    let crop_y = (new_height - target_height) / 2;
    resized.crop_imm(crop_x, crop_y, target_width, target_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::ByteColor;

    fn red_block(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([255, 0, 0])))
    }

    #[test]
    fn as_is_keeps_the_decoded_size() {
        let out = transform_image(red_block(30, 10), &TransformOptions::for_panel(100, 100));
        assert_eq!(out.dimensions(), (30, 10));
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let mut options = TransformOptions::for_panel(100, 100);
        options.rotation = Rotation::from(90);
        let out = transform_image(red_block(30, 10), &options);
        assert_eq!(out.dimensions(), (10, 30));
    }

    #[test]
    fn fit_letterboxes_on_white() {
        let mut options = TransformOptions::for_panel(40, 40);
        options.placement = Placement::Fit;
        let out = transform_image(red_block(40, 20), &options);
        assert_eq!(out.dimensions(), (40, 40));
        assert_eq!(out.get_pixel(20, 2).0, [255, 255, 255]);
        assert_eq!(out.get_pixel(20, 20).0, [255, 0, 0]);
    }

    #[test]
    fn fill_covers_the_panel() {
        let mut options = TransformOptions::for_panel(40, 40);
        options.placement = Placement::Fill;
        let out = transform_image(red_block(80, 20), &options);
        assert_eq!(out.dimensions(), (40, 40));
    }

    #[test]
    fn converted_buffer_is_bgr() {
        let rgb = RgbImage::from_pixel(2, 1, image::Rgb([1, 2, 3]));
        let bgr = BgrImage::from_rgb(&rgb);
        assert_eq!(bgr.view().pixel(1, 0), ByteColor::new(1, 2, 3));
    }

    #[test]
    fn unknown_rotation_is_ignored() {
        assert_eq!(Rotation::from(45), Rotation::None);
    }
}
