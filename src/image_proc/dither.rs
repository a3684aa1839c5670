//! Error-diffusion dithering onto a device palette.
//!
//! Images are consumed row by row straight from the scan view. Only two rows
//! of working colors are kept, so memory stays proportional to the panel width
//! regardless of image height. This matters on the Pi Zero W where a full
//! 800x480 working frame would cost megabytes.
//!
//! Two algorithms are provided:
//! - [`FloydSteinberg`] for every palette, using the classic 7/3/5/1 weights.
//! - [`HalvedErrorDither`] for black/white panels that quantize luma to 32
//!   levels and split each error evenly between the right and lower neighbor.

use super::color::ByteColor;
use super::matcher::ColorMatcher;
use super::view::RawImageView;
use std::convert::Infallible;

/// Receives quantized palette indices in scan order.
pub trait IndexSink {
    type Error;

    fn put(&mut self, index: usize) -> Result<(), Self::Error>;
}

impl IndexSink for Vec<usize> {
    type Error = Infallible;

    fn put(&mut self, index: usize) -> Result<(), Self::Error> {
        self.push(index);
        Ok(())
    }
}

/// Which error-diffusion algorithm a panel uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherMode {
    FloydSteinberg,
    HalvedError,
}

/// Floyd-Steinberg weights in sixteenths: right, below-left, below, below-right.
pub const FLOYD_STEINBERG_WEIGHTS: [i32; 4] = [7, 3, 5, 1];

/// Split a per-channel error into the four Floyd-Steinberg shares.
///
/// Each share truncates toward zero, so the shares sum to within 3 of `error`.
#[inline]
pub fn diffusion_shares(error: i32) -> [i32; 4] {
    FLOYD_STEINBERG_WEIGHTS.map(|w| error * w / 16)
}

/// Add `share` of `error` to the pixel at `x`, clamping each channel.
#[inline]
fn diffuse(row: &mut [ByteColor], x: usize, error: [i32; 3], share: usize) {
    let Some(pixel) = row.get_mut(x) else {
        return;
    };
    let [r, g, b] = error.map(|e| diffusion_shares(e)[share]);
    *pixel = ByteColor::new(
        (i32::from(pixel.r) + r).clamp(0, 255) as u8,
        (i32::from(pixel.g) + g).clamp(0, 255) as u8,
        (i32::from(pixel.b) + b).clamp(0, 255) as u8,
    );
}

/// Floyd-Steinberg ditherer over a two-row sliding window.
pub struct FloydSteinberg<'m> {
    matcher: &'m ColorMatcher,
    width: usize,
    max_rows: u32,
    current: Vec<ByteColor>,
    previous: Vec<ByteColor>,
}

impl<'m> FloydSteinberg<'m> {
    /// Ditherer producing `width` indices per row for at most `max_rows` rows.
    pub fn new(matcher: &'m ColorMatcher, width: u32, max_rows: u32) -> Self {
        let width = width as usize;
        Self {
            matcher,
            width,
            max_rows,
            current: vec![ByteColor::WHITE; width],
            previous: vec![ByteColor::WHITE; width],
        }
    }

    /// Dither `image` into `sink`, returning the number of rows emitted.
    ///
    /// Columns past the image width are filled with white before quantizing,
    /// so diffusion always sees a full-width row. Rows past `max_rows` and
    /// columns past `width` are cropped.
    pub fn run<S: IndexSink>(
        &mut self,
        image: &RawImageView<'_>,
        sink: &mut S,
    ) -> Result<u32, S::Error> {
        let rows = image.height().min(self.max_rows);

        tracing::debug!(
            "Floyd-Steinberg dithering {}x{} into {} columns, {} rows",
            image.width(),
            image.height(),
            self.width,
            rows
        );

        for y in 0..rows {
            self.load_row(image, y);
            if y > 0 {
                self.flush_previous(sink, true)?;
            }
            std::mem::swap(&mut self.current, &mut self.previous);
        }

        // The last row has nothing below it: right-neighbor diffusion only.
        if rows > 0 {
            self.flush_previous(sink, false)?;
        }

        Ok(rows)
    }

    fn load_row(&mut self, image: &RawImageView<'_>, y: u32) {
        for (x, slot) in self.current.iter_mut().enumerate() {
            *slot = image.pixel(x as u32, y);
        }
    }

    /// Quantize `previous`, spreading error right and, if `below`, into `current`.
    fn flush_previous<S: IndexSink>(&mut self, sink: &mut S, below: bool) -> Result<(), S::Error> {
        for x in 0..self.width {
            let pixel = self.previous[x];
            let index = self.matcher.color_index(pixel);
            let target = self.matcher.color(index);

            let error = [
                i32::from(pixel.r) - i32::from(target.r),
                i32::from(pixel.g) - i32::from(target.g),
                i32::from(pixel.b) - i32::from(target.b),
            ];

            if error != [0, 0, 0] {
                diffuse(&mut self.previous, x + 1, error, 0);
                if below {
                    if x > 0 {
                        diffuse(&mut self.current, x - 1, error, 1);
                    }
                    diffuse(&mut self.current, x, error, 2);
                    diffuse(&mut self.current, x + 1, error, 3);
                }
            }

            sink.put(index)?;
        }
        Ok(())
    }
}

/// Quantization levels of the halved-error ditherer.
const LUMA_LEVELS: i16 = 32;

/// Black/white ditherer with a signed per-column error accumulator.
///
/// Luma is reduced to 32 levels. Each pixel's error is split in half: one
/// half carries to the right neighbor, the remainder to the pixel below.
pub struct HalvedErrorDither {
    width: usize,
    max_rows: u32,
    black: usize,
    white: usize,
    below: Vec<i16>,
}

impl HalvedErrorDither {
    pub fn new(matcher: &ColorMatcher, width: u32, max_rows: u32) -> Self {
        Self {
            width: width as usize,
            max_rows,
            black: matcher.color_index(ByteColor::BLACK),
            white: matcher.color_index(ByteColor::WHITE),
            below: vec![0; width as usize],
        }
    }

    /// Dither `image` into `sink`, returning the number of rows emitted.
    pub fn run<S: IndexSink>(
        &mut self,
        image: &RawImageView<'_>,
        sink: &mut S,
    ) -> Result<u32, S::Error> {
        let rows = image.height().min(self.max_rows);
        let top = LUMA_LEVELS - 1;
        let threshold = LUMA_LEVELS / 2;

        tracing::debug!(
            "Halved-error dithering {}x{} into {} columns, {} rows",
            image.width(),
            image.height(),
            self.width,
            rows
        );

        self.below.iter_mut().for_each(|e| *e = 0);

        for y in 0..rows {
            let mut carry: i16 = 0;
            for x in 0..self.width {
                let level = i16::from(image.pixel(x as u32, y).luma() >> 3);
                let value = level + carry + self.below[x];

                let (index, quantized) = if value < threshold {
                    (self.black, 0)
                } else {
                    (self.white, top)
                };

                let error = value - quantized;
                carry = error / 2;
                self.below[x] = error - carry;

                sink.put(index)?;
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::view::BgrImage;

    fn black_white() -> ColorMatcher {
        ColorMatcher::new(&[ByteColor::BLACK, ByteColor::WHITE])
    }

    fn dither(matcher: &ColorMatcher, img: &BgrImage, width: u32, rows: u32) -> Vec<usize> {
        let mut out = Vec::new();
        let emitted = FloydSteinberg::new(matcher, width, rows)
            .run(&img.view(), &mut out)
            .unwrap();
        assert_eq!(out.len(), emitted as usize * width as usize);
        out
    }

    #[test]
    fn hand_computed_two_by_two() {
        // Row 0: 100 -> black (err 100), neighbor becomes 143 -> white (err -112).
        // Row 1 starts at 100 + 31 - 21 = 110 -> black, pushing 48 right: 119 -> black.
        let img = BgrImage::filled(2, 2, ByteColor::gray(100));
        assert_eq!(dither(&black_white(), &img, 2, 2), vec![0, 1, 0, 0]);
    }

    #[test]
    fn hand_computed_three_by_three() {
        // Every interior target matters here. Row 1 arrives as 110, 80, 108:
        // x=1 gets 100 + 6 (below-right of x=0) - 35 (below) + 9 (below-left of x=2).
        // Row 2 arrives as 111, 76, 109 and only diffuses right: 111 -> black,
        // 124 -> black, 163 -> white.
        let img = BgrImage::filled(3, 3, ByteColor::gray(100));
        assert_eq!(dither(&black_white(), &img, 3, 3), vec![0, 1, 0, 0, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn palette_colors_pass_through_unchanged() {
        let matcher = ColorMatcher::new(&[ByteColor::BLACK, ByteColor::WHITE, ByteColor::RED]);
        let mut img = BgrImage::filled(4, 3, ByteColor::RED);
        img.set_pixel(1, 1, ByteColor::BLACK);
        let out = dither(&matcher, &img, 4, 3);
        let expected = vec![2, 2, 2, 2, 2, 0, 2, 2, 2, 2, 2, 2];
        assert_eq!(out, expected);
    }

    #[test]
    fn narrow_image_is_padded_with_white() {
        let img = BgrImage::filled(3, 2, ByteColor::BLACK);
        let out = dither(&black_white(), &img, 8, 2);
        assert_eq!(&out[..8], &[0, 0, 0, 1, 1, 1, 1, 1]);
        assert_eq!(&out[8..], &[0, 0, 0, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn tall_and_wide_images_are_cropped() {
        let img = BgrImage::filled(10, 10, ByteColor::WHITE);
        let out = dither(&black_white(), &img, 4, 3);
        assert_eq!(out, vec![1; 12]);
    }

    #[test]
    fn mid_gray_mixes_black_and_white() {
        let img = BgrImage::filled(16, 16, ByteColor::gray(128));
        let out = dither(&black_white(), &img, 16, 16);
        let black = out.iter().filter(|&&i| i == 0).count();
        assert!(black > 64 && black < 192, "black pixels: {}", black);
    }

    #[test]
    fn single_row_only_diffuses_right() {
        // 100 -> black, 143 -> white, -112 * 7 / 16 = -49 -> 51 -> black.
        let img = BgrImage::filled(3, 1, ByteColor::gray(100));
        assert_eq!(dither(&black_white(), &img, 3, 10), vec![0, 1, 0]);
    }

    #[test]
    fn empty_image_emits_nothing() {
        let img = BgrImage::filled(0, 0, ByteColor::WHITE);
        assert!(dither(&black_white(), &img, 4, 4).is_empty());
    }

    #[test]
    fn shares_account_for_the_whole_error() {
        for error in -255..=255 {
            let sum: i32 = diffusion_shares(error).iter().sum();
            assert!((error - sum).abs() <= 3, "error {} sum {}", error, sum);
        }
        assert_eq!(diffusion_shares(16), [7, 3, 5, 1]);
    }

    fn halved(img: &BgrImage, width: u32, rows: u32) -> Vec<usize> {
        let mut out = Vec::new();
        HalvedErrorDither::new(&black_white(), width, rows)
            .run(&img.view(), &mut out)
            .unwrap();
        out
    }

    #[test]
    fn halved_error_keeps_solid_extremes() {
        assert_eq!(halved(&BgrImage::filled(8, 2, ByteColor::WHITE), 8, 2), vec![1; 16]);
        assert_eq!(halved(&BgrImage::filled(8, 2, ByteColor::BLACK), 8, 2), vec![0; 16]);
    }

    #[test]
    fn halved_error_alternates_on_mid_gray() {
        // Level 16: 16 -> white (err -15), 16 - 7 = 9 -> black (err 9), 16 + 4 -> white ...
        let out = halved(&BgrImage::filled(6, 1, ByteColor::gray(128)), 6, 1);
        assert_eq!(out, vec![1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn halved_error_carries_half_downward() {
        // Level 12. Row 0 leaves 6, -7, 3, 8 for the next row, so row 1 opens
        // at 18 -> white instead of repeating row 0.
        let out = halved(&BgrImage::filled(4, 3, ByteColor::gray(100)), 4, 3);
        assert_eq!(out, vec![0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0]);
    }

    #[test]
    fn halved_error_pads_narrow_rows_with_white() {
        let out = halved(&BgrImage::filled(2, 1, ByteColor::BLACK), 5, 1);
        assert_eq!(out, vec![0, 0, 1, 1, 1]);
    }
}
