//! Nearest-color lookup against a device palette.
//!
//! Fully monochrome palettes are compared on a single channel after the input
//! has been desaturated. Any palette with a chromatic entry is compared in YUV
//! space with squared Euclidean distance.

use super::color::{ByteColor, Yuv};

/// Maps arbitrary colors to the index of the closest palette entry.
#[derive(Debug, Clone)]
pub struct ColorMatcher {
    palette: Vec<ByteColor>,
    palette_yuv: Vec<Yuv>,
    monochrome: bool,
}

impl ColorMatcher {
    pub fn new(palette: &[ByteColor]) -> Self {
        let monochrome = palette.iter().all(ByteColor::is_monochrome);
        Self {
            palette: palette.to_vec(),
            palette_yuv: palette.iter().map(ByteColor::to_yuv).collect(),
            monochrome,
        }
    }

    /// Whether every palette entry is a gray.
    pub fn is_monochrome(&self) -> bool {
        self.monochrome
    }

    pub fn palette(&self) -> &[ByteColor] {
        &self.palette
    }

    /// Palette color at `index`.
    ///
    /// Indices come from [`ColorMatcher::color_index`], so out of range falls
    /// back to the first entry.
    pub fn color(&self, index: usize) -> ByteColor {
        self.palette
            .get(index)
            .or_else(|| self.palette.first())
            .copied()
            .unwrap_or(ByteColor::WHITE)
    }

    /// Index of the closest palette entry.
    ///
    /// Entries are scanned in palette order and the first minimum wins. The
    /// scan stops at the first exact match.
    pub fn color_index(&self, color: ByteColor) -> usize {
        if self.monochrome {
            self.closest_gray(color.desaturate())
        } else {
            self.closest_yuv(color)
        }
    }

    fn closest_gray(&self, color: ByteColor) -> usize {
        let mut best = 0;
        let mut best_distance = u32::MAX;
        for (index, entry) in self.palette.iter().enumerate() {
            let d = u32::from(color.r.abs_diff(entry.r));
            let distance = d * d;
            if distance < best_distance {
                best = index;
                best_distance = distance;
                if distance == 0 {
                    break;
                }
            }
        }
        best
    }

    fn closest_yuv(&self, color: ByteColor) -> usize {
        let yuv = color.to_yuv();
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (index, entry) in self.palette_yuv.iter().enumerate() {
            let distance = yuv.distance_squared(entry);
            if distance < best_distance {
                best = index;
                best_distance = distance;
                if distance == 0.0 {
                    break;
                }
            }
        }
        best
    }
}
