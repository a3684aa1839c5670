//! 24-bit color value used by the matcher and the ditherers.

/// An RGB color with 8 bits per channel.
///
/// Input pixels arrive in BGR order from the image view; this type is always
/// stored as R, G, B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ByteColor {
    pub const BLACK: ByteColor = ByteColor::new(0, 0, 0);
    pub const WHITE: ByteColor = ByteColor::new(255, 255, 255);
    pub const RED: ByteColor = ByteColor::new(255, 0, 0);
    pub const GREEN: ByteColor = ByteColor::new(0, 255, 0);
    pub const BLUE: ByteColor = ByteColor::new(0, 0, 255);
    pub const YELLOW: ByteColor = ByteColor::new(255, 255, 0);
    pub const ORANGE: ByteColor = ByteColor::new(255, 128, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from a 24-bit BGR triple as laid out in scan memory.
    pub const fn from_bgr(bgr: [u8; 3]) -> Self {
        Self::new(bgr[2], bgr[1], bgr[0])
    }

    /// Gray of the given intensity.
    pub const fn gray(level: u8) -> Self {
        Self::new(level, level, level)
    }

    /// True when all three channels are equal.
    pub fn is_monochrome(&self) -> bool {
        self.r == self.g && self.g == self.b
    }

    /// Luma-weighted intensity (BT.601), rounded to the nearest level.
    pub fn luma(&self) -> u8 {
        let y = 0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b);
        y.round().clamp(0.0, 255.0) as u8
    }

    /// Collapse to the gray of equal luma.
    pub fn desaturate(&self) -> Self {
        Self::gray(self.luma())
    }

    /// Convert to YUV with U and V offset by 128.
    pub fn to_yuv(&self) -> Yuv {
        let (r, g, b) = (f64::from(self.r), f64::from(self.g), f64::from(self.b));
        Yuv {
            y: 0.299 * r + 0.587 * g + 0.114 * b,
            u: -0.168736 * r - 0.331264 * g + 0.5 * b + 128.0,
            v: 0.5 * r - 0.418688 * g - 0.081312 * b + 128.0,
        }
    }
}

/// A color in YUV space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Yuv {
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

impl Yuv {
    /// Squared Euclidean distance.
    pub fn distance_squared(&self, other: &Yuv) -> f64 {
        let dy = self.y - other.y;
        let du = self.u - other.u;
        let dv = self.v - other.v;
        dy * dy + du * du + dv * dv
    }
}
