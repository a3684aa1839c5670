//! Pixel-side processing.
//!
//! Color matching against a device palette, error-diffusion dithering over
//! a bounded row window, and the image-file adapter used by the CLI.

pub mod color;
pub mod dither;
pub mod matcher;
pub mod transform;
pub mod view;

pub use color::{ByteColor, Yuv};
pub use dither::{DitherMode, FloydSteinberg, HalvedErrorDither, IndexSink};
pub use matcher::ColorMatcher;
pub use transform::{load_image, Placement, Rotation, TransformOptions};
pub use view::{BgrImage, ImageError, RawImageView};
