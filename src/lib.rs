//! Streaming e-paper driver.
//!
//! Turns a bitmap into the exact command and data bytes a panel controller
//! expects: nearest-color matching, optional error diffusion, bit packing
//! and buffered transmission, wrapped in a small lifecycle state machine.
//!
//! ```no_run
//! use epaper_stream::display::{DisplayEngine, Model, RecordingTransport};
//! use epaper_stream::image_proc::{BgrImage, ByteColor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = DisplayEngine::new(Model::Epd5in65f.profile()?);
//! engine.initialize(RecordingTransport::new())?;
//! let image = BgrImage::filled(600, 448, ByteColor::RED);
//! engine.display_image(&image.view(), true)?;
//! engine.dispose();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod display;
pub mod image_proc;
