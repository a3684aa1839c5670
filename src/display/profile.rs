//! Per-model device description.
//!
//! A [`DeviceProfile`] is immutable data validated once at construction:
//! resolution, palette and native codes, opcodes, and the init/refresh
//! scripts. The few behaviors that differ between controller families
//! (color-to-byte mapping and writer selection) dispatch on [`PanelFamily`].

use super::packer::PixelPacker;
use crate::image_proc::{ByteColor, DitherMode};
use std::time::Duration;
use thiserror::Error;

/// Invalid device description or pixel-merge input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Palette is empty")]
    EmptyPalette,

    #[error("Palette has {palette} colors but {codes} device codes")]
    PaletteMismatch { palette: usize, codes: usize },

    #[error("{0} pixels per byte does not divide 8")]
    InvalidPixelsPerByte(u8),

    #[error("Invalid resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    #[error("Width {width} is not a multiple of {pixels_per_byte} pixels per byte")]
    UnalignedWidth { width: u32, pixels_per_byte: u8 },

    #[error("Palette has no {0} entry")]
    MissingColor(&'static str),

    #[error("Missing opcode: {0}")]
    MissingOpcode(&'static str),

    #[error("Expected {expected} pixels per merge, got {actual}")]
    WrongPixelCount { expected: usize, actual: usize },

    #[error("Palette index {index} out of range for {palette} colors")]
    IndexOutOfRange { index: usize, palette: usize },
}

/// Controller families with distinct pixel handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelFamily {
    /// Black/white, several pixels per byte.
    Monochrome,
    /// Black/white plane plus a separate red plane.
    TriColorPlanes,
    /// One nibble-wide color code per pixel.
    MultiColor,
}

/// StreamWriter variant a profile needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterKind {
    SinglePlane,
    DualPlane { red_plane_opcode: u8 },
}

/// Controller opcodes the engine uses directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcodes {
    pub get_status: u8,
    pub start_transmission: u8,
    pub start_transmission_2: Option<u8>,
    pub stop_transmission: Option<u8>,
    pub power_on: u8,
    pub power_off: u8,
    pub deep_sleep: u8,
}

/// One step of an init or refresh script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Opcode followed by literal data bytes.
    Send { opcode: u8, data: Vec<u8> },
    /// Fixed wait.
    Delay(Duration),
    /// Busy-poll until ready.
    WaitReady,
}

impl Step {
    pub fn send(opcode: u8, data: &[u8]) -> Self {
        Step::Send {
            opcode,
            data: data.to_vec(),
        }
    }

    pub fn delay_ms(ms: u64) -> Self {
        Step::Delay(Duration::from_millis(ms))
    }
}

/// Unvalidated profile contents, checked by [`DeviceProfile::new`].
#[derive(Debug, Clone)]
pub struct ProfileSpec {
    pub name: &'static str,
    pub family: PanelFamily,
    pub width: u32,
    pub height: u32,
    pub pixels_per_byte: u8,
    pub palette: Vec<ByteColor>,
    pub device_codes: Vec<u8>,
    pub opcodes: Opcodes,
    pub init_script: Vec<Step>,
    pub refresh_script: Vec<Step>,
    pub dither_mode: DitherMode,
}

#[derive(Debug, Clone)]
pub struct DeviceProfile {
    spec: ProfileSpec,
    packer: PixelPacker,
    white: usize,
    black: usize,
    red: Option<usize>,
}

impl DeviceProfile {
    /// Validate `spec`. Fails on palette/code mismatch, bad packing, or a
    /// palette missing the colors the writers pad with.
    pub fn new(spec: ProfileSpec) -> Result<Self, ConfigurationError> {
        if spec.palette.is_empty() {
            return Err(ConfigurationError::EmptyPalette);
        }
        if spec.palette.len() != spec.device_codes.len() {
            return Err(ConfigurationError::PaletteMismatch {
                palette: spec.palette.len(),
                codes: spec.device_codes.len(),
            });
        }

        let packer = PixelPacker::new(spec.pixels_per_byte, &spec.device_codes)?;

        if spec.width == 0 || spec.height == 0 {
            return Err(ConfigurationError::InvalidResolution {
                width: spec.width,
                height: spec.height,
            });
        }
        if spec.width % u32::from(spec.pixels_per_byte) != 0 {
            return Err(ConfigurationError::UnalignedWidth {
                width: spec.width,
                pixels_per_byte: spec.pixels_per_byte,
            });
        }

        let find = |color: ByteColor| spec.palette.iter().position(|&c| c == color);
        let white = find(ByteColor::WHITE).ok_or(ConfigurationError::MissingColor("white"))?;
        let black = find(ByteColor::BLACK).ok_or(ConfigurationError::MissingColor("black"))?;
        let red = find(ByteColor::RED);

        if spec.family == PanelFamily::TriColorPlanes {
            if red.is_none() {
                return Err(ConfigurationError::MissingColor("red"));
            }
            if spec.opcodes.start_transmission_2.is_none() {
                return Err(ConfigurationError::MissingOpcode("start transmission 2"));
            }
        }

        Ok(Self {
            spec,
            packer,
            white,
            black,
            red,
        })
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn family(&self) -> PanelFamily {
        self.spec.family
    }

    pub fn width(&self) -> u32 {
        self.spec.width
    }

    pub fn height(&self) -> u32 {
        self.spec.height
    }

    pub fn pixels_per_byte(&self) -> u8 {
        self.spec.pixels_per_byte
    }

    pub fn palette(&self) -> &[ByteColor] {
        &self.spec.palette
    }

    pub fn opcodes(&self) -> &Opcodes {
        &self.spec.opcodes
    }

    pub fn init_script(&self) -> &[Step] {
        &self.spec.init_script
    }

    pub fn refresh_script(&self) -> &[Step] {
        &self.spec.refresh_script
    }

    pub fn dither_mode(&self) -> DitherMode {
        self.spec.dither_mode
    }

    pub fn packer(&self) -> &PixelPacker {
        &self.packer
    }

    pub fn white_index(&self) -> usize {
        self.white
    }

    pub fn black_index(&self) -> usize {
        self.black
    }

    pub fn red_index(&self) -> Option<usize> {
        self.red
    }

    /// Packed bytes in one full frame plane.
    pub fn frame_bytes(&self) -> usize {
        self.spec.width as usize / self.spec.pixels_per_byte as usize * self.spec.height as usize
    }

    /// Native code written to the primary plane for a palette index.
    ///
    /// Two-plane panels draw red on the red plane only, so red reads as
    /// black on the black/white plane.
    pub fn color_to_byte(&self, index: usize) -> Result<u8, ConfigurationError> {
        match self.spec.family {
            PanelFamily::TriColorPlanes if Some(index) == self.red => self.packer.code(self.black),
            _ => self.packer.code(index),
        }
    }

    /// Bit written to the red plane for a palette index.
    pub fn red_plane_bit(&self, index: usize) -> u8 {
        u8::from(Some(index) == self.red)
    }

    pub fn writer_kind(&self) -> WriterKind {
        match (self.spec.family, self.spec.opcodes.start_transmission_2) {
            (PanelFamily::TriColorPlanes, Some(red_plane_opcode)) => {
                WriterKind::DualPlane { red_plane_opcode }
            }
            _ => WriterKind::SinglePlane,
        }
    }
}
