//! Buffered packing writer between the pixel pipeline and the bus.
//!
//! Palette indices go in one at a time, get mapped to device codes and
//! packed into bytes, and leave in bursts once [`FLUSH_THRESHOLD`] bytes are
//! buffered. Two-plane panels additionally build a red plane in memory and
//! send it as one block after the primary plane.

use super::bus::CommandBus;
use super::engine::DisplayError;
use super::profile::{ConfigurationError, DeviceProfile, WriterKind};
use super::transport::HardwareTransport;
use crate::image_proc::IndexSink;

/// Buffered bytes that trigger a bus write.
pub const FLUSH_THRESHOLD: usize = 4096;

/// Partially filled output byte.
#[derive(Debug, Default)]
struct Accumulator {
    value: u8,
    filled: u8,
}

impl Accumulator {
    fn is_aligned(&self) -> bool {
        self.filled == 0
    }

    /// Add an already placed pixel; returns the byte once `pixels_per_byte` are in.
    fn push(&mut self, placed: u8, pixels_per_byte: u8) -> Option<u8> {
        self.value |= placed;
        self.filled += 1;
        if self.filled == pixels_per_byte {
            let byte = self.value;
            *self = Self::default();
            Some(byte)
        } else {
            None
        }
    }
}

/// In-memory red plane of a two-plane panel.
struct RedPlane {
    opcode: u8,
    acc: Accumulator,
    bytes: Vec<u8>,
    blank_line: Vec<u8>,
}

pub struct StreamWriter<'a, T: HardwareTransport> {
    bus: &'a mut CommandBus<T>,
    profile: &'a DeviceProfile,
    acc: Accumulator,
    buffer: Vec<u8>,
    white_line: Vec<u8>,
    emitted: usize,
    red_plane: Option<RedPlane>,
}

impl<'a, T: HardwareTransport> StreamWriter<'a, T> {
    /// Writer for `profile`, picking the single- or two-plane variant it asks for.
    pub fn new(profile: &'a DeviceProfile, bus: &'a mut CommandBus<T>) -> Result<Self, ConfigurationError> {
        let white_line = line_of(profile, profile.color_to_byte(profile.white_index())?);

        let red_plane = match profile.writer_kind() {
            WriterKind::SinglePlane => None,
            WriterKind::DualPlane { red_plane_opcode } => Some(RedPlane {
                opcode: red_plane_opcode,
                acc: Accumulator::default(),
                bytes: Vec::with_capacity(profile.frame_bytes()),
                blank_line: line_of(profile, 0),
            }),
        };

        Ok(Self {
            bus,
            profile,
            acc: Accumulator::default(),
            buffer: Vec::with_capacity(FLUSH_THRESHOLD + white_line.len()),
            white_line,
            emitted: 0,
            red_plane,
        })
    }

    /// Primary-plane bytes produced so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Write one pixel by palette index.
    pub fn write(&mut self, index: usize) -> Result<(), DisplayError> {
        let profile = self.profile;
        let packer = profile.packer();
        let ppb = packer.pixels_per_byte();

        let placed = packer.place(profile.color_to_byte(index)?, self.acc.filled);
        if let Some(byte) = self.acc.push(placed, ppb) {
            self.buffer.push(byte);
            self.emitted += 1;
        }

        if let Some(red) = self.red_plane.as_mut() {
            let placed = packer.place(profile.red_plane_bit(index), red.acc.filled);
            if let Some(byte) = red.acc.push(placed, ppb) {
                red.bytes.push(byte);
            }
        }

        self.flush_if_full()
    }

    /// Write one white pixel, used to pad a short row.
    pub fn write_blank_pixel(&mut self) -> Result<(), DisplayError> {
        self.write(self.profile.white_index())
    }

    /// Finish any partial byte with white, then append a full white row.
    pub fn write_blank_line(&mut self) -> Result<(), DisplayError> {
        self.align()?;
        self.buffer.extend_from_slice(&self.white_line);
        self.emitted += self.white_line.len();
        if let Some(red) = self.red_plane.as_mut() {
            red.bytes.extend_from_slice(&red.blank_line);
        }
        self.flush_if_full()
    }

    /// Append `rows` full rows of one palette index.
    pub fn write_solid_lines(&mut self, index: usize, rows: u32) -> Result<(), DisplayError> {
        if index == self.profile.white_index() {
            for _ in 0..rows {
                self.write_blank_line()?;
            }
            return Ok(());
        }

        self.align()?;
        let line = line_of(self.profile, self.profile.color_to_byte(index)?);
        let red_line = line_of(self.profile, self.profile.red_plane_bit(index));
        for _ in 0..rows {
            self.buffer.extend_from_slice(&line);
            self.emitted += line.len();
            if let Some(red) = self.red_plane.as_mut() {
                red.bytes.extend_from_slice(&red_line);
            }
            self.flush_if_full()?;
        }
        Ok(())
    }

    /// Flush the primary plane, then send the red plane if there is one.
    ///
    /// Returns the number of primary-plane bytes sent.
    pub fn finish(mut self) -> Result<usize, DisplayError> {
        self.align()?;
        self.flush()?;

        if let Some(red) = self.red_plane.take() {
            tracing::debug!("Sending red plane ({} bytes)", red.bytes.len());
            self.bus.send_command(red.opcode)?;
            self.bus.send_data(&red.bytes)?;
        }

        Ok(self.emitted)
    }

    fn align(&mut self) -> Result<(), DisplayError> {
        while !self.acc.is_aligned() {
            self.write_blank_pixel()?;
        }
        Ok(())
    }

    fn flush_if_full(&mut self) -> Result<(), DisplayError> {
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        for chunk in self.buffer.chunks(FLUSH_THRESHOLD) {
            self.bus.send_data(chunk)?;
        }
        self.buffer.clear();
        Ok(())
    }
}

impl<T: HardwareTransport> IndexSink for StreamWriter<'_, T> {
    type Error = DisplayError;

    fn put(&mut self, index: usize) -> Result<(), Self::Error> {
        self.write(index)
    }
}

/// One panel row with every pixel set to `code`.
fn line_of(profile: &DeviceProfile, code: u8) -> Vec<u8> {
    let packer = profile.packer();
    let ppb = packer.pixels_per_byte();
    let byte = (0..ppb).fold(0u8, |byte, slot| byte | packer.place(code, slot));
    vec![byte; profile.width() as usize / ppb as usize]
}
