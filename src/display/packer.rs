//! Bit packing of palette indices into device bytes.

use super::profile::ConfigurationError;

/// Packs `pixels_per_byte` device codes into one byte, most significant pixel first.
#[derive(Debug, Clone)]
pub struct PixelPacker {
    pixels_per_byte: u8,
    bits_per_pixel: u8,
    codes: Vec<u8>,
}

impl PixelPacker {
    pub fn new(pixels_per_byte: u8, codes: &[u8]) -> Result<Self, ConfigurationError> {
        if pixels_per_byte == 0 || 8 % pixels_per_byte != 0 {
            return Err(ConfigurationError::InvalidPixelsPerByte(pixels_per_byte));
        }
        Ok(Self {
            pixels_per_byte,
            bits_per_pixel: 8 / pixels_per_byte,
            codes: codes.to_vec(),
        })
    }

    pub fn pixels_per_byte(&self) -> u8 {
        self.pixels_per_byte
    }

    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    /// Device code for a palette index.
    pub fn code(&self, index: usize) -> Result<u8, ConfigurationError> {
        self.codes
            .get(index)
            .copied()
            .ok_or(ConfigurationError::IndexOutOfRange {
                index,
                palette: self.codes.len(),
            })
    }

    /// Place `code` in pixel slot `slot` (0 = most significant), masking excess bits.
    #[inline]
    pub fn place(&self, code: u8, slot: u8) -> u8 {
        let mask = (((1u16 << self.bits_per_pixel) - 1) & 0xFF) as u8;
        let shift = 8 - self.bits_per_pixel * (slot + 1);
        (code & mask) << shift
    }

    /// Merge exactly `pixels_per_byte` palette indices into one byte.
    pub fn merge(&self, indices: &[usize]) -> Result<u8, ConfigurationError> {
        if indices.len() != self.pixels_per_byte as usize {
            return Err(ConfigurationError::WrongPixelCount {
                expected: self.pixels_per_byte as usize,
                actual: indices.len(),
            });
        }
        let mut byte = 0u8;
        for (slot, &index) in indices.iter().enumerate() {
            byte |= self.place(self.code(index)?, slot as u8);
        }
        Ok(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibbles_pack_high_first() {
        let packer = PixelPacker::new(2, &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]).unwrap();
        assert_eq!(packer.merge(&[1, 1]).unwrap(), 0x11);
        assert_eq!(packer.merge(&[4, 6]).unwrap(), 0x46);
    }

    #[test]
    fn uses_device_codes_not_indices() {
        // two-color panel: black 0x00, white 0x03
        let packer = PixelPacker::new(2, &[0x00, 0x03]).unwrap();
        assert_eq!(packer.merge(&[1, 0]).unwrap(), 0x30);
        assert_eq!(packer.merge(&[1, 1]).unwrap(), 0x33);
    }

    #[test]
    fn single_bits_fill_msb_first() {
        let packer = PixelPacker::new(8, &[0, 1]).unwrap();
        assert_eq!(packer.merge(&[1, 0, 0, 0, 0, 0, 0, 1]).unwrap(), 0b1000_0001);
    }

    #[test]
    fn wide_codes_are_masked() {
        let packer = PixelPacker::new(8, &[0x00, 0xFF]).unwrap();
        assert_eq!(packer.merge(&[1, 0, 1, 0, 1, 0, 1, 0]).unwrap(), 0b1010_1010);
        let packer = PixelPacker::new(1, &[0xAB]).unwrap();
        assert_eq!(packer.merge(&[0]).unwrap(), 0xAB);
    }

    #[test]
    fn wrong_pixel_count_is_a_configuration_error() {
        let packer = PixelPacker::new(2, &[0, 1]).unwrap();
        assert!(matches!(
            packer.merge(&[0]),
            Err(ConfigurationError::WrongPixelCount { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            packer.merge(&[0, 9]),
            Err(ConfigurationError::IndexOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn rejects_pixels_per_byte_not_dividing_eight() {
        for ppb in [0u8, 3, 5, 6, 7, 9] {
            assert!(PixelPacker::new(ppb, &[0]).is_err(), "ppb {}", ppb);
        }
        for ppb in [1u8, 2, 4, 8] {
            assert!(PixelPacker::new(ppb, &[0]).is_ok(), "ppb {}", ppb);
        }
    }
}
