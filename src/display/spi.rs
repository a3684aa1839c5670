//! SPI bus for the e-paper HAT.
//!
//! Mode 0, MSB first. Clock speed and bus/CE selection come from the
//! transport configuration (SPI0/CE0 at 4 MHz by default).

use super::transport::{TransportError, MAX_BURST};
use crate::config::TransportConfig;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

/// SPI device for one panel
pub struct SpiBus {
    spi: Spi,
}

impl SpiBus {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let bus = match config.spi_bus {
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            _ => Bus::Spi0,
        };
        let slave_select = match config.slave_select {
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            _ => SlaveSelect::Ss0,
        };

        let spi = Spi::new(bus, slave_select, config.clock_speed_hz, Mode::Mode0)?;

        tracing::debug!(
            "SPI initialized: Bus={:?}, SS={:?}, Speed={}Hz, Mode=0",
            bus,
            slave_select,
            config.clock_speed_hz
        );

        Ok(Self { spi })
    }

    /// Write bytes, split into bursts the spidev buffer accepts
    pub fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        for chunk in data.chunks(MAX_BURST) {
            let written = self.spi.write(chunk)?;
            if written != chunk.len() {
                return Err(TransportError::Write(format!(
                    "short SPI write: {} of {} bytes",
                    written,
                    chunk.len()
                )));
            }
        }
        Ok(())
    }
}
