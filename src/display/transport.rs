//! Hardware transport seam between the display engine and the bus.
//!
//! The engine never touches GPIO or SPI directly. It drives three output
//! pins, samples the busy pin and clocks bytes through whatever implements
//! [`HardwareTransport`].

use std::io::Read;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Maximum burst handed to the bus in one write.
pub const MAX_BURST: usize = 4096;

/// Logic level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

/// Output pins the engine controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlPin {
    Reset,
    DataCommand,
    ChipSelect,
}

/// Transport-level errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("SPI error: {0}")]
    Spi(#[from] rppal::spi::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bus write failed: {0}")]
    Write(String),

    #[error("Transport already closed")]
    Closed,
}

/// GPIO pins plus SPI device driving one panel.
pub trait HardwareTransport {
    /// Drive an output pin.
    fn set_pin(&mut self, pin: ControlPin, level: PinLevel) -> Result<(), TransportError>;

    /// Sample the busy pin.
    fn busy_level(&mut self) -> Result<PinLevel, TransportError>;

    /// Clock bytes out on the bus.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        self.write(&[byte])
    }

    /// Drain `reader` onto the bus in bursts of at most [`MAX_BURST`] bytes.
    fn write_stream(&mut self, reader: &mut dyn Read) -> Result<(), TransportError> {
        let mut chunk = [0u8; MAX_BURST];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            self.write(&chunk[..n])?;
        }
    }

    /// Hold for a fixed hardware-mandated time.
    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }

    /// Release the underlying devices.
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
