//! Raspberry Pi transport built on rppal.

use super::gpio::GpioPins;
use super::spi::SpiBus;
use super::transport::{ControlPin, HardwareTransport, PinLevel, TransportError};
use crate::config::TransportConfig;

/// GPIO + SPI on a Raspberry Pi header
pub struct RaspberryPiTransport {
    devices: Option<(GpioPins, SpiBus)>,
}

impl RaspberryPiTransport {
    /// Open the configured pins and SPI device
    pub fn open(config: &TransportConfig) -> Result<Self, TransportError> {
        let pins = GpioPins::new(config)?;
        let spi = SpiBus::new(config)?;
        Ok(Self {
            devices: Some((pins, spi)),
        })
    }

    fn devices(&mut self) -> Result<&mut (GpioPins, SpiBus), TransportError> {
        self.devices.as_mut().ok_or(TransportError::Closed)
    }
}

impl HardwareTransport for RaspberryPiTransport {
    fn set_pin(&mut self, pin: ControlPin, level: PinLevel) -> Result<(), TransportError> {
        let (pins, _) = self.devices()?;
        pins.set(pin, level);
        Ok(())
    }

    fn busy_level(&mut self) -> Result<PinLevel, TransportError> {
        let (pins, _) = self.devices()?;
        Ok(pins.busy())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let (_, spi) = self.devices()?;
        spi.write(bytes)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some((mut pins, spi)) = self.devices.take() {
            pins.power_off();
            drop(spi);
            drop(pins);
            tracing::debug!("GPIO and SPI released");
        }
        Ok(())
    }
}
