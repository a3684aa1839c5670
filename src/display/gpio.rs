//! GPIO pins for the e-paper HAT.
//!
//! Default wiring (BCM numbering):
//! - RST (Reset): GPIO 17
//! - DC (Data/Command): GPIO 25
//! - BUSY: GPIO 24
//! - CS: hardware CE0 unless a manual pin is configured
//! - PWR (Power): GPIO 18 on HATs with a power switch

use super::transport::{ControlPin, PinLevel, TransportError};
use crate::config::TransportConfig;
use rppal::gpio::{Gpio, InputPin, Level, OutputPin};

/// GPIO pins owned by one panel
pub struct GpioPins {
    rst: OutputPin,
    dc: OutputPin,
    cs: Option<OutputPin>,
    pwr: Option<OutputPin>,
    busy: InputPin,
}

impl GpioPins {
    /// Claim the configured pins and drive them to a known state
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let gpio = Gpio::new()?;

        let mut rst = gpio.get(config.reset_pin)?.into_output();
        let mut dc = gpio.get(config.dc_pin)?.into_output();
        let busy = gpio.get(config.busy_pin)?.into_input_pulldown();

        let cs = match config.cs_pin {
            Some(pin) => {
                let mut cs = gpio.get(pin)?.into_output();
                cs.set_high();
                Some(cs)
            }
            None => None,
        };

        let pwr = match config.power_pin {
            Some(pin) => {
                let mut pwr = gpio.get(pin)?.into_output();
                pwr.set_high();
                Some(pwr)
            }
            None => None,
        };

        rst.set_high();
        dc.set_low();

        tracing::debug!(
            "GPIO initialized: RST={}, DC={}, BUSY={}, CS={:?}, PWR={:?}",
            config.reset_pin,
            config.dc_pin,
            config.busy_pin,
            config.cs_pin,
            config.power_pin
        );

        Ok(Self { rst, dc, cs, pwr, busy })
    }

    pub fn set(&mut self, pin: ControlPin, level: PinLevel) {
        let out = match pin {
            ControlPin::Reset => &mut self.rst,
            ControlPin::DataCommand => &mut self.dc,
            // CE0 is asserted by the SPI controller around every transfer.
            ControlPin::ChipSelect => match self.cs.as_mut() {
                Some(cs) => cs,
                None => return,
            },
        };
        match level {
            PinLevel::Low => out.set_low(),
            PinLevel::High => out.set_high(),
        }
    }

    pub fn busy(&self) -> PinLevel {
        match self.busy.read() {
            Level::Low => PinLevel::Low,
            Level::High => PinLevel::High,
        }
    }

    /// Cut panel power, if the HAT has a switch
    pub fn power_off(&mut self) {
        if let Some(pwr) = self.pwr.as_mut() {
            tracing::debug!("Display power OFF");
            pwr.set_low();
        }
    }
}

impl Drop for GpioPins {
    fn drop(&mut self) {
        self.power_off();
    }
}
