//! Command/data framing over a [`HardwareTransport`].
//!
//! Every command or data unit gets its own chip-select pulse: DC selects
//! command (low) or data (high), CS drops, the bytes go out, CS rises.

use super::transport::{ControlPin, HardwareTransport, PinLevel, TransportError};
use std::io::Read;
use std::time::Duration;

/// Reset timings: high, low pulse, high.
const RESET_SETTLE: Duration = Duration::from_millis(200);
const RESET_PULSE: Duration = Duration::from_millis(2);

pub struct CommandBus<T> {
    transport: T,
}

impl<T: HardwareTransport> CommandBus<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a command opcode
    pub fn send_command(&mut self, opcode: u8) -> Result<(), TransportError> {
        self.framed(PinLevel::Low, |t| t.write_byte(opcode))
    }

    /// Send a run of data bytes in one CS pulse
    pub fn send_data(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if data.is_empty() {
            return Ok(());
        }
        self.framed(PinLevel::High, |t| t.write(data))
    }

    pub fn send_data_byte(&mut self, data: u8) -> Result<(), TransportError> {
        self.framed(PinLevel::High, |t| t.write_byte(data))
    }

    /// Send data drained from `reader` in one CS pulse
    pub fn send_data_stream(&mut self, reader: &mut dyn Read) -> Result<(), TransportError> {
        self.framed(PinLevel::High, |t| t.write_stream(reader))
    }

    /// Send a command followed by its data bytes
    pub fn send_command_data(&mut self, opcode: u8, data: &[u8]) -> Result<(), TransportError> {
        self.send_command(opcode)?;
        self.send_data(data)
    }

    fn framed<F>(&mut self, dc: PinLevel, write: F) -> Result<(), TransportError>
    where
        F: FnOnce(&mut T) -> Result<(), TransportError>,
    {
        self.transport.set_pin(ControlPin::DataCommand, dc)?;
        self.transport.set_pin(ControlPin::ChipSelect, PinLevel::Low)?;
        let result = write(&mut self.transport);
        // Raise CS even when the write failed so the controller sees the frame end.
        let released = self.transport.set_pin(ControlPin::ChipSelect, PinLevel::High);
        result.and(released)
    }

    /// Hardware reset pulse
    pub fn reset(&mut self) -> Result<(), TransportError> {
        tracing::debug!("Performing hardware reset");

        self.transport.set_pin(ControlPin::Reset, PinLevel::High)?;
        self.transport.delay(RESET_SETTLE);

        self.transport.set_pin(ControlPin::Reset, PinLevel::Low)?;
        self.transport.delay(RESET_PULSE);

        self.transport.set_pin(ControlPin::Reset, PinLevel::High)?;
        self.transport.delay(RESET_SETTLE);

        Ok(())
    }

    pub fn delay(&mut self, duration: Duration) {
        self.transport.delay(duration);
    }

    pub fn busy_level(&mut self) -> Result<PinLevel, TransportError> {
        self.transport.busy_level()
    }

    /// Drive CS, DC and RST low and close the transport.
    ///
    /// Each step runs even if an earlier one failed; the first error is returned.
    pub fn release(&mut self) -> Result<(), TransportError> {
        let mut first_error = None;
        for pin in [ControlPin::ChipSelect, ControlPin::DataCommand, ControlPin::Reset] {
            if let Err(e) = self.transport.set_pin(pin, PinLevel::Low) {
                tracing::warn!("Failed to drive {:?} low during release: {}", pin, e);
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.transport.close() {
            tracing::warn!("Failed to close transport: {}", e);
            first_error.get_or_insert(e);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
