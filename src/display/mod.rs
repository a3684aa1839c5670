//! Display module for e-paper panel control.
//!
//! The engine speaks to panels through [`HardwareTransport`]: the Raspberry
//! Pi implementation drives real GPIO and SPI, the recording one captures
//! the byte stream for dry runs and tests.

pub mod bus;
pub mod engine;
pub mod gpio;
pub mod models;
pub mod packer;
pub mod profile;
pub mod recording;
pub mod rpi;
pub mod spi;
pub mod transport;
pub mod writer;

// Re-export main types
pub use bus::CommandBus;
pub use engine::{DisplayEngine, DisplayError, DisplayState, DEFAULT_BUSY_TIMEOUT};
pub use models::Model;
pub use packer::PixelPacker;
pub use profile::{ConfigurationError, DeviceProfile, Opcodes, PanelFamily, ProfileSpec, Step, WriterKind};
pub use recording::{Event, Frame, RecordingTransport};
pub use rpi::RaspberryPiTransport;
pub use transport::{ControlPin, HardwareTransport, PinLevel, TransportError, MAX_BURST};
pub use writer::{StreamWriter, FLUSH_THRESHOLD};
