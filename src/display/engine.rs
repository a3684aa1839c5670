//! Display lifecycle and frame transmission.
//!
//! [`DisplayEngine`] owns one transport from `initialize` until `dispose`
//! (or drop) and walks the panel through
//! `Uninitialized -> Initialized <-> Asleep -> Disposed`.

use super::bus::CommandBus;
use super::profile::{ConfigurationError, DeviceProfile, Step};
use super::transport::{HardwareTransport, PinLevel, TransportError};
use super::writer::StreamWriter;
use crate::image_proc::{ColorMatcher, DitherMode, FloydSteinberg, HalvedErrorDither, RawImageView};
use std::io::Read;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default busy-wait deadline.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(50_000);

/// Pause between busy-pin samples.
const BUSY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Data byte that must follow the deep-sleep opcode.
const DEEP_SLEEP_CHECK: u8 = 0xA5;

/// Display driver errors
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Display not initialized")]
    NotInitialized,

    #[error("Cannot {operation} while display is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: DisplayState,
    },

    #[error("Display has been disposed")]
    Disposed,
}

/// Lifecycle state of a [`DisplayEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Uninitialized,
    Initialized,
    Asleep,
    Disposed,
}

pub struct DisplayEngine<T: HardwareTransport> {
    profile: DeviceProfile,
    bus: Option<CommandBus<T>>,
    matcher: Option<ColorMatcher>,
    state: DisplayState,
    busy_timeout: Duration,
}

impl<T: HardwareTransport> DisplayEngine<T> {
    /// Engine for `profile`; no hardware is touched until [`initialize`](Self::initialize).
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            bus: None,
            matcher: None,
            state: DisplayState::Uninitialized,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// Deadline used by [`wait_until_ready`](Self::wait_until_ready) and script waits.
    pub fn set_busy_timeout(&mut self, timeout: Duration) {
        self.busy_timeout = timeout;
    }

    pub fn transport(&self) -> Option<&T> {
        self.bus.as_ref().map(CommandBus::transport)
    }

    /// Take ownership of `transport`, reset the panel and run its init script.
    ///
    /// On failure the transport is released again and the engine stays
    /// uninitialized.
    pub fn initialize(&mut self, transport: T) -> Result<(), DisplayError> {
        match self.state {
            DisplayState::Uninitialized => {}
            DisplayState::Disposed => return Err(DisplayError::Disposed),
            state => {
                return Err(DisplayError::InvalidState {
                    operation: "initialize",
                    state,
                });
            }
        }

        tracing::info!(
            "Initializing {} display ({}x{})",
            self.profile.name(),
            self.profile.width(),
            self.profile.height()
        );

        self.bus = Some(CommandBus::new(transport));
        if let Err(e) = self.device_initialize() {
            if let Some(mut bus) = self.bus.take() {
                let _ = bus.release();
            }
            return Err(e);
        }

        let matcher = ColorMatcher::new(self.profile.palette());
        tracing::debug!("Palette monochrome: {}", matcher.is_monochrome());
        self.matcher = Some(matcher);
        self.state = DisplayState::Initialized;

        tracing::info!("Display initialized successfully");
        Ok(())
    }

    /// Hardware reset pulse.
    pub fn reset(&mut self) -> Result<(), DisplayError> {
        Ok(self.bus()?.reset()?)
    }

    pub fn send_command(&mut self, opcode: u8) -> Result<(), DisplayError> {
        Ok(self.bus()?.send_command(opcode)?)
    }

    pub fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        Ok(self.bus()?.send_data(data)?)
    }

    pub fn send_data_byte(&mut self, data: u8) -> Result<(), DisplayError> {
        Ok(self.bus()?.send_data_byte(data)?)
    }

    pub fn send_data_stream(&mut self, reader: &mut dyn Read) -> Result<(), DisplayError> {
        Ok(self.bus()?.send_data_stream(reader)?)
    }

    /// Poll until the panel reports ready, using the configured timeout.
    ///
    /// `Ok(false)` means the deadline passed first.
    pub fn wait_until_ready(&mut self) -> Result<bool, DisplayError> {
        let timeout = self.busy_timeout;
        self.wait_until_ready_timeout(timeout)
    }

    pub fn wait_until_ready_timeout(&mut self, timeout: Duration) -> Result<bool, DisplayError> {
        let get_status = self.profile.opcodes().get_status;
        let bus = self.bus()?;
        Ok(wait_ready(bus, get_status, timeout)?)
    }

    /// Power-on opcode, then wait for ready.
    pub fn power_on(&mut self) -> Result<(), DisplayError> {
        let opcode = self.profile.opcodes().power_on;
        self.send_and_wait(opcode, "power on")
    }

    /// Power-off opcode, then wait for ready.
    pub fn power_off(&mut self) -> Result<(), DisplayError> {
        let opcode = self.profile.opcodes().power_off;
        self.send_and_wait(opcode, "power off")
    }

    /// Send one frame built from `image`, padded or cropped to the panel size.
    ///
    /// With `dither` the profile's ditherer runs over the image; otherwise each
    /// pixel is mapped to its nearest palette entry.
    pub fn display_image(&mut self, image: &RawImageView<'_>, dither: bool) -> Result<(), DisplayError> {
        self.require_initialized("display image")?;

        let profile = &self.profile;
        let matcher = self.matcher.as_ref().ok_or(DisplayError::NotInitialized)?;
        let bus = self.bus.as_mut().ok_or(DisplayError::NotInitialized)?;
        let opcodes = *profile.opcodes();
        let (width, height) = (profile.width(), profile.height());

        tracing::info!(
            "Sending {}x{} image to display (dither: {})",
            image.width(),
            image.height(),
            dither
        );

        bus.send_command(opcodes.start_transmission)?;
        let mut writer = StreamWriter::new(profile, bus)?;

        let rows = if dither {
            match profile.dither_mode() {
                DitherMode::FloydSteinberg => {
                    FloydSteinberg::new(matcher, width, height).run(image, &mut writer)?
                }
                DitherMode::HalvedError => {
                    HalvedErrorDither::new(matcher, width, height).run(image, &mut writer)?
                }
            }
        } else {
            let rows = image.height().min(height);
            let columns = image.width().min(width);
            for y in 0..rows {
                for x in 0..columns {
                    writer.write(matcher.color_index(image.pixel(x, y)))?;
                }
                for _ in columns..width {
                    writer.write_blank_pixel()?;
                }
            }
            rows
        };

        for _ in rows..height {
            writer.write_blank_line()?;
        }

        let sent = writer.finish()?;
        tracing::debug!("Frame data sent ({} bytes)", sent);

        if let Some(stop) = opcodes.stop_transmission {
            bus.send_command(stop)?;
        }

        self.turn_on_display()?;
        tracing::info!("Display refresh complete");
        Ok(())
    }

    /// Fill the frame with white and refresh.
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        let white = self.profile.white_index();
        self.fill(white, "clear")
    }

    /// Fill the frame with black and refresh.
    pub fn clear_black(&mut self) -> Result<(), DisplayError> {
        let black = self.profile.black_index();
        self.fill(black, "clear to black")
    }

    /// Power off and enter deep sleep.
    pub fn sleep(&mut self) -> Result<(), DisplayError> {
        self.require_initialized("sleep")?;

        tracing::info!("Putting display to sleep");
        self.power_off()?;
        let deep_sleep = self.profile.opcodes().deep_sleep;
        let bus = self.bus()?;
        bus.send_command(deep_sleep)?;
        bus.send_data_byte(DEEP_SLEEP_CHECK)?;

        self.state = DisplayState::Asleep;
        Ok(())
    }

    /// Leave deep sleep by re-running reset and the init script.
    pub fn wake_up(&mut self) -> Result<(), DisplayError> {
        match self.state {
            DisplayState::Asleep => {}
            DisplayState::Uninitialized => return Err(DisplayError::NotInitialized),
            DisplayState::Disposed => return Err(DisplayError::Disposed),
            state => {
                return Err(DisplayError::InvalidState {
                    operation: "wake up",
                    state,
                });
            }
        }

        tracing::info!("Waking display");
        self.device_initialize()?;
        self.state = DisplayState::Initialized;
        Ok(())
    }

    /// Put the panel to sleep if it is awake, idle the pins and release the
    /// transport. Later calls do nothing.
    ///
    /// Teardown failures are logged; the engine always ends up disposed.
    pub fn dispose(&mut self) {
        if self.state == DisplayState::Disposed {
            return;
        }

        if self.state == DisplayState::Initialized {
            if let Err(e) = self.sleep() {
                tracing::warn!("Failed to put display to sleep during dispose: {}", e);
            }
        }

        if let Some(mut bus) = self.bus.take() {
            if let Err(e) = bus.release() {
                tracing::warn!("Failed to release transport: {}", e);
            }
        }

        self.matcher = None;
        self.state = DisplayState::Disposed;
        tracing::info!("Display disposed");
    }

    fn fill(&mut self, index: usize, operation: &'static str) -> Result<(), DisplayError> {
        self.require_initialized(operation)?;

        let profile = &self.profile;
        let bus = self.bus.as_mut().ok_or(DisplayError::NotInitialized)?;
        let opcodes = *profile.opcodes();

        tracing::info!("Filling display with palette entry {}", index);

        bus.send_command(opcodes.start_transmission)?;
        let mut writer = StreamWriter::new(profile, bus)?;
        writer.write_solid_lines(index, profile.height())?;
        writer.finish()?;

        if let Some(stop) = opcodes.stop_transmission {
            bus.send_command(stop)?;
        }

        self.turn_on_display()
    }

    /// Reset followed by the model's init script.
    fn device_initialize(&mut self) -> Result<(), DisplayError> {
        let timeout = self.busy_timeout;
        let profile = &self.profile;
        let bus = self.bus.as_mut().ok_or(DisplayError::NotInitialized)?;
        bus.reset()?;
        run_script(bus, profile, profile.init_script(), timeout)
    }

    /// Post-transmission refresh sequence.
    fn turn_on_display(&mut self) -> Result<(), DisplayError> {
        let timeout = self.busy_timeout;
        let profile = &self.profile;
        let bus = self.bus.as_mut().ok_or(DisplayError::NotInitialized)?;
        run_script(bus, profile, profile.refresh_script(), timeout)
    }

    fn send_and_wait(&mut self, opcode: u8, what: &str) -> Result<(), DisplayError> {
        self.send_command(opcode)?;
        if !self.wait_until_ready()? {
            tracing::warn!("Display still busy after {}", what);
        }
        Ok(())
    }

    fn bus(&mut self) -> Result<&mut CommandBus<T>, DisplayError> {
        match self.state {
            DisplayState::Disposed => Err(DisplayError::Disposed),
            _ => self.bus.as_mut().ok_or(DisplayError::NotInitialized),
        }
    }

    fn require_initialized(&self, operation: &'static str) -> Result<(), DisplayError> {
        match self.state {
            DisplayState::Initialized => Ok(()),
            DisplayState::Uninitialized => Err(DisplayError::NotInitialized),
            DisplayState::Disposed => Err(DisplayError::Disposed),
            state => Err(DisplayError::InvalidState { operation, state }),
        }
    }
}

impl<T: HardwareTransport> Drop for DisplayEngine<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Send get-status and sample busy until ready or `timeout` elapses.
fn wait_ready<T: HardwareTransport>(
    bus: &mut CommandBus<T>,
    get_status: u8,
    timeout: Duration,
) -> Result<bool, TransportError> {
    let start = Instant::now();
    loop {
        bus.send_command(get_status)?;
        if bus.busy_level()? == PinLevel::High {
            return Ok(true);
        }
        if start.elapsed() >= timeout {
            tracing::warn!("Busy wait timeout after {:?}", timeout);
            return Ok(false);
        }
        thread::sleep(BUSY_POLL_INTERVAL);
    }
}

fn run_script<T: HardwareTransport>(
    bus: &mut CommandBus<T>,
    profile: &DeviceProfile,
    steps: &[Step],
    timeout: Duration,
) -> Result<(), DisplayError> {
    for step in steps {
        match step {
            Step::Send { opcode, data } => {
                tracing::debug!("Command 0x{:02X} with {} data bytes", opcode, data.len());
                bus.send_command_data(*opcode, data)?;
            }
            Step::Delay(duration) => bus.delay(*duration),
            Step::WaitReady => {
                if !wait_ready(bus, profile.opcodes().get_status, timeout)? {
                    tracing::warn!("Display not ready, continuing {} sequence", profile.name());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::models::Model;
    use crate::display::recording::RecordingTransport;
    use crate::display::transport::ControlPin;

    fn engine(model: Model) -> (DisplayEngine<RecordingTransport>, RecordingTransport) {
        let rec = RecordingTransport::new();
        let mut engine = DisplayEngine::new(model.profile().unwrap());
        engine.initialize(rec.clone()).unwrap();
        rec.clear();
        (engine, rec)
    }

    #[test]
    fn initialize_resets_then_runs_the_script() {
        let rec = RecordingTransport::new();
        let mut engine = DisplayEngine::new(Model::Epd7in5.profile().unwrap());
        engine.initialize(rec.clone()).unwrap();

        assert_eq!(engine.state(), DisplayState::Initialized);
        assert_eq!(
            rec.delays()[..3],
            [
                Duration::from_millis(200),
                Duration::from_millis(2),
                Duration::from_millis(200)
            ]
        );
        assert_eq!(rec.wire_bytes()[..3], [0x01, 0x37, 0x00]);
    }

    #[test]
    fn operations_before_initialize_are_rejected() {
        let mut engine: DisplayEngine<RecordingTransport> =
            DisplayEngine::new(Model::Epd5in65f.profile().unwrap());
        assert!(matches!(engine.clear(), Err(DisplayError::NotInitialized)));
        assert!(matches!(engine.send_command(0x04), Err(DisplayError::NotInitialized)));
        assert!(matches!(engine.wake_up(), Err(DisplayError::NotInitialized)));
    }

    #[test]
    fn initialize_twice_is_invalid() {
        let (mut engine, _) = engine(Model::Epd5in65f);
        assert!(matches!(
            engine.initialize(RecordingTransport::new()),
            Err(DisplayError::InvalidState {
                state: DisplayState::Initialized,
                ..
            })
        ));
    }

    #[test]
    fn sleep_and_wake_round_trip() {
        let (mut engine, rec) = engine(Model::Epd5in65f);
        engine.sleep().unwrap();
        assert_eq!(engine.state(), DisplayState::Asleep);
        assert!(matches!(
            engine.clear(),
            Err(DisplayError::InvalidState {
                state: DisplayState::Asleep,
                ..
            })
        ));

        rec.clear();
        engine.wake_up().unwrap();
        assert_eq!(engine.state(), DisplayState::Initialized);
        assert_eq!(rec.pin_level(ControlPin::Reset), Some(PinLevel::High));
        assert!(!rec.wire_bytes().is_empty());
    }

    #[test]
    fn dispose_from_initialized_sleeps_first() {
        let (mut engine, rec) = engine(Model::Epd5in65f);
        engine.dispose();
        let bytes = rec.wire_bytes();
        assert_eq!(bytes, vec![0x02, 0x71, 0x07, 0xA5]);
        assert!(rec.is_closed());
        assert_eq!(engine.state(), DisplayState::Disposed);
    }

    #[test]
    fn dispose_while_asleep_skips_sleep() {
        let (mut engine, rec) = engine(Model::Epd5in65f);
        engine.sleep().unwrap();
        rec.clear();
        engine.dispose();
        assert!(rec.wire_bytes().is_empty());
        assert!(rec.is_closed());
    }

    #[test]
    fn failed_initialize_releases_the_transport() {
        let rec = RecordingTransport::new();
        rec.set_fail_writes(true);
        let mut engine = DisplayEngine::new(Model::Epd7in5.profile().unwrap());
        assert!(matches!(
            engine.initialize(rec.clone()),
            Err(DisplayError::Transport(_))
        ));
        assert_eq!(engine.state(), DisplayState::Uninitialized);
        assert!(engine.transport().is_none());
        assert!(rec.is_closed());
    }

    #[test]
    fn drop_disposes() {
        let (engine, rec) = engine(Model::Epd7in3e);
        drop(engine);
        assert!(rec.is_closed());
        assert_eq!(rec.pin_level(ControlPin::ChipSelect), Some(PinLevel::Low));
    }
}
