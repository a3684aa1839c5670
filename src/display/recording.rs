//! In-memory transport that captures the wire stream.
//!
//! Used for dry runs (write the exact bytes a panel would receive to a file)
//! and by the test suite. Clones share one recording, so a caller can keep a
//! handle after moving the transport into an engine.

use super::transport::{ControlPin, HardwareTransport, PinLevel, TransportError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One observed transport interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Pin(ControlPin, PinLevel),
    Write(Vec<u8>),
    Delay(Duration),
    BusyRead(PinLevel),
    Closed,
}

/// A write classified by the DC level it was clocked with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Command(u8),
    Data(Vec<u8>),
}

#[derive(Debug)]
struct Recording {
    events: Vec<Event>,
    dc: PinLevel,
    // None: never ready
    busy_polls_left: Option<usize>,
    fail_writes: bool,
    closed: bool,
}

/// Transport that records everything and talks to no hardware.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    inner: Arc<Mutex<Recording>>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    /// Busy pin reports ready on every sample.
    pub fn new() -> Self {
        Self::with_busy(Some(0))
    }

    /// Busy pin reports busy for `polls` samples, then ready.
    pub fn ready_after(polls: usize) -> Self {
        Self::with_busy(Some(polls))
    }

    /// Busy pin never reports ready.
    pub fn never_ready() -> Self {
        Self::with_busy(None)
    }

    fn with_busy(busy_polls_left: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recording {
                events: Vec::new(),
                dc: PinLevel::Low,
                busy_polls_left,
                fail_writes: false,
                closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every following write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.lock().events.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Writes split into commands (DC low, one frame per byte) and data runs.
    pub fn frames(&self) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut dc = PinLevel::Low;
        for event in &self.lock().events {
            match event {
                Event::Pin(ControlPin::DataCommand, level) => dc = *level,
                Event::Write(bytes) if dc == PinLevel::Low => {
                    frames.extend(bytes.iter().map(|&b| Frame::Command(b)));
                }
                Event::Write(bytes) => frames.push(Frame::Data(bytes.clone())),
                _ => {}
            }
        }
        frames
    }

    /// Every byte clocked out, commands and data alike, in order.
    pub fn wire_bytes(&self) -> Vec<u8> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Write(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Last level driven on `pin`, if it was ever driven.
    pub fn pin_level(&self, pin: ControlPin) -> Option<PinLevel> {
        self.lock().events.iter().rev().find_map(|event| match event {
            Event::Pin(p, level) if *p == pin => Some(*level),
            _ => None,
        })
    }

    /// Fixed delays requested, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Delay(d) => Some(*d),
                _ => None,
            })
            .collect()
    }
}

impl HardwareTransport for RecordingTransport {
    fn set_pin(&mut self, pin: ControlPin, level: PinLevel) -> Result<(), TransportError> {
        let mut rec = self.lock();
        if pin == ControlPin::DataCommand {
            rec.dc = level;
        }
        rec.events.push(Event::Pin(pin, level));
        Ok(())
    }

    fn busy_level(&mut self) -> Result<PinLevel, TransportError> {
        let mut rec = self.lock();
        let level = match rec.busy_polls_left {
            Some(0) => PinLevel::High,
            Some(left) => {
                rec.busy_polls_left = Some(left - 1);
                PinLevel::Low
            }
            None => PinLevel::Low,
        };
        rec.events.push(Event::BusyRead(level));
        Ok(level)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut rec = self.lock();
        if rec.closed {
            return Err(TransportError::Closed);
        }
        if rec.fail_writes {
            return Err(TransportError::Write("injected write failure".to_string()));
        }
        rec.events.push(Event::Write(bytes.to_vec()));
        Ok(())
    }

    fn delay(&mut self, duration: Duration) {
        self.lock().events.push(Event::Delay(duration));
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut rec = self.lock();
        rec.closed = true;
        rec.events.push(Event::Closed);
        Ok(())
    }
}
