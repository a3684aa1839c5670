use epaper_stream::display::{
    ControlPin, DisplayEngine, DisplayError, DisplayState, Event, Frame, Model, PinLevel,
    RecordingTransport,
};
use std::time::{Duration, Instant};

fn engine_with(rec: &RecordingTransport, model: Model) -> DisplayEngine<RecordingTransport> {
    let mut engine = DisplayEngine::new(model.profile().unwrap());
    engine.initialize(rec.clone()).unwrap();
    engine
}

fn status_polls(rec: &RecordingTransport) -> usize {
    rec.frames()
        .iter()
        .filter(|f| **f == Frame::Command(0x71))
        .count()
}

#[test]
fn dispose_is_idempotent() {
    let rec = RecordingTransport::new();
    let mut engine = engine_with(&rec, Model::Epd5in65f);

    engine.dispose();
    let after_first = rec.events();
    engine.dispose();
    engine.dispose();

    assert_eq!(rec.events(), after_first);
    assert_eq!(engine.state(), DisplayState::Disposed);
}

#[test]
fn dispose_idles_every_control_pin() {
    let rec = RecordingTransport::new();
    let mut engine = engine_with(&rec, Model::Epd7in5bc);
    engine.dispose();

    for pin in [ControlPin::ChipSelect, ControlPin::DataCommand, ControlPin::Reset] {
        assert_eq!(rec.pin_level(pin), Some(PinLevel::Low), "{:?}", pin);
    }
    assert!(rec.is_closed());
    assert_eq!(rec.events().last(), Some(&Event::Closed));
}

#[test]
fn dispose_before_initialize_touches_nothing() {
    let mut engine: DisplayEngine<RecordingTransport> =
        DisplayEngine::new(Model::Epd7in5.profile().unwrap());
    engine.dispose();
    assert_eq!(engine.state(), DisplayState::Disposed);
    assert!(engine.transport().is_none());
}

#[test]
fn dispose_survives_a_failing_transport() {
    let rec = RecordingTransport::new();
    let mut engine = engine_with(&rec, Model::Epd5in65f);
    rec.set_fail_writes(true);

    engine.dispose();

    assert_eq!(engine.state(), DisplayState::Disposed);
    assert!(rec.is_closed());
    assert_eq!(rec.pin_level(ControlPin::Reset), Some(PinLevel::Low));
}

#[test]
fn operations_after_dispose_are_rejected() {
    let rec = RecordingTransport::new();
    let mut engine = engine_with(&rec, Model::Epd5in65f);
    engine.dispose();
    rec.clear();

    assert!(matches!(engine.clear(), Err(DisplayError::Disposed)));
    assert!(matches!(engine.sleep(), Err(DisplayError::Disposed)));
    assert!(matches!(engine.wake_up(), Err(DisplayError::Disposed)));
    assert!(matches!(engine.send_command(0x04), Err(DisplayError::Disposed)));
    assert!(matches!(engine.wait_until_ready(), Err(DisplayError::Disposed)));
    assert!(matches!(
        engine.initialize(RecordingTransport::new()),
        Err(DisplayError::Disposed)
    ));
    assert!(rec.events().is_empty());
}

#[test]
fn wake_up_requires_sleep() {
    let rec = RecordingTransport::new();
    let mut engine = engine_with(&rec, Model::Epd5in65f);
    assert!(matches!(
        engine.wake_up(),
        Err(DisplayError::InvalidState {
            state: DisplayState::Initialized,
            ..
        })
    ));
}

#[test]
fn wait_returns_true_on_first_ready_sample() {
    let rec = RecordingTransport::new();
    let mut engine = engine_with(&rec, Model::Epd5in65f);
    rec.clear();

    assert!(engine.wait_until_ready().unwrap());
    assert_eq!(status_polls(&rec), 1);
}

#[test]
fn wait_keeps_polling_until_ready() {
    // No busy waits in this model's init script, so all three busy samples remain.
    let rec = RecordingTransport::ready_after(3);
    let mut engine = engine_with(&rec, Model::Epd7in5);
    rec.clear();

    assert!(engine.wait_until_ready_timeout(Duration::from_secs(5)).unwrap());
    assert_eq!(status_polls(&rec), 4);
}

#[test]
fn wait_times_out_when_never_ready() {
    let rec = RecordingTransport::never_ready();
    let mut engine = DisplayEngine::new(Model::Epd7in5.profile().unwrap());
    engine.set_busy_timeout(Duration::from_millis(20));
    // No busy waits in this model's init script.
    engine.initialize(rec.clone()).unwrap();

    let start = Instant::now();
    assert!(!engine.wait_until_ready_timeout(Duration::from_millis(50)).unwrap());
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(status_polls(&rec) >= 2);
}

#[test]
fn script_timeouts_do_not_abort_the_sequence() {
    let rec = RecordingTransport::never_ready();
    let mut engine = DisplayEngine::new(Model::Epd5in65f.profile().unwrap());
    engine.set_busy_timeout(Duration::from_millis(10));

    engine.initialize(rec.clone()).unwrap();

    assert_eq!(engine.state(), DisplayState::Initialized);
    assert!(rec.frames().contains(&Frame::Command(0xE3)));
}

#[test]
fn transport_errors_propagate() {
    let rec = RecordingTransport::new();
    let mut engine = engine_with(&rec, Model::Epd5in65f);
    rec.set_fail_writes(true);

    assert!(matches!(engine.clear(), Err(DisplayError::Transport(_))));
    assert!(matches!(engine.power_on(), Err(DisplayError::Transport(_))));
    // CS is raised after the failed write
    assert_eq!(rec.pin_level(ControlPin::ChipSelect), Some(PinLevel::High));
}

#[test]
fn raw_command_and_data_helpers_frame_each_unit() {
    let rec = RecordingTransport::new();
    let mut engine = engine_with(&rec, Model::Epd5in65f);
    rec.clear();

    engine.send_command(0x50).unwrap();
    engine.send_data_byte(0x37).unwrap();
    engine.send_data(&[1, 2, 3]).unwrap();
    engine.send_data_stream(&mut [9u8; 5].as_slice()).unwrap();

    assert_eq!(
        rec.frames(),
        vec![
            Frame::Command(0x50),
            Frame::Data(vec![0x37]),
            Frame::Data(vec![1, 2, 3]),
            Frame::Data(vec![9; 5]),
        ]
    );
}

#[test]
fn reset_is_available_while_awake() {
    let rec = RecordingTransport::new();
    let mut engine = engine_with(&rec, Model::Epd5in65f);
    rec.clear();
    engine.reset().unwrap();
    assert_eq!(
        rec.delays(),
        vec![
            Duration::from_millis(200),
            Duration::from_millis(2),
            Duration::from_millis(200)
        ]
    );
}
