//! Supported panels and their controller scripts.
//!
//! Init sequences follow the vendor reference drivers for each panel.

use super::profile::{
    ConfigurationError, DeviceProfile, Opcodes, PanelFamily, ProfileSpec, Step,
};
use crate::image_proc::{ByteColor, DitherMode};
use serde::{Deserialize, Serialize};

/// Controller commands shared across the UC81xx-style panels
mod cmd {
    pub const PANEL_SETTING: u8 = 0x00;
    pub const POWER_SETTING: u8 = 0x01;
    pub const POWER_OFF: u8 = 0x02;
    pub const POWER_OFF_SEQUENCE: u8 = 0x03;
    pub const POWER_ON: u8 = 0x04;
    pub const BOOSTER_SOFT_START_1: u8 = 0x05;
    pub const BOOSTER_SOFT_START: u8 = 0x06;
    pub const DEEP_SLEEP: u8 = 0x07;
    pub const BOOSTER_SOFT_START_3: u8 = 0x08;
    pub const DATA_START_TRANSMISSION_1: u8 = 0x10;
    pub const DATA_STOP: u8 = 0x11;
    pub const DISPLAY_REFRESH: u8 = 0x12;
    pub const DATA_START_TRANSMISSION_2: u8 = 0x13;
    pub const DUAL_SPI: u8 = 0x15;
    pub const PLL_CONTROL: u8 = 0x30;
    pub const TEMPERATURE_SENSOR_SELECTION: u8 = 0x41;
    pub const VCOM_AND_DATA_INTERVAL_SETTING: u8 = 0x50;
    pub const TCON_SETTING: u8 = 0x60;
    pub const TCON_RESOLUTION: u8 = 0x61;
    pub const SPI_FLASH_CONTROL: u8 = 0x65;
    pub const GET_STATUS: u8 = 0x71;
    pub const VCM_DC_SETTING: u8 = 0x82;
    pub const CASCADE_SETTING: u8 = 0x84;
    pub const CMDH: u8 = 0xAA;
    pub const POWER_SAVING: u8 = 0xE3;
    pub const FLASH_MODE: u8 = 0xE5;
}

/// Panel models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// 7.5" 640x384 black/white
    #[value(name = "epd7in5")]
    Epd7in5,
    /// 7.5" 640x384 black/white/red, single plane
    #[value(name = "epd7in5bc")]
    Epd7in5bc,
    /// 7.5" V2 800x480 black/white
    #[value(name = "epd7in5v2")]
    Epd7in5V2,
    /// 7.5" V2 800x480 black/white/red, two planes
    #[value(name = "epd7in5bv2")]
    Epd7in5bV2,
    /// 5.65" 600x448 seven color
    #[default]
    #[value(name = "epd5in65f")]
    Epd5in65f,
    /// 7.3" 800x480 Spectra 6
    #[value(name = "epd7in3e")]
    Epd7in3e,
}

impl Model {
    pub fn all() -> &'static [Model] {
        &[
            Model::Epd7in5,
            Model::Epd7in5bc,
            Model::Epd7in5V2,
            Model::Epd7in5bV2,
            Model::Epd5in65f,
            Model::Epd7in3e,
        ]
    }

    pub fn profile(self) -> Result<DeviceProfile, ConfigurationError> {
        DeviceProfile::new(match self {
            Model::Epd7in5 => epd7in5(),
            Model::Epd7in5bc => epd7in5bc(),
            Model::Epd7in5V2 => epd7in5_v2(),
            Model::Epd7in5bV2 => epd7in5b_v2(),
            Model::Epd5in65f => epd5in65f(),
            Model::Epd7in3e => epd7in3e(),
        })
    }
}

/// Opcode table common to every supported controller.
fn opcodes(start_transmission: u8) -> Opcodes {
    Opcodes {
        get_status: cmd::GET_STATUS,
        start_transmission,
        start_transmission_2: None,
        stop_transmission: None,
        power_on: cmd::POWER_ON,
        power_off: cmd::POWER_OFF,
        deep_sleep: cmd::DEEP_SLEEP,
    }
}

fn resolution(width: u32, height: u32) -> Step {
    Step::send(
        cmd::TCON_RESOLUTION,
        &[
            (width >> 8) as u8,
            (width & 0xFF) as u8,
            (height >> 8) as u8,
            (height & 0xFF) as u8,
        ],
    )
}

/// Power on, then refresh with a settle delay.
fn powered_refresh() -> Vec<Step> {
    vec![
        Step::send(cmd::POWER_ON, &[]),
        Step::WaitReady,
        Step::send(cmd::DISPLAY_REFRESH, &[]),
        Step::delay_ms(100),
        Step::WaitReady,
    ]
}

/// Refresh only; the init script already powered the panel.
fn plain_refresh() -> Vec<Step> {
    vec![
        Step::send(cmd::DISPLAY_REFRESH, &[]),
        Step::delay_ms(100),
        Step::WaitReady,
    ]
}

fn epd7in5() -> ProfileSpec {
    let (width, height) = (640, 384);
    ProfileSpec {
        name: "epd7in5",
        family: PanelFamily::Monochrome,
        width,
        height,
        pixels_per_byte: 2,
        palette: vec![ByteColor::BLACK, ByteColor::WHITE],
        device_codes: vec![0x00, 0x03],
        opcodes: opcodes(cmd::DATA_START_TRANSMISSION_1),
        init_script: vec![
            Step::send(cmd::POWER_SETTING, &[0x37, 0x00]),
            Step::send(cmd::PANEL_SETTING, &[0xCF, 0x08]),
            Step::send(cmd::PLL_CONTROL, &[0x3A]),
            Step::send(cmd::VCM_DC_SETTING, &[0x28]),
            Step::send(cmd::BOOSTER_SOFT_START, &[0xC7, 0xCC, 0x15]),
            Step::send(cmd::VCOM_AND_DATA_INTERVAL_SETTING, &[0x77]),
            Step::send(cmd::TCON_SETTING, &[0x22]),
            Step::send(cmd::SPI_FLASH_CONTROL, &[0x00]),
            resolution(width, height),
            Step::send(cmd::FLASH_MODE, &[0x03]),
        ],
        refresh_script: powered_refresh(),
        dither_mode: DitherMode::FloydSteinberg,
    }
}

fn epd7in5bc() -> ProfileSpec {
    let (width, height) = (640, 384);
    ProfileSpec {
        name: "epd7in5bc",
        family: PanelFamily::MultiColor,
        width,
        height,
        pixels_per_byte: 2,
        palette: vec![ByteColor::BLACK, ByteColor::WHITE, ByteColor::RED],
        device_codes: vec![0x00, 0x03, 0x04],
        opcodes: opcodes(cmd::DATA_START_TRANSMISSION_1),
        init_script: vec![
            Step::send(cmd::POWER_SETTING, &[0x37, 0x00]),
            Step::send(cmd::PANEL_SETTING, &[0xCF, 0x08]),
            Step::send(cmd::BOOSTER_SOFT_START, &[0xC7, 0xCC, 0x28]),
            Step::send(cmd::PLL_CONTROL, &[0x3C]),
            Step::send(cmd::TEMPERATURE_SENSOR_SELECTION, &[0x00]),
            Step::send(cmd::VCOM_AND_DATA_INTERVAL_SETTING, &[0x77]),
            Step::send(cmd::TCON_SETTING, &[0x22]),
            resolution(width, height),
            Step::send(cmd::VCM_DC_SETTING, &[0x1E]),
            Step::send(cmd::FLASH_MODE, &[0x03]),
        ],
        refresh_script: powered_refresh(),
        dither_mode: DitherMode::FloydSteinberg,
    }
}

/// V2 controllers: init ends powered on, KW or KWR panel mode.
fn v2_init(panel_mode: u8, vcom_interval: [u8; 2], width: u32, height: u32) -> Vec<Step> {
    vec![
        Step::send(cmd::BOOSTER_SOFT_START, &[0x17, 0x17, 0x28, 0x17]),
        Step::send(cmd::POWER_SETTING, &[0x07, 0x07, 0x28, 0x17]),
        Step::send(cmd::POWER_ON, &[]),
        Step::delay_ms(100),
        Step::WaitReady,
        Step::send(cmd::PANEL_SETTING, &[panel_mode]),
        resolution(width, height),
        Step::send(cmd::DUAL_SPI, &[0x00]),
        Step::send(cmd::VCOM_AND_DATA_INTERVAL_SETTING, &vcom_interval),
        Step::send(cmd::TCON_SETTING, &[0x22]),
    ]
}

fn epd7in5_v2() -> ProfileSpec {
    let (width, height) = (800, 480);
    ProfileSpec {
        name: "epd7in5v2",
        family: PanelFamily::Monochrome,
        width,
        height,
        pixels_per_byte: 8,
        palette: vec![ByteColor::BLACK, ByteColor::WHITE],
        // New-data plane: set bits are black.
        device_codes: vec![0x01, 0x00],
        opcodes: opcodes(cmd::DATA_START_TRANSMISSION_2),
        init_script: v2_init(0x1F, [0x10, 0x07], width, height),
        refresh_script: plain_refresh(),
        dither_mode: DitherMode::HalvedError,
    }
}

fn epd7in5b_v2() -> ProfileSpec {
    let (width, height) = (800, 480);
    ProfileSpec {
        name: "epd7in5bv2",
        family: PanelFamily::TriColorPlanes,
        width,
        height,
        pixels_per_byte: 8,
        palette: vec![ByteColor::BLACK, ByteColor::WHITE, ByteColor::RED],
        // Black/white plane: set bits are white. Red maps to black here.
        device_codes: vec![0x00, 0x01, 0x00],
        opcodes: Opcodes {
            start_transmission_2: Some(cmd::DATA_START_TRANSMISSION_2),
            ..opcodes(cmd::DATA_START_TRANSMISSION_1)
        },
        init_script: v2_init(0x0F, [0x11, 0x07], width, height),
        refresh_script: plain_refresh(),
        dither_mode: DitherMode::FloydSteinberg,
    }
}

fn epd5in65f() -> ProfileSpec {
    let (width, height) = (600, 448);
    ProfileSpec {
        name: "epd5in65f",
        family: PanelFamily::MultiColor,
        width,
        height,
        pixels_per_byte: 2,
        palette: vec![
            ByteColor::BLACK,
            ByteColor::WHITE,
            ByteColor::GREEN,
            ByteColor::BLUE,
            ByteColor::RED,
            ByteColor::YELLOW,
            ByteColor::ORANGE,
        ],
        device_codes: vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
        opcodes: Opcodes {
            stop_transmission: Some(cmd::DATA_STOP),
            ..opcodes(cmd::DATA_START_TRANSMISSION_1)
        },
        init_script: vec![
            Step::WaitReady,
            Step::send(cmd::PANEL_SETTING, &[0xEF, 0x08]),
            Step::send(cmd::POWER_SETTING, &[0x37, 0x00, 0x23, 0x23]),
            Step::send(cmd::POWER_OFF_SEQUENCE, &[0x00]),
            Step::send(cmd::BOOSTER_SOFT_START, &[0xC7, 0xC7, 0x1D]),
            Step::send(cmd::PLL_CONTROL, &[0x3C]),
            Step::send(cmd::TEMPERATURE_SENSOR_SELECTION, &[0x00]),
            Step::send(cmd::VCOM_AND_DATA_INTERVAL_SETTING, &[0x37]),
            Step::send(cmd::TCON_SETTING, &[0x22]),
            resolution(width, height),
            Step::send(cmd::POWER_SAVING, &[0xAA]),
            Step::delay_ms(100),
            Step::send(cmd::VCOM_AND_DATA_INTERVAL_SETTING, &[0x37]),
        ],
        refresh_script: vec![
            Step::send(cmd::POWER_ON, &[]),
            Step::WaitReady,
            Step::send(cmd::DISPLAY_REFRESH, &[]),
            Step::WaitReady,
        ],
        dither_mode: DitherMode::FloydSteinberg,
    }
}

fn epd7in3e() -> ProfileSpec {
    let (width, height) = (800, 480);
    ProfileSpec {
        name: "epd7in3e",
        family: PanelFamily::MultiColor,
        width,
        height,
        pixels_per_byte: 2,
        palette: vec![
            ByteColor::BLACK,
            ByteColor::WHITE,
            ByteColor::YELLOW,
            ByteColor::RED,
            ByteColor::ORANGE,
            ByteColor::BLUE,
            ByteColor::GREEN,
        ],
        device_codes: vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
        opcodes: opcodes(cmd::DATA_START_TRANSMISSION_1),
        init_script: vec![
            Step::WaitReady,
            Step::delay_ms(30),
            Step::send(cmd::CMDH, &[0x49, 0x55, 0x20, 0x08, 0x09, 0x18]),
            Step::send(cmd::POWER_SETTING, &[0x3F]),
            Step::send(cmd::PANEL_SETTING, &[0x5F, 0x69]),
            Step::send(cmd::POWER_OFF_SEQUENCE, &[0x00, 0x54, 0x00, 0x44]),
            Step::send(cmd::BOOSTER_SOFT_START_1, &[0x40, 0x1F, 0x1F, 0x2C]),
            Step::send(cmd::BOOSTER_SOFT_START, &[0x6F, 0x1F, 0x17, 0x49]),
            Step::send(cmd::BOOSTER_SOFT_START_3, &[0x6F, 0x1F, 0x1F, 0x22]),
            Step::send(cmd::PLL_CONTROL, &[0x03]),
            Step::send(cmd::VCOM_AND_DATA_INTERVAL_SETTING, &[0x3F]),
            Step::send(cmd::TCON_SETTING, &[0x02, 0x00]),
            resolution(width, height),
            Step::send(cmd::CASCADE_SETTING, &[0x01]),
            Step::send(cmd::POWER_SAVING, &[0x2F]),
            Step::send(cmd::POWER_ON, &[]),
            Step::WaitReady,
        ],
        refresh_script: vec![
            Step::send(cmd::POWER_ON, &[]),
            Step::WaitReady,
            Step::send(cmd::DISPLAY_REFRESH, &[0x00]),
            Step::WaitReady,
            Step::send(cmd::POWER_OFF, &[0x00]),
            Step::WaitReady,
        ],
        dither_mode: DitherMode::FloydSteinberg,
    }
}
