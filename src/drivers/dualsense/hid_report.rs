//! Fixed wire structures shared by the DualShock 4 and DualSense families.
//! Layouts derived from the Game Controller Collective Wiki and the Linux
//! hid-playstation driver.
//! Source: https://controllers.fandom.com/wiki/Sony_DualSense
use packed_struct::prelude::*;
use serde::{Deserialize, Serialize};

use super::driver::{
    DS4_OUTPUT_REPORT_BT, DS4_OUTPUT_REPORT_USB, OUTPUT_REPORT_BT, OUTPUT_REPORT_USB,
};

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Direction {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
    #[default]
    None = 8,
}

impl Direction {
    /// Decodes the low nibble of the first button byte. Values 8 through 15
    /// all mean released.
    pub fn from_nibble(value: u8) -> Self {
        Self::from_primitive(value & 0x0F).unwrap_or_default()
    }

    /// Returns the direction as up (1), right (2), down (4) and left (8) flags
    pub fn as_bitflag(&self) -> u8 {
        match *self {
            Self::North => 1,                   // 00000001
            Self::NorthEast => 1 | 1 << 1,      // 00000011
            Self::East => 1 << 1,               // 00000010
            Self::SouthEast => 1 << 2 | 1 << 1, // 00000110
            Self::South => 1 << 2,              // 00000100
            Self::SouthWest => 1 << 2 | 1 << 3, // 00001100
            Self::West => 1 << 3,               // 00001000
            Self::NorthWest => 1 | 1 << 3,      // 00001001
            Self::None => 0,                    // 00000000
        }
    }
}

/// One touchpad contact as it appears in the input report
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "4")]
pub struct TouchFingerData {
    // byte 0
    // High bit set when not touching, low 7 bits are the contact id
    #[packed_field(bytes = "0")]
    pub context: u8,
    // byte 1
    #[packed_field(bytes = "1")]
    pub x_lo: u8,
    // byte 2
    #[packed_field(bits = "16..=19")]
    pub y_lo: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "20..=23")]
    pub x_hi: Integer<u8, packed_bits::Bits<4>>,
    // byte 3
    #[packed_field(bytes = "3")]
    pub y_hi: u8,
}

impl Default for TouchFingerData {
    fn default() -> Self {
        Self {
            context: 0x80,
            x_lo: Default::default(),
            y_lo: Default::default(),
            x_hi: Default::default(),
            y_hi: Default::default(),
        }
    }
}

impl TouchFingerData {
    pub fn is_touching(&self) -> bool {
        self.context & 0x80 == 0
    }

    pub fn get_id(&self) -> u8 {
        self.context & 0x7F
    }

    pub fn get_x(&self) -> u16 {
        let x_hi = self.x_hi.to_primitive() as u16;
        (x_hi << 8) | self.x_lo as u16
    }

    pub fn get_y(&self) -> u16 {
        let y_lo = self.y_lo.to_primitive() as u16;
        ((self.y_hi as u16) << 4) | y_lo
    }

    pub fn set_x(&mut self, x_raw: u16) {
        self.x_lo = (x_raw & 0x00FF) as u8;
        self.x_hi = Integer::from_primitive(((x_raw & 0x0F00) >> 8) as u8);
    }

    pub fn set_y(&mut self, y_raw: u16) {
        self.y_lo = Integer::from_primitive((y_raw & 0x000F) as u8);
        self.y_hi = ((y_raw & 0x0FF0) >> 4) as u8;
    }
}

/// Three signed 16-bit motion sensor axes
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "6")]
pub struct SensorTriple {
    #[packed_field(bytes = "0..=1", endian = "lsb")]
    pub x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub z: Integer<i16, packed_bits::Bits<16>>,
}

impl SensorTriple {
    pub fn to_array(&self) -> [i16; 3] {
        [
            self.x.to_primitive(),
            self.y.to_primitive(),
            self.z.to_primitive(),
        ]
    }
}

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug, Default)]
pub enum MuteLight {
    #[default]
    Off = 0,
    On = 1,
    Breathing = 2,
}

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug, Default)]
pub enum LightFadeAnimation {
    #[default]
    Nothing = 0,
    FadeIn = 1,
    FadeOut = 2,
}

/// Brightness of the player indicator LEDs
#[derive(
    PrimitiveEnum_u8, Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LightBrightness {
    #[default]
    Bright = 0,
    Mid = 1,
    Dim = 2,
}

/// DualSense output payload shared by the USB and Bluetooth reports
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "47")]
pub struct SetStatePackedOutputData {
    // byte 0: valid flag 0
    #[packed_field(bits = "0..=3")]
    pub _audio_flags: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "4")]
    pub allow_left_trigger_ffb: bool,
    #[packed_field(bits = "5")]
    pub allow_right_trigger_ffb: bool,
    #[packed_field(bits = "6")]
    pub use_rumble_not_haptics: bool,
    #[packed_field(bits = "7")]
    pub enable_rumble_emulation: bool,

    // byte 1: valid flag 1
    #[packed_field(bits = "8..=10")]
    pub _control_flags: Integer<u8, packed_bits::Bits<3>>,
    #[packed_field(bits = "11")]
    pub allow_player_indicators: bool,
    #[packed_field(bits = "12")]
    pub reset_lights: bool,
    #[packed_field(bits = "13")]
    pub allow_led_color: bool,
    #[packed_field(bits = "14")]
    pub allow_power_save: bool,
    #[packed_field(bits = "15")]
    pub allow_mute_light: bool,

    // byte 2-3
    #[packed_field(bytes = "2")]
    pub rumble_emulation_right: u8,
    #[packed_field(bytes = "3")]
    pub rumble_emulation_left: u8,

    // byte 4-7 (audio)
    #[packed_field(bytes = "4..=7")]
    pub _audio: [u8; 4],

    // byte 8
    #[packed_field(bytes = "8", ty = "enum")]
    pub mute_light_mode: MuteLight,

    // byte 9: power save and mute bits
    #[packed_field(bytes = "9")]
    pub power_save_control: u8,

    // byte 10-31
    #[packed_field(bytes = "10..=20")]
    pub right_trigger_ffb: [u8; 11],
    #[packed_field(bytes = "21..=31")]
    pub left_trigger_ffb: [u8; 11],

    // byte 32-37
    #[packed_field(bytes = "32..=37")]
    pub _reserved: [u8; 6],

    // byte 38: valid flag 2
    #[packed_field(bits = "304..=308")]
    pub _valid_flag2: Integer<u8, packed_bits::Bits<5>>,
    #[packed_field(bits = "309")]
    pub enable_improved_rumble_emulation: bool,
    #[packed_field(bits = "310")]
    pub allow_color_light_fade_animation: bool,
    #[packed_field(bits = "311")]
    pub allow_light_brightness_change: bool,

    // byte 39-42
    #[packed_field(bytes = "39..=40")]
    pub _reserved2: [u8; 2],
    #[packed_field(bytes = "41", ty = "enum")]
    pub light_fade_animation: LightFadeAnimation,
    #[packed_field(bytes = "42", ty = "enum")]
    pub light_brightness: LightBrightness,

    // byte 43
    #[packed_field(bits = "344..=345")]
    pub _player_light_unkn: Integer<u8, packed_bits::Bits<2>>,
    #[packed_field(bits = "346")]
    pub player_light_fade: bool,
    #[packed_field(bits = "347..=351")]
    pub player_lights: Integer<u8, packed_bits::Bits<5>>,

    // byte 44-46
    #[packed_field(bytes = "44")]
    pub led_red: u8,
    #[packed_field(bytes = "45")]
    pub led_green: u8,
    #[packed_field(bytes = "46")]
    pub led_blue: u8,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "48")]
pub struct UsbPackedOutputReport {
    // byte 0
    #[packed_field(bytes = "0")]
    pub report_id: u8, // Report ID (always 0x02)

    // byte 1-47
    #[packed_field(bytes = "1..=47")]
    pub state: SetStatePackedOutputData,
}

impl Default for UsbPackedOutputReport {
    fn default() -> Self {
        Self {
            report_id: OUTPUT_REPORT_USB,
            state: Default::default(),
        }
    }
}

/// Bluetooth output report. The trailing 4 bytes hold the checksum, which is
/// filled after packing.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "78")]
pub struct BluetoothPackedOutputReport {
    // byte 0
    #[packed_field(bytes = "0")]
    pub report_id: u8, // Report ID (always 0x31)

    // byte 1
    #[packed_field(bits = "8..=11")]
    pub seq_number: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "12..=15")]
    pub _seq_unkn: Integer<u8, packed_bits::Bits<4>>,

    // byte 2
    #[packed_field(bytes = "2")]
    pub tag: u8, // Always 0x10

    // byte 3-49
    #[packed_field(bytes = "3..=49")]
    pub state: SetStatePackedOutputData,
}

impl Default for BluetoothPackedOutputReport {
    fn default() -> Self {
        Self {
            report_id: OUTPUT_REPORT_BT,
            seq_number: Default::default(),
            _seq_unkn: Default::default(),
            tag: 0x10,
            state: Default::default(),
        }
    }
}

/// DualShock 4 output payload shared by the USB and Bluetooth reports
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "10")]
pub struct Ds4SetStatePackedOutputData {
    // byte 0
    #[packed_field(bits = "0..=4")]
    pub _valid_flags: Integer<u8, packed_bits::Bits<5>>,
    #[packed_field(bits = "5")]
    pub allow_led_blink: bool,
    #[packed_field(bits = "6")]
    pub allow_led_color: bool,
    #[packed_field(bits = "7")]
    pub allow_rumble: bool,

    // byte 1-2
    #[packed_field(bytes = "1")]
    pub valid_flag1: u8,
    #[packed_field(bytes = "2")]
    pub _reserved: u8,

    // byte 3-4
    #[packed_field(bytes = "3")]
    pub rumble_right: u8,
    #[packed_field(bytes = "4")]
    pub rumble_left: u8,

    // byte 5-7
    #[packed_field(bytes = "5")]
    pub led_red: u8,
    #[packed_field(bytes = "6")]
    pub led_green: u8,
    #[packed_field(bytes = "7")]
    pub led_blue: u8,

    // byte 8-9
    #[packed_field(bytes = "8")]
    pub led_blink_on: u8,
    #[packed_field(bytes = "9")]
    pub led_blink_off: u8,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "32")]
pub struct Ds4UsbPackedOutputReport {
    #[packed_field(bytes = "0")]
    pub report_id: u8, // Report ID (always 0x05)
    #[packed_field(bytes = "1..=10")]
    pub state: Ds4SetStatePackedOutputData,
}

impl Default for Ds4UsbPackedOutputReport {
    fn default() -> Self {
        Self {
            report_id: DS4_OUTPUT_REPORT_USB,
            state: Default::default(),
        }
    }
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "78")]
pub struct Ds4BluetoothPackedOutputReport {
    #[packed_field(bytes = "0")]
    pub report_id: u8, // Report ID (always 0x11)
    #[packed_field(bytes = "1")]
    pub hw_control: u8,
    #[packed_field(bytes = "2")]
    pub audio_control: u8,
    #[packed_field(bytes = "3..=12")]
    pub state: Ds4SetStatePackedOutputData,
}

impl Default for Ds4BluetoothPackedOutputReport {
    fn default() -> Self {
        Self {
            report_id: DS4_OUTPUT_REPORT_BT,
            hw_control: 0xC4,
            audio_control: 0x00,
            state: Default::default(),
        }
    }
}

/// Feature report 0x20. Offsets include the report id byte.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "64")]
pub struct FirmwareInfoReport {
    #[packed_field(bytes = "0")]
    pub report_id: u8,
    #[packed_field(bytes = "1..=11")]
    pub build_date: [u8; 11],
    #[packed_field(bytes = "12..=19")]
    pub build_time: [u8; 8],
    #[packed_field(bytes = "20..=21", endian = "lsb")]
    pub firmware_type: Integer<u16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "22..=23", endian = "lsb")]
    pub software_series: Integer<u16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "24..=27", endian = "lsb")]
    pub hardware_info: Integer<u32, packed_bits::Bits<32>>,
    #[packed_field(bytes = "28..=31", endian = "lsb")]
    pub main_firmware_version: Integer<u32, packed_bits::Bits<32>>,
    #[packed_field(bytes = "32..=43")]
    pub device_info: [u8; 12],
    #[packed_field(bytes = "44..=45", endian = "lsb")]
    pub update_version: Integer<u16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "46")]
    pub update_image_info: u8,
    #[packed_field(bytes = "47")]
    pub _reserved: u8,
    #[packed_field(bytes = "48..=51", endian = "lsb")]
    pub sbl_firmware_version: Integer<u32, packed_bits::Bits<32>>,
    #[packed_field(bytes = "52..=55", endian = "lsb")]
    pub dsp_firmware_version: Integer<u32, packed_bits::Bits<32>>,
    #[packed_field(bytes = "56..=59", endian = "lsb")]
    pub spider_dsp_firmware_version: Integer<u32, packed_bits::Bits<32>>,
    #[packed_field(bytes = "60..=63")]
    pub _reserved2: [u8; 4],
}
