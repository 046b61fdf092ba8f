use std::error::Error;

use packed_struct::prelude::*;
use serde::{Deserialize, Serialize};

use crate::drivers::checksum::fill_output_report_checksum;

use super::driver::{
    DeviceFamily, LinkType, DS4_OUTPUT_REPORT_BT, DS4_OUTPUT_REPORT_USB, OUTPUT_REPORT_BT,
    OUTPUT_REPORT_USB,
};
use super::hid_report::{
    BluetoothPackedOutputReport, Ds4BluetoothPackedOutputReport, Ds4SetStatePackedOutputData,
    Ds4UsbPackedOutputReport, LightBrightness, MuteLight, SetStatePackedOutputData,
    UsbPackedOutputReport,
};

/// Size of one adaptive trigger effect block: a mode byte and 10 parameters
pub const TRIGGER_EFFECT_SIZE: usize = 11;

/// Player indicator patterns indexed by player number. Zero turns all LEDs
/// off and five lights all of them.
pub const PLAYER_LED_PATTERNS: [u8; 6] = [0x00, 0x04, 0x0A, 0x15, 0x1B, 0x1F];

/// Returns the player indicator pattern for the given player number
pub fn player_led_pattern(player: u8) -> u8 {
    PLAYER_LED_PATTERNS[(player as usize).min(PLAYER_LED_PATTERNS.len() - 1)]
}

/// Adaptive trigger effect. Each mode has its own parameter layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TriggerEffect {
    /// No resistance
    #[default]
    Off,
    /// Continuous resistance from the start position onward
    Resistance { start: u8, force: u8 },
    /// Resistance between two positions, like a soft click
    Soft { start: u8, end: u8, force: u8 },
    /// Vibration starting at the given position
    Automatic { start: u8, force: u8, frequency: u8 },
}

impl TriggerEffect {
    /// Returns the mode number (0 off, 1 resistance, 2 soft, 3 automatic)
    pub fn mode(&self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Resistance { .. } => 1,
            Self::Soft { .. } => 2,
            Self::Automatic { .. } => 3,
        }
    }

    /// Encodes the effect into its wire block
    pub fn to_bytes(&self) -> [u8; TRIGGER_EFFECT_SIZE] {
        let mut block = [0u8; TRIGGER_EFFECT_SIZE];
        match *self {
            Self::Off => (),
            Self::Resistance { start, force } => {
                block[0] = 0x01;
                block[1] = start;
                block[2] = force;
            }
            Self::Soft { start, end, force } => {
                block[0] = 0x02;
                block[1] = start;
                block[2] = end;
                block[3] = force;
            }
            Self::Automatic {
                start,
                force,
                frequency,
            } => {
                block[0] = 0x06;
                block[1] = frequency;
                block[2] = force;
                block[3] = start;
            }
        }
        block
    }
}

/// Desired output state of a controller. Built fresh for every send.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputState {
    pub mic_led: bool,
    pub lightbar: [u8; 3],
    /// Player number shown on the indicator LEDs (0-5)
    pub player_led: u8,
    pub player_led_brightness: LightBrightness,
    pub motor_left: u8,
    pub motor_right: u8,
    pub left_trigger: TriggerEffect,
    pub right_trigger: TriggerEffect,
}

/// Output report ready to hand to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputReport {
    pub report_id: u8,
    /// Report data without the report id
    pub data: Vec<u8>,
}

/// Encodes output reports for one device. Owns the Bluetooth sequence
/// counter, which advances on every encoded Bluetooth report.
#[derive(Debug, Clone)]
pub struct OutputReportEncoder {
    family: DeviceFamily,
    link: LinkType,
    sequence: u8,
}

impl OutputReportEncoder {
    pub fn new(family: DeviceFamily, link: LinkType) -> Self {
        Self {
            family,
            link,
            sequence: 0,
        }
    }

    /// Starts the Bluetooth sequence counter at the given value
    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.sequence = sequence & 0x0F;
        self
    }

    /// Returns the sequence number the next Bluetooth report will carry
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    pub fn link(&self) -> LinkType {
        self.link
    }

    pub fn set_link(&mut self, link: LinkType) {
        self.link = link;
    }

    /// Encodes the given state into an output report for the current link
    pub fn encode(
        &mut self,
        state: &OutputState,
    ) -> Result<OutputReport, Box<dyn Error + Send + Sync>> {
        match self.family {
            DeviceFamily::DualShock4 => self.encode_ds4(state),
            DeviceFamily::DualSense | DeviceFamily::DualSenseEdge => self.encode_dualsense(state),
        }
    }

    fn encode_dualsense(
        &mut self,
        state: &OutputState,
    ) -> Result<OutputReport, Box<dyn Error + Send + Sync>> {
        let payload = SetStatePackedOutputData {
            allow_left_trigger_ffb: true,
            allow_right_trigger_ffb: true,
            use_rumble_not_haptics: true,
            enable_rumble_emulation: true,
            allow_player_indicators: true,
            allow_led_color: true,
            allow_power_save: true,
            allow_mute_light: true,
            rumble_emulation_right: state.motor_right,
            rumble_emulation_left: state.motor_left,
            mute_light_mode: if state.mic_led {
                MuteLight::On
            } else {
                MuteLight::Off
            },
            right_trigger_ffb: state.right_trigger.to_bytes(),
            left_trigger_ffb: state.left_trigger.to_bytes(),
            allow_light_brightness_change: true,
            light_brightness: state.player_led_brightness,
            player_lights: Integer::from_primitive(player_led_pattern(state.player_led)),
            led_red: state.lightbar[0],
            led_green: state.lightbar[1],
            led_blue: state.lightbar[2],
            ..Default::default()
        };

        match self.link {
            LinkType::Usb => {
                let report = UsbPackedOutputReport {
                    state: payload,
                    ..Default::default()
                };
                let buf = report.pack()?;
                Ok(OutputReport {
                    report_id: OUTPUT_REPORT_USB,
                    data: buf[1..].to_vec(),
                })
            }
            LinkType::Bluetooth => {
                let report = BluetoothPackedOutputReport {
                    seq_number: Integer::from_primitive(self.next_sequence()),
                    state: payload,
                    ..Default::default()
                };
                let mut buf = report.pack()?;
                fill_output_report_checksum(OUTPUT_REPORT_BT, &mut buf[1..]);
                Ok(OutputReport {
                    report_id: OUTPUT_REPORT_BT,
                    data: buf[1..].to_vec(),
                })
            }
            LinkType::Disconnected => Err("Device is not connected".into()),
        }
    }

    /// The DualShock 4 has no player indicators, mute LED or adaptive
    /// triggers; only rumble and the lightbar are encoded.
    fn encode_ds4(
        &mut self,
        state: &OutputState,
    ) -> Result<OutputReport, Box<dyn Error + Send + Sync>> {
        let payload = Ds4SetStatePackedOutputData {
            allow_rumble: true,
            allow_led_color: true,
            rumble_right: state.motor_right,
            rumble_left: state.motor_left,
            led_red: state.lightbar[0],
            led_green: state.lightbar[1],
            led_blue: state.lightbar[2],
            ..Default::default()
        };

        match self.link {
            LinkType::Usb => {
                let report = Ds4UsbPackedOutputReport {
                    state: payload,
                    ..Default::default()
                };
                let buf = report.pack()?;
                Ok(OutputReport {
                    report_id: DS4_OUTPUT_REPORT_USB,
                    data: buf[1..].to_vec(),
                })
            }
            LinkType::Bluetooth => {
                let report = Ds4BluetoothPackedOutputReport {
                    state: payload,
                    ..Default::default()
                };
                let mut buf = report.pack()?;
                fill_output_report_checksum(DS4_OUTPUT_REPORT_BT, &mut buf[1..]);
                Ok(OutputReport {
                    report_id: DS4_OUTPUT_REPORT_BT,
                    data: buf[1..].to_vec(),
                })
            }
            LinkType::Disconnected => Err("Device is not connected".into()),
        }
    }

    /// Returns the current sequence number and advances the counter
    fn next_sequence(&mut self) -> u8 {
        let sequence = self.sequence;
        self.sequence = (self.sequence + 1) & 0x0F;
        sequence
    }
}
