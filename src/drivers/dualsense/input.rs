use std::time::Duration;

use bitflags::bitflags;
use packed_struct::prelude::*;
use serde::{Deserialize, Serialize};

use crate::drivers::checksum::verify_input_report_checksum;

use super::driver::{
    DeviceFamily, LinkType, DS4_INPUT_REPORT_BT, INPUT_REPORT_BT, INPUT_REPORT_BT_REDUCED_SIZE,
    INPUT_REPORT_BT_SIZE, INPUT_REPORT_USB, INPUT_REPORT_USB_SIZE, STICK_MAX, TRIGGER_MAX,
};
use super::hid_report::{Direction, SensorTriple, TouchFingerData};
use super::offsets::{offsets, InputReportOffsets};

bitflags! {
    /// Buttons held in a single input report. The face, shoulder and system
    /// bits mirror the three button bytes of the report; the D-pad nibble is
    /// expanded into four direction flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Buttons: u32 {
        const SQUARE = 1 << 0;
        const CROSS = 1 << 1;
        const CIRCLE = 1 << 2;
        const TRIANGLE = 1 << 3;
        const L1 = 1 << 4;
        const R1 = 1 << 5;
        const L2 = 1 << 6;
        const R2 = 1 << 7;
        /// Share on the DualShock 4
        const CREATE = 1 << 8;
        const OPTIONS = 1 << 9;
        const L3 = 1 << 10;
        const R3 = 1 << 11;
        const PS = 1 << 12;
        const TOUCHPAD = 1 << 13;
        const MUTE = 1 << 14;
        const LEFT_FN = 1 << 16;
        const RIGHT_FN = 1 << 17;
        const LEFT_PADDLE = 1 << 18;
        const RIGHT_PADDLE = 1 << 19;
        const DPAD_UP = 1 << 20;
        const DPAD_RIGHT = 1 << 21;
        const DPAD_DOWN = 1 << 22;
        const DPAD_LEFT = 1 << 23;
    }
}

impl Buttons {
    /// Returns the flags for the given D-pad direction
    pub fn from_direction(direction: Direction) -> Self {
        Self::from_bits_truncate((direction.as_bitflag() as u32) << 20)
    }

    /// Decodes the three button bytes of an input report. `system_mask`
    /// selects which bits of the third byte carry buttons for the device.
    fn from_report(bytes: [u8; 3], system_mask: u8) -> Self {
        let raw = ((bytes[0] >> 4) as u32)
            | ((bytes[1] as u32) << 4)
            | (((bytes[2] & system_mask) as u32) << 12);
        Self::from_bits_truncate(raw) | Self::from_direction(Direction::from_nibble(bytes[0]))
    }
}

/// Normalized analog values. Sticks range from -1.0 to 1.0 and triggers from
/// 0.0 to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Axes {
    pub left_x: f64,
    pub left_y: f64,
    pub right_x: f64,
    pub right_y: f64,
    pub l2: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Battery {
    /// Charge level in percent. `None` when the report carries no battery data.
    pub level: Option<u8>,
    pub full: bool,
    pub charging: bool,
}

/// Active touchpad contact. Coordinates are 12-bit raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Touch {
    pub id: u8,
    pub x: u16,
    pub y: u16,
}

/// Snapshot of a controller decoded from exactly one input report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerState {
    pub family: DeviceFamily,
    pub link: LinkType,
    pub battery: Battery,
    pub axes: Axes,
    pub buttons: Buttons,
    pub touches: Vec<Touch>,
    pub gyro: [i16; 3],
    pub accel: [i16; 3],
    pub headphone_connected: bool,
    pub microphone_connected: bool,
    pub timestamp: Option<Duration>,
}

/// Layout of an input report accepted by the decoder
#[derive(Debug, Clone, Copy)]
enum ReportKind {
    /// Sticks, buttons and triggers only
    Reduced,
    /// Complete telemetry laid out by the given offsets
    Full(&'static InputReportOffsets),
}

/// Normalizes a stick byte to -1.0..=1.0
pub fn normalize_stick(value: u8) -> f64 {
    2.0 * value as f64 / STICK_MAX - 1.0
}

/// Normalizes a trigger byte to 0.0..=1.0
pub fn normalize_trigger(value: u8) -> f64 {
    value as f64 / TRIGGER_MAX
}

/// Maps a 0-10 battery level code to a percentage
fn battery_percent(code: u8) -> u8 {
    (code as u16 * 10 + 5).min(100) as u8
}

/// Decodes input reports for one device and holds the latest snapshot
#[derive(Debug, Clone)]
pub struct InputReportDecoder {
    family: DeviceFamily,
    link: LinkType,
    verify_checksum: bool,
    state: ControllerState,
}

impl InputReportDecoder {
    pub fn new(family: DeviceFamily, link: LinkType) -> Self {
        Self {
            family,
            link,
            verify_checksum: false,
            state: ControllerState {
                family,
                link,
                ..Default::default()
            },
        }
    }

    /// Drop full Bluetooth reports whose checksum trailer does not match
    pub fn with_checksum_verification(mut self, enabled: bool) -> Self {
        self.verify_checksum = enabled;
        self
    }

    /// Returns the latest decoded state
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn link(&self) -> LinkType {
        self.link
    }

    /// Changes the link type. The held state is reset since none of its
    /// fields describe the new link.
    pub fn set_link(&mut self, link: LinkType) {
        self.link = link;
        self.state = ControllerState {
            family: self.family,
            link,
            ..Default::default()
        };
    }

    /// Decodes the report and replaces the held state with the result.
    /// Returns false if the report was not recognized.
    pub fn handle(&mut self, report_id: u8, data: &[u8], timestamp: Duration) -> bool {
        let Some(state) = self.decode(report_id, data, timestamp) else {
            return false;
        };
        self.state = state;
        true
    }

    /// Decodes the given report into a new state without touching the held
    /// one. Unrecognized reports yield `None`.
    pub fn decode(
        &self,
        report_id: u8,
        data: &[u8],
        timestamp: Duration,
    ) -> Option<ControllerState> {
        let Some(kind) = self.classify(report_id, data.len()) else {
            log::trace!(
                "Ignoring input report {report_id:#04x} with {} bytes on {:?} link",
                data.len(),
                self.link
            );
            return None;
        };

        match kind {
            ReportKind::Reduced => Some(self.decode_reduced(data, timestamp)),
            ReportKind::Full(offsets) => {
                if self.verify_checksum
                    && offsets.crc32.is_some()
                    && !verify_input_report_checksum(report_id, data)
                {
                    log::warn!("Dropping input report {report_id:#04x} with bad checksum");
                    return None;
                }
                Some(self.decode_full(data, offsets, timestamp))
            }
        }
    }

    /// Returns the layout of a report with the given id and length, if the
    /// device sends such a report on the current link.
    fn classify(&self, report_id: u8, len: usize) -> Option<ReportKind> {
        let full_bt_report = match self.family {
            DeviceFamily::DualShock4 => DS4_INPUT_REPORT_BT,
            DeviceFamily::DualSense | DeviceFamily::DualSenseEdge => INPUT_REPORT_BT,
        };
        match (self.link, report_id, len) {
            (LinkType::Usb, INPUT_REPORT_USB, INPUT_REPORT_USB_SIZE) => {
                Some(ReportKind::Full(offsets(self.family, true)))
            }
            (LinkType::Bluetooth, INPUT_REPORT_USB, INPUT_REPORT_BT_REDUCED_SIZE) => {
                Some(ReportKind::Reduced)
            }
            (LinkType::Bluetooth, id, INPUT_REPORT_BT_SIZE) if id == full_bt_report => {
                Some(ReportKind::Full(offsets(self.family, false)))
            }
            _ => None,
        }
    }

    /// Bits of the third button byte that carry buttons in full reports
    fn system_button_mask(&self) -> u8 {
        match self.family {
            DeviceFamily::DualShock4 => 0x03,
            DeviceFamily::DualSense => 0x07,
            DeviceFamily::DualSenseEdge => 0xF7,
        }
    }

    fn decode_reduced(&self, data: &[u8], timestamp: Duration) -> ControllerState {
        ControllerState {
            family: self.family,
            link: self.link,
            battery: Battery::default(),
            axes: Axes {
                left_x: normalize_stick(data[0]),
                left_y: normalize_stick(data[1]),
                right_x: normalize_stick(data[2]),
                right_y: normalize_stick(data[3]),
                l2: normalize_trigger(data[7]),
                r2: normalize_trigger(data[8]),
            },
            buttons: Buttons::from_report([data[4], data[5], data[6]], 0x03),
            touches: Vec::new(),
            gyro: [0; 3],
            accel: [0; 3],
            headphone_connected: false,
            microphone_connected: false,
            timestamp: Some(timestamp),
        }
    }

    fn decode_full(
        &self,
        data: &[u8],
        offsets: &InputReportOffsets,
        timestamp: Duration,
    ) -> ControllerState {
        let b = offsets.buttons;
        let buttons = Buttons::from_report(
            [data[b], data[b + 1], data[b + 2]],
            self.system_button_mask(),
        );

        let touches = (0..2)
            .filter_map(|slot| {
                let start = offsets.touch + slot * 4;
                let finger = TouchFingerData::unpack_from_slice(&data[start..start + 4]).ok()?;
                finger.is_touching().then(|| Touch {
                    id: finger.get_id(),
                    x: finger.get_x(),
                    y: finger.get_y(),
                })
            })
            .collect();

        let gyro = SensorTriple::unpack_from_slice(&data[offsets.gyro..offsets.gyro + 6])
            .map(|s| s.to_array())
            .unwrap_or_default();
        let accel = SensorTriple::unpack_from_slice(&data[offsets.accel..offsets.accel + 6])
            .map(|s| s.to_array())
            .unwrap_or_default();

        let status0 = data[offsets.status0];
        let status1 = data[offsets.status1];
        let level = battery_percent(status0 & 0x0F);
        let (battery, headphone_connected, microphone_connected) = match self.family {
            DeviceFamily::DualShock4 => {
                let cable = status0 & 0x10 != 0;
                let full = cable && (status0 & 0x0F) >= 11;
                let battery = Battery {
                    level: Some(level),
                    full,
                    charging: cable && !full,
                };
                (battery, status0 & 0x20 != 0, status0 & 0x40 != 0)
            }
            DeviceFamily::DualSense | DeviceFamily::DualSenseEdge => {
                let battery = Battery {
                    level: Some(level),
                    full: status0 & 0x20 != 0,
                    charging: status1 & 0x08 != 0,
                };
                (battery, status1 & 0x01 != 0, status1 & 0x02 != 0)
            }
        };

        ControllerState {
            family: self.family,
            link: self.link,
            battery,
            axes: Axes {
                left_x: normalize_stick(data[offsets.left_stick_x]),
                left_y: normalize_stick(data[offsets.left_stick_y]),
                right_x: normalize_stick(data[offsets.right_stick_x]),
                right_y: normalize_stick(data[offsets.right_stick_y]),
                l2: normalize_trigger(data[offsets.l2_trigger]),
                r2: normalize_trigger(data[offsets.r2_trigger]),
            },
            buttons,
            touches,
            gyro,
            accel,
            headphone_connected,
            microphone_connected,
            timestamp: Some(timestamp),
        }
    }
}
