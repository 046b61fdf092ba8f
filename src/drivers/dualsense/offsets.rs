//! Byte offsets of the input report fields for each controller family and
//! link type. Offsets are relative to the first byte after the report id.
use super::driver::DeviceFamily;

/// Position of every decoded field within an input report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputReportOffsets {
    pub left_stick_x: usize,
    pub left_stick_y: usize,
    pub right_stick_x: usize,
    pub right_stick_y: usize,
    pub l2_trigger: usize,
    pub r2_trigger: usize,
    pub sequence: usize,
    /// First of the three button bytes
    pub buttons: usize,
    /// Pitch, yaw, roll as three i16 values
    pub gyro: usize,
    /// X, Y, Z as three i16 values
    pub accel: usize,
    pub sensor_timestamp: usize,
    pub temperature: usize,
    /// First of the two 4 byte touch records
    pub touch: usize,
    pub status0: usize,
    pub status1: usize,
    /// Checksum trailer. Only present on Bluetooth.
    pub crc32: Option<usize>,
}

const DUALSENSE_USB: InputReportOffsets = InputReportOffsets {
    left_stick_x: 0,
    left_stick_y: 1,
    right_stick_x: 2,
    right_stick_y: 3,
    l2_trigger: 4,
    r2_trigger: 5,
    sequence: 6,
    buttons: 7,
    gyro: 15,
    accel: 21,
    sensor_timestamp: 27,
    temperature: 31,
    touch: 32,
    status0: 52,
    status1: 53,
    crc32: None,
};

const DUALSHOCK4_USB: InputReportOffsets = InputReportOffsets {
    left_stick_x: 0,
    left_stick_y: 1,
    right_stick_x: 2,
    right_stick_y: 3,
    buttons: 4,
    sequence: 6,
    l2_trigger: 7,
    r2_trigger: 8,
    sensor_timestamp: 9,
    temperature: 11,
    gyro: 12,
    accel: 18,
    status0: 29,
    status1: 30,
    touch: 34,
    crc32: None,
};

/// Offset of the checksum trailer in full Bluetooth input reports
const BLUETOOTH_CRC32_OFFSET: usize = 73;

const DUALSENSE_BT: InputReportOffsets =
    DUALSENSE_USB.shifted(bluetooth_delta(DeviceFamily::DualSense));
const DUALSHOCK4_BT: InputReportOffsets =
    DUALSHOCK4_USB.shifted(bluetooth_delta(DeviceFamily::DualShock4));

impl InputReportOffsets {
    /// Shifts every field by the given number of link-layer bytes and adds
    /// the checksum slot.
    const fn shifted(self, delta: usize) -> Self {
        Self {
            left_stick_x: self.left_stick_x + delta,
            left_stick_y: self.left_stick_y + delta,
            right_stick_x: self.right_stick_x + delta,
            right_stick_y: self.right_stick_y + delta,
            l2_trigger: self.l2_trigger + delta,
            r2_trigger: self.r2_trigger + delta,
            sequence: self.sequence + delta,
            buttons: self.buttons + delta,
            gyro: self.gyro + delta,
            accel: self.accel + delta,
            sensor_timestamp: self.sensor_timestamp + delta,
            temperature: self.temperature + delta,
            touch: self.touch + delta,
            status0: self.status0 + delta,
            status1: self.status1 + delta,
            crc32: Some(BLUETOOTH_CRC32_OFFSET),
        }
    }
}

/// Returns the offset table for the given controller family and link type
pub fn offsets(family: DeviceFamily, is_usb: bool) -> &'static InputReportOffsets {
    match (family, is_usb) {
        (DeviceFamily::DualShock4, true) => &DUALSHOCK4_USB,
        (DeviceFamily::DualShock4, false) => &DUALSHOCK4_BT,
        (DeviceFamily::DualSense | DeviceFamily::DualSenseEdge, true) => &DUALSENSE_USB,
        (DeviceFamily::DualSense | DeviceFamily::DualSenseEdge, false) => &DUALSENSE_BT,
    }
}

/// Number of link-layer bytes preceding the report data on Bluetooth
pub const fn bluetooth_delta(family: DeviceFamily) -> usize {
    match family {
        DeviceFamily::DualShock4 => 2,
        DeviceFamily::DualSense | DeviceFamily::DualSenseEdge => 1,
    }
}
