//! On-device controller profiles of the DualSense Edge. A profile is stored
//! in three 64 byte feature report blocks sharing one header byte and sealed
//! with a checksum over their bodies.
use std::time::{SystemTime, UNIX_EPOCH};

use packed_struct::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drivers::checksum::crc32;

use super::curve::{curve_values, deadzone, CurvePreset, JoystickCurve, CURVE_POINT_BYTES};
use super::driver::DeviceFamily;
use super::transport::{FeatureReports, Transport, TransportError};

pub const PROFILE_BLOCK_SIZE: usize = 64;
pub const PROFILE_BLOCK_COUNT: usize = 3;
pub type ProfileBlocks = [[u8; PROFILE_BLOCK_SIZE]; PROFILE_BLOCK_COUNT];

/// Value of the assignment byte for empty slots
pub const UNASSIGNED_MARKER: u8 = 0x10;
/// Maximum label length in UTF-16 code units
pub const LABEL_MAX_UNITS: usize = 40;
/// Size of the concatenated block bodies covered by the checksum
pub const CHECKSUM_COVERAGE: usize = 170;
/// Bit of the trigger flags byte selecting one deadzone for both triggers
const UNIFIED_TRIGGER_DEADZONE: u8 = 0x80;

/// Errors that can occur while reading or writing profiles
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Invalid profile data: {0}")]
    Structure(String),
    #[error("Unknown profile header: {0:#04x}")]
    UnknownHeader(u8),
    #[error("Profile slot {0:?} has no readback report and cannot be written")]
    ReadOnlySlot(SwitchButton),
    #[error("Profiles are not supported on {0:?}")]
    Unsupported(DeviceFamily),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// How a profile field is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCodec {
    /// Switch button code, repeated in every block
    Header,
    /// Constant byte identifying the block
    BlockMarker(u8),
    /// `UNASSIGNED_MARKER` for empty slots
    Assignment,
    /// UTF-16LE code units, continued in the next descriptor
    Utf16Le,
    /// Opaque bytes copied verbatim
    Bytes,
    /// Curve preset id
    Preset,
    /// Number of meaningful curve points
    PointCount,
    /// Curve bytes, possibly continued in the next descriptor
    CurvePoints,
    /// Two percentages per trigger
    TriggerDeadzone,
    /// Bit 7 selects a unified trigger deadzone
    TriggerFlags,
    /// Intensity code from the vibration table
    VibrationIntensity,
    /// Intensity code from the trigger effect table
    TriggerEffectIntensity,
    /// Low 32 bits then high 16 bits, little-endian
    Timestamp48,
    /// Little-endian checksum over the block bodies
    Crc32,
}

/// Location of one field in the profile blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub block: usize,
    pub offset: usize,
    pub width: usize,
    pub codec: FieldCodec,
}

impl FieldDescriptor {
    const fn new(
        name: &'static str,
        block: usize,
        offset: usize,
        width: usize,
        codec: FieldCodec,
    ) -> Self {
        Self {
            name,
            block,
            offset,
            width,
            codec,
        }
    }

    /// One past the last byte of the field
    pub fn end(&self) -> usize {
        self.offset + self.width
    }

    pub fn read<'a>(&self, blocks: &'a ProfileBlocks) -> &'a [u8] {
        &blocks[self.block][self.offset..self.end()]
    }

    pub fn read_u8(&self, blocks: &ProfileBlocks) -> u8 {
        blocks[self.block][self.offset]
    }

    /// Copies the value into the field. Shorter values leave the remaining
    /// bytes untouched and longer values are truncated.
    pub fn write(&self, blocks: &mut ProfileBlocks, value: &[u8]) {
        let len = value.len().min(self.width);
        blocks[self.block][self.offset..self.offset + len].copy_from_slice(&value[..len]);
    }
}

pub const HEADER_0: FieldDescriptor = FieldDescriptor::new("header", 0, 0, 1, FieldCodec::Header);
pub const HEADER_1: FieldDescriptor = FieldDescriptor::new("header", 1, 0, 1, FieldCodec::Header);
pub const HEADER_2: FieldDescriptor = FieldDescriptor::new("header", 2, 0, 1, FieldCodec::Header);
pub const ASSIGNMENT: FieldDescriptor =
    FieldDescriptor::new("assignment", 0, 1, 1, FieldCodec::Assignment);
pub const BLOCK0_MARKER: FieldDescriptor =
    FieldDescriptor::new("block_marker", 0, 2, 1, FieldCodec::BlockMarker(0x01));
pub const BLOCK1_MARKER: FieldDescriptor =
    FieldDescriptor::new("block_marker", 1, 1, 1, FieldCodec::BlockMarker(0x01));
pub const BLOCK2_MARKER: FieldDescriptor =
    FieldDescriptor::new("block_marker", 2, 1, 1, FieldCodec::BlockMarker(0x02));
pub const LABEL_HEAD: FieldDescriptor = FieldDescriptor::new("label", 0, 6, 54, FieldCodec::Utf16Le);
pub const LABEL_TAIL: FieldDescriptor = FieldDescriptor::new("label", 1, 2, 26, FieldCodec::Utf16Le);
pub const UNIQUE_ID: FieldDescriptor = FieldDescriptor::new("unique_id", 1, 28, 16, FieldCodec::Bytes);
pub const LEFT_CURVE_POINT_COUNT: FieldDescriptor =
    FieldDescriptor::new("left_curve_point_count", 1, 44, 1, FieldCodec::PointCount);
pub const LEFT_CURVE_POINTS: FieldDescriptor =
    FieldDescriptor::new("left_curve_points", 1, 45, 8, FieldCodec::CurvePoints);
pub const RIGHT_CURVE_POINT_COUNT: FieldDescriptor =
    FieldDescriptor::new("right_curve_point_count", 1, 53, 1, FieldCodec::PointCount);
pub const RIGHT_CURVE_POINTS_HEAD: FieldDescriptor =
    FieldDescriptor::new("right_curve_points", 1, 54, 6, FieldCodec::CurvePoints);
pub const RIGHT_CURVE_POINTS_TAIL: FieldDescriptor =
    FieldDescriptor::new("right_curve_points", 2, 2, 2, FieldCodec::CurvePoints);
pub const TRIGGER_DEADZONE: FieldDescriptor =
    FieldDescriptor::new("trigger_deadzone", 2, 4, 4, FieldCodec::TriggerDeadzone);
pub const VIBRATION_INTENSITY: FieldDescriptor =
    FieldDescriptor::new("vibration_intensity", 2, 8, 1, FieldCodec::VibrationIntensity);
pub const TRIGGER_EFFECT_INTENSITY: FieldDescriptor = FieldDescriptor::new(
    "trigger_effect_intensity",
    2,
    9,
    1,
    FieldCodec::TriggerEffectIntensity,
);
pub const LEFT_CURVE_PRESET: FieldDescriptor =
    FieldDescriptor::new("left_curve_preset", 2, 30, 1, FieldCodec::Preset);
pub const TRIGGER_FLAGS: FieldDescriptor =
    FieldDescriptor::new("trigger_flags", 2, 31, 1, FieldCodec::TriggerFlags);
pub const RIGHT_CURVE_PRESET: FieldDescriptor =
    FieldDescriptor::new("right_curve_preset", 2, 32, 1, FieldCodec::Preset);
pub const TIMESTAMP: FieldDescriptor =
    FieldDescriptor::new("timestamp", 2, 34, 6, FieldCodec::Timestamp48);
pub const CHECKSUM: FieldDescriptor = FieldDescriptor::new("checksum", 2, 56, 4, FieldCodec::Crc32);

/// Every modeled field of the profile blocks
pub const PROFILE_LAYOUT: [FieldDescriptor; 24] = [
    HEADER_0,
    HEADER_1,
    HEADER_2,
    ASSIGNMENT,
    BLOCK0_MARKER,
    BLOCK1_MARKER,
    BLOCK2_MARKER,
    LABEL_HEAD,
    LABEL_TAIL,
    UNIQUE_ID,
    LEFT_CURVE_POINT_COUNT,
    LEFT_CURVE_POINTS,
    RIGHT_CURVE_POINT_COUNT,
    RIGHT_CURVE_POINTS_HEAD,
    RIGHT_CURVE_POINTS_TAIL,
    TRIGGER_DEADZONE,
    VIBRATION_INTENSITY,
    TRIGGER_EFFECT_INTENSITY,
    LEFT_CURVE_PRESET,
    TRIGGER_FLAGS,
    RIGHT_CURVE_PRESET,
    TIMESTAMP,
    CHECKSUM,
    // Block 2 reserved tail after the checksum
    FieldDescriptor::new("reserved", 2, 60, 4, FieldCodec::Bytes),
];

/// Block bodies covered by the checksum, as (block, start, end)
pub const CHECKSUM_RANGES: [(usize, usize, usize); 3] = [(0, 2, 60), (1, 2, 60), (2, 2, 56)];

/// Reads a field that is split across descriptors
fn read_split(blocks: &ProfileBlocks, parts: &[FieldDescriptor]) -> Vec<u8> {
    parts.iter().flat_map(|d| d.read(blocks).iter().copied()).collect()
}

/// Writes a field that is split across descriptors
fn write_split(blocks: &mut ProfileBlocks, parts: &[FieldDescriptor], value: &[u8]) {
    let mut rest = value;
    for part in parts {
        let len = rest.len().min(part.width);
        part.write(blocks, &rest[..len]);
        rest = &rest[len..];
    }
}

/// Computes the checksum of the three block bodies
pub fn profile_checksum(blocks: &ProfileBlocks) -> u32 {
    let [(b0, s0, e0), (b1, s1, e1), (b2, s2, e2)] = CHECKSUM_RANGES;
    crc32(&blocks[b0][s0..e0], &blocks[b1][s1..e1], &blocks[b2][s2..e2])
}

/// Physical switch button selecting a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchButton {
    Square,
    Cross,
    Circle,
    /// Default profile slot
    #[default]
    Triangle,
}

impl SwitchButton {
    pub const ALL: [SwitchButton; 4] = [
        SwitchButton::Triangle,
        SwitchButton::Square,
        SwitchButton::Cross,
        SwitchButton::Circle,
    ];

    /// Header code written into every block and used as the write report id
    pub fn code(&self) -> u8 {
        match self {
            Self::Square => 0x60,
            Self::Cross => 0x61,
            Self::Circle => 0x62,
            Self::Triangle => 0x63,
        }
    }

    /// First of the three feature reports holding the stored profile
    pub fn slot_report_id(&self) -> u8 {
        match self {
            Self::Triangle => 0x70,
            Self::Square => 0x73,
            Self::Cross => 0x76,
            Self::Circle => 0x79,
        }
    }

    /// Feature report read after writing a profile to confirm the save
    // TODO: Verify this table against hardware. It has no entry for the
    // triangle slot and maps square onto the triangle code.
    pub fn readback_report_id(&self) -> Option<u8> {
        match self.code() {
            0x60 => Some(0x63),
            0x62 => Some(0x65),
            0x61 => Some(0x64),
            _ => None,
        }
    }

    /// Resolves a block header, which is either a read slot id or a write code
    pub fn from_header(header: u8) -> Option<Self> {
        match header {
            0x70 | 0x63 => Some(Self::Triangle),
            0x73 | 0x60 => Some(Self::Square),
            0x76 | 0x61 => Some(Self::Cross),
            0x79 | 0x62 => Some(Self::Circle),
            _ => None,
        }
    }
}

/// Strength setting shared by vibration and trigger effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Off,
    Weak,
    Medium,
    #[default]
    Strong,
}

impl Intensity {
    pub fn vibration_code(&self) -> u8 {
        match self {
            Self::Off => 0xFF,
            Self::Weak => 0x03,
            Self::Medium => 0x02,
            Self::Strong => 0x00,
        }
    }

    /// Unknown codes decode as strong
    pub fn from_vibration_code(code: u8) -> Self {
        match code {
            0xFF => Self::Off,
            0x03 => Self::Weak,
            0x02 => Self::Medium,
            _ => Self::Strong,
        }
    }

    pub fn trigger_effect_code(&self) -> u8 {
        match self {
            Self::Off => 0xFF,
            Self::Weak => 0x09,
            Self::Medium => 0x06,
            Self::Strong => 0x00,
        }
    }

    /// Unknown codes decode as strong
    pub fn from_trigger_effect_code(code: u8) -> Self {
        match code {
            0xFF => Self::Off,
            0x09 => Self::Weak,
            0x06 => Self::Medium,
            _ => Self::Strong,
        }
    }
}

/// Trigger travel ignored at each end, in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TriggerDeadzone {
    /// Same range applied to both triggers
    Unified { range: [u8; 2] },
    Split { left: [u8; 2], right: [u8; 2] },
}

impl Default for TriggerDeadzone {
    fn default() -> Self {
        Self::Unified { range: [0, 100] }
    }
}

/// Rounds to the nearest integer with ties going up
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn encode_percent(percent: u8) -> u8 {
    round_half_up(percent.min(100) as f64 / 100.0 * 255.0) as u8
}

fn decode_percent(value: u8) -> u8 {
    round_half_up(value as f64 / 255.0 * 100.0) as u8
}

impl TriggerDeadzone {
    fn to_bytes(self) -> ([u8; 4], bool) {
        let (left, right, unified) = match self {
            Self::Unified { range } => (range, range, true),
            Self::Split { left, right } => (left, right, false),
        };
        let bytes = [
            encode_percent(left[0]),
            encode_percent(left[1]),
            encode_percent(right[0]),
            encode_percent(right[1]),
        ];
        (bytes, unified)
    }

    fn from_bytes(bytes: &[u8], unified: bool) -> Self {
        let left = [decode_percent(bytes[0]), decode_percent(bytes[1])];
        if unified {
            return Self::Unified { range: left };
        }
        let right = [decode_percent(bytes[2]), decode_percent(bytes[3])];
        Self::Split { left, right }
    }
}

/// Curve assignment for one stick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoystickProfile {
    pub preset: CurvePreset,
    pub point_count: u8,
    pub curve_points: [u8; CURVE_POINT_BYTES],
}

impl Default for JoystickProfile {
    fn default() -> Self {
        Self::from_preset(CurvePreset::Default, 0.0, 0)
    }
}

impl JoystickProfile {
    /// Builds the curve for the given preset, deadzone (0.0-1.0) and
    /// adjustment
    pub fn from_preset(preset: CurvePreset, deadzone: f64, adjustment: i8) -> Self {
        let curve = JoystickCurve::for_preset(preset);
        Self {
            preset,
            point_count: curve.point_count,
            curve_points: curve.curve_bytes(deadzone, adjustment),
        }
    }

    /// Number of curve points the preset defines. Encoding always writes
    /// this rather than `point_count`.
    pub fn preset_point_count(&self) -> u8 {
        JoystickCurve::for_preset(self.preset).point_count
    }

    pub fn deadzone(&self) -> f64 {
        deadzone(&curve_values(&self.curve_points))
    }

    pub fn adjustment(&self) -> Option<i8> {
        JoystickCurve::for_preset(self.preset).adjustment(&curve_values(&self.curve_points))
    }
}

/// Milliseconds since the Unix epoch
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Encodes up to `LABEL_MAX_UNITS` code units. Truncation never splits a
/// surrogate pair.
fn encode_label(label: &str) -> [u8; LABEL_MAX_UNITS * 2] {
    let mut buf = [0u8; LABEL_MAX_UNITS * 2];
    let mut units = [0u16; 2];
    let mut len = 0;
    for c in label.chars() {
        let encoded = c.encode_utf16(&mut units);
        if len + encoded.len() > LABEL_MAX_UNITS {
            break;
        }
        for unit in encoded.iter() {
            buf[len * 2..len * 2 + 2].copy_from_slice(&unit.to_le_bytes());
            len += 1;
        }
    }
    buf
}

fn decode_label(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
        .replace('\0', "")
        .trim()
        .to_string()
}

fn decode_preset(value: u8) -> CurvePreset {
    CurvePreset::from_primitive(value).unwrap_or_else(|| {
        log::warn!("Unknown curve preset {value}, using default");
        CurvePreset::Default
    })
}

/// Controller profile as stored on the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Header byte the profile was decoded from
    pub id: u8,
    pub assigned: bool,
    pub switch_button: SwitchButton,
    pub label: String,
    pub unique_id: [u8; 16],
    pub trigger_deadzone: TriggerDeadzone,
    pub left_joystick: JoystickProfile,
    pub right_joystick: JoystickProfile,
    pub vibration_intensity: Intensity,
    pub trigger_effect_intensity: Intensity,
    /// Milliseconds since the Unix epoch
    pub updated_at: u64,
    #[serde(with = "raw_blocks")]
    raw: ProfileBlocks,
}

impl Profile {
    /// Creates a new assigned profile with a random unique id
    pub fn new(switch_button: SwitchButton, label: &str) -> Self {
        Self {
            id: switch_button.code(),
            assigned: true,
            switch_button,
            label: label.to_string(),
            unique_id: rand::random(),
            trigger_deadzone: TriggerDeadzone::default(),
            left_joystick: JoystickProfile::default(),
            right_joystick: JoystickProfile::default(),
            vibration_intensity: Intensity::default(),
            trigger_effect_intensity: Intensity::default(),
            updated_at: 0,
            raw: [[0; PROFILE_BLOCK_SIZE]; PROFILE_BLOCK_COUNT],
        }
    }

    /// Decodes a profile from the three feature report buffers
    pub fn decode<B: AsRef<[u8]>>(blocks: &[B]) -> Result<Self, ProfileError> {
        if blocks.len() != PROFILE_BLOCK_COUNT {
            let err = format!(
                "Expected {PROFILE_BLOCK_COUNT} profile blocks, got {}",
                blocks.len()
            );
            log::error!("{err}");
            return Err(ProfileError::Structure(err));
        }

        let mut raw = [[0u8; PROFILE_BLOCK_SIZE]; PROFILE_BLOCK_COUNT];
        for (i, block) in blocks.iter().enumerate() {
            let block = block.as_ref();
            if block.len() != PROFILE_BLOCK_SIZE {
                let err = format!(
                    "Profile block {i} is {} bytes, expected {PROFILE_BLOCK_SIZE}",
                    block.len()
                );
                log::error!("{err}");
                return Err(ProfileError::Structure(err));
            }
            raw[i].copy_from_slice(block);
        }

        Self::from_blocks(raw)
    }

    /// Decodes a profile from its raw blocks. Label, curve, trigger and
    /// intensity fields are only parsed for assigned slots.
    pub fn from_blocks(raw: ProfileBlocks) -> Result<Self, ProfileError> {
        let id = HEADER_0.read_u8(&raw);
        let switch_button = SwitchButton::from_header(id).ok_or(ProfileError::UnknownHeader(id))?;
        let assigned = ASSIGNMENT.read_u8(&raw) != UNASSIGNED_MARKER;

        let mut unique_id = [0u8; 16];
        unique_id.copy_from_slice(UNIQUE_ID.read(&raw));

        let timestamp = TIMESTAMP.read(&raw);
        let low = u32::from_le_bytes([timestamp[0], timestamp[1], timestamp[2], timestamp[3]]);
        let high = u16::from_le_bytes([timestamp[4], timestamp[5]]);
        let updated_at = (high as u64) << 32 | low as u64;

        let mut profile = Self {
            id,
            assigned,
            switch_button,
            label: String::new(),
            unique_id,
            trigger_deadzone: TriggerDeadzone::default(),
            left_joystick: JoystickProfile::default(),
            right_joystick: JoystickProfile::default(),
            vibration_intensity: Intensity::default(),
            trigger_effect_intensity: Intensity::default(),
            updated_at,
            raw,
        };
        if !assigned {
            log::debug!("Profile slot {switch_button:?} is unassigned");
            return Ok(profile);
        }

        if !profile.checksum_valid() {
            log::warn!("Profile {switch_button:?} checksum does not match its contents");
        }

        profile.label = decode_label(&read_split(&raw, &[LABEL_HEAD, LABEL_TAIL]));

        let unified = TRIGGER_FLAGS.read_u8(&raw) & UNIFIED_TRIGGER_DEADZONE != 0;
        profile.trigger_deadzone = TriggerDeadzone::from_bytes(TRIGGER_DEADZONE.read(&raw), unified);
        profile.vibration_intensity =
            Intensity::from_vibration_code(VIBRATION_INTENSITY.read_u8(&raw));
        profile.trigger_effect_intensity =
            Intensity::from_trigger_effect_code(TRIGGER_EFFECT_INTENSITY.read_u8(&raw));

        let mut left_points = [0u8; CURVE_POINT_BYTES];
        left_points.copy_from_slice(LEFT_CURVE_POINTS.read(&raw));
        profile.left_joystick = JoystickProfile {
            preset: decode_preset(LEFT_CURVE_PRESET.read_u8(&raw)),
            point_count: LEFT_CURVE_POINT_COUNT.read_u8(&raw),
            curve_points: left_points,
        };

        let mut right_points = [0u8; CURVE_POINT_BYTES];
        right_points.copy_from_slice(&read_split(
            &raw,
            &[RIGHT_CURVE_POINTS_HEAD, RIGHT_CURVE_POINTS_TAIL],
        ));
        profile.right_joystick = JoystickProfile {
            preset: decode_preset(RIGHT_CURVE_PRESET.read_u8(&raw)),
            point_count: RIGHT_CURVE_POINT_COUNT.read_u8(&raw),
            curve_points: right_points,
        };

        Ok(profile)
    }

    /// Stamps the current time and encodes the profile
    pub fn encode(&mut self) -> ProfileBlocks {
        self.updated_at = now_millis();
        self.to_blocks()
    }

    /// Encodes the profile on top of the blocks it was decoded from, keeping
    /// every byte that is not modeled.
    pub fn to_blocks(&self) -> ProfileBlocks {
        let mut blocks = self.raw;
        let header = self.switch_button.code();
        for descriptor in [HEADER_0, HEADER_1, HEADER_2] {
            descriptor.write(&mut blocks, &[header]);
        }
        for descriptor in [BLOCK0_MARKER, BLOCK1_MARKER, BLOCK2_MARKER] {
            if let FieldCodec::BlockMarker(marker) = descriptor.codec {
                descriptor.write(&mut blocks, &[marker]);
            }
        }

        let assignment = match (self.assigned, ASSIGNMENT.read_u8(&blocks)) {
            (false, _) => UNASSIGNED_MARKER,
            (true, UNASSIGNED_MARKER) => 0x00,
            (true, current) => current,
        };
        ASSIGNMENT.write(&mut blocks, &[assignment]);
        UNIQUE_ID.write(&mut blocks, &self.unique_id);

        if self.assigned {
            write_split(&mut blocks, &[LABEL_HEAD, LABEL_TAIL], &encode_label(&self.label));

            let (deadzone, unified) = self.trigger_deadzone.to_bytes();
            TRIGGER_DEADZONE.write(&mut blocks, &deadzone);
            let flags = TRIGGER_FLAGS.read_u8(&blocks);
            let flags = if unified {
                flags | UNIFIED_TRIGGER_DEADZONE
            } else {
                flags & !UNIFIED_TRIGGER_DEADZONE
            };
            TRIGGER_FLAGS.write(&mut blocks, &[flags]);

            VIBRATION_INTENSITY.write(&mut blocks, &[self.vibration_intensity.vibration_code()]);
            TRIGGER_EFFECT_INTENSITY.write(
                &mut blocks,
                &[self.trigger_effect_intensity.trigger_effect_code()],
            );

            LEFT_CURVE_PRESET.write(&mut blocks, &[self.left_joystick.preset.to_primitive()]);
            LEFT_CURVE_POINT_COUNT.write(&mut blocks, &[self.left_joystick.preset_point_count()]);
            LEFT_CURVE_POINTS.write(&mut blocks, &self.left_joystick.curve_points);
            RIGHT_CURVE_PRESET.write(&mut blocks, &[self.right_joystick.preset.to_primitive()]);
            RIGHT_CURVE_POINT_COUNT.write(&mut blocks, &[self.right_joystick.preset_point_count()]);
            write_split(
                &mut blocks,
                &[RIGHT_CURVE_POINTS_HEAD, RIGHT_CURVE_POINTS_TAIL],
                &self.right_joystick.curve_points,
            );
        }

        let low = (self.updated_at & 0xFFFF_FFFF) as u32;
        let high = ((self.updated_at >> 32) & 0xFFFF) as u16;
        let mut timestamp = [0u8; 6];
        timestamp[..4].copy_from_slice(&low.to_le_bytes());
        timestamp[4..].copy_from_slice(&high.to_le_bytes());
        TIMESTAMP.write(&mut blocks, &timestamp);

        let checksum = profile_checksum(&blocks);
        CHECKSUM.write(&mut blocks, &checksum.to_le_bytes());

        blocks
    }

    /// Returns the blocks the profile was last decoded from or saved as
    pub fn raw_blocks(&self) -> &ProfileBlocks {
        &self.raw
    }

    /// Returns true if the stored checksum matches the block contents
    pub fn checksum_valid(&self) -> bool {
        let stored = CHECKSUM.read(&self.raw);
        profile_checksum(&self.raw).to_le_bytes() == stored
    }
}

/// Reads the profile stored behind the given switch button
pub fn read_profile<T: Transport + ?Sized>(
    reports: &FeatureReports<'_, T>,
    switch_button: SwitchButton,
) -> Result<Profile, ProfileError> {
    let base = switch_button.slot_report_id();
    let mut blocks = Vec::with_capacity(PROFILE_BLOCK_COUNT);
    for i in 0..PROFILE_BLOCK_COUNT as u8 {
        blocks.push(reports.receive(base + i)?);
    }
    Profile::decode(&blocks)
}

/// Writes the profile as three feature reports followed by a readback of the
/// confirmation report, which is returned. Over Bluetooth each block carries
/// the feature report checksum in its last 4 bytes. The blocks are not written
/// atomically, so callers must keep other traffic off the device until this
/// returns.
pub fn save_profile<T: Transport + ?Sized>(
    reports: &FeatureReports<'_, T>,
    profile: &mut Profile,
) -> Result<Vec<u8>, ProfileError> {
    let switch_button = profile.switch_button;
    let readback_id = switch_button
        .readback_report_id()
        .ok_or(ProfileError::ReadOnlySlot(switch_button))?;

    let blocks = profile.encode();
    for (i, block) in blocks.iter().enumerate() {
        log::debug!("Writing profile {switch_button:?} block {i}");
        reports.send(block[0], &block[1..])?;
    }

    let confirmation = reports.receive(readback_id)?;
    log::debug!("Profile {switch_button:?} saved");
    profile.raw = blocks;
    profile.id = switch_button.code();

    Ok(confirmation)
}

mod raw_blocks {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    use super::{ProfileBlocks, PROFILE_BLOCK_COUNT, PROFILE_BLOCK_SIZE};

    pub fn serialize<S: Serializer>(blocks: &ProfileBlocks, serializer: S) -> Result<S::Ok, S::Error> {
        let blocks: Vec<&[u8]> = blocks.iter().map(|b| b.as_slice()).collect();
        blocks.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProfileBlocks, D::Error> {
        let blocks: Vec<Vec<u8>> = Vec::deserialize(deserializer)?;
        if blocks.len() != PROFILE_BLOCK_COUNT {
            return Err(D::Error::custom(format!(
                "expected {PROFILE_BLOCK_COUNT} profile blocks, got {}",
                blocks.len()
            )));
        }
        let mut raw = [[0u8; PROFILE_BLOCK_SIZE]; PROFILE_BLOCK_COUNT];
        for (dst, src) in raw.iter_mut().zip(blocks.iter()) {
            if src.len() != PROFILE_BLOCK_SIZE {
                return Err(D::Error::custom(format!(
                    "expected {PROFILE_BLOCK_SIZE} byte profile block, got {}",
                    src.len()
                )));
            }
            dst.copy_from_slice(src);
        }
        Ok(raw)
    }
}
