//! Joystick response curves stored in DualSense Edge profiles. Each preset is
//! a list of control point pairs evaluated from a deadzone and an optional
//! adjustment value, and the evaluation can be inverted to recover both
//! parameters from the stored curve bytes.
//!
//! Rounding: interpolated bases are rounded half up. When an adjustment is
//! added to a deadzone interpolated point the sum is floored instead.
use packed_struct::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of curve bytes stored per stick
pub const CURVE_POINT_BYTES: usize = 8;
pub const MIN_ADJUSTMENT: i8 = -5;
pub const MAX_ADJUSTMENT: i8 = 5;

#[derive(
    PrimitiveEnum_u8, Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CurvePreset {
    #[default]
    Default = 0,
    Quick = 1,
    Precise = 2,
    Steady = 3,
    Digital = 4,
    Dynamic = 5,
}

impl CurvePreset {
    pub const ALL: [CurvePreset; 6] = [
        CurvePreset::Default,
        CurvePreset::Quick,
        CurvePreset::Precise,
        CurvePreset::Steady,
        CurvePreset::Digital,
        CurvePreset::Dynamic,
    ];

    pub fn curve(&self) -> &'static JoystickCurve {
        JoystickCurve::for_preset(*self)
    }
}

/// Rounds to the nearest integer with ties going toward positive infinity
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// One control point of a curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub base: f64,
    /// Change per adjustment unit. Zero when the point is not adjustable.
    pub delta: f64,
    /// Whether the point is pulled toward 255 as the deadzone grows
    pub affected_by_deadzone: bool,
}

impl CurvePoint {
    const fn new(base: f64) -> Self {
        Self {
            base,
            delta: 0.0,
            affected_by_deadzone: true,
        }
    }

    const fn fixed(base: f64) -> Self {
        Self {
            base,
            delta: 0.0,
            affected_by_deadzone: false,
        }
    }

    const fn adjustable(base: f64, delta: f64) -> Self {
        Self {
            base,
            delta,
            affected_by_deadzone: true,
        }
    }

    const fn fixed_adjustable(base: f64, delta: f64) -> Self {
        Self {
            base,
            delta,
            affected_by_deadzone: false,
        }
    }

    fn interpolated_base(&self, deadzone: f64) -> f64 {
        self.base * (1.0 - deadzone) + 255.0 * deadzone
    }

    /// Evaluates the point for the given deadzone (0.0-1.0) and adjustment
    pub fn value(&self, deadzone: f64, adjustment: i8) -> i32 {
        let adjustment = adjustment as f64;
        let value = match (self.delta != 0.0, self.affected_by_deadzone) {
            (false, false) => self.base,
            (false, true) => round_half_up(self.interpolated_base(deadzone)),
            (true, false) => round_half_up(self.base + self.delta * adjustment),
            (true, true) => {
                (round_half_up(self.interpolated_base(deadzone)) + self.delta * adjustment).floor()
            }
        };
        value as i32
    }
}

/// Curve definition for one preset
#[derive(Debug, Clone, PartialEq)]
pub struct JoystickCurve {
    pub preset: CurvePreset,
    /// Point count stored alongside the curve bytes
    pub point_count: u8,
    /// X and Y control point pairs
    pub points: [[CurvePoint; 2]; 4],
    /// Index into the flattened points used to recover the adjustment
    pub reverse_point_index: Option<usize>,
}

static PRESETS: [JoystickCurve; 6] = [
    JoystickCurve {
        preset: CurvePreset::Default,
        point_count: 3,
        points: [
            [CurvePoint::fixed(0.0), CurvePoint::fixed(0.0)],
            [CurvePoint::fixed(128.0), CurvePoint::fixed(128.0)],
            [CurvePoint::fixed(196.0), CurvePoint::fixed(196.0)],
            [CurvePoint::fixed(225.0), CurvePoint::fixed(225.0)],
        ],
        reverse_point_index: None,
    },
    JoystickCurve {
        preset: CurvePreset::Quick,
        point_count: 3,
        points: [
            [CurvePoint::new(0.0), CurvePoint::fixed(0.0)],
            [CurvePoint::new(38.0), CurvePoint::fixed(38.0)],
            [
                CurvePoint::adjustable(107.0, -3.0),
                CurvePoint::fixed_adjustable(167.0, 5.5),
            ],
            [CurvePoint::new(255.0), CurvePoint::fixed(255.0)],
        ],
        reverse_point_index: Some(4),
    },
    JoystickCurve {
        preset: CurvePreset::Precise,
        point_count: 4,
        points: [
            [CurvePoint::new(0.0), CurvePoint::fixed(0.0)],
            [
                CurvePoint::adjustable(85.0, 3.0),
                CurvePoint::fixed_adjustable(40.0, -3.5),
            ],
            [
                CurvePoint::adjustable(149.0, 3.0),
                CurvePoint::fixed_adjustable(83.0, -6.5),
            ],
            [
                CurvePoint::adjustable(206.0, 2.0),
                CurvePoint::fixed_adjustable(140.0, -7.5),
            ],
        ],
        reverse_point_index: Some(2),
    },
    JoystickCurve {
        preset: CurvePreset::Steady,
        point_count: 4,
        points: [
            [CurvePoint::new(0.0), CurvePoint::fixed(0.0)],
            [
                CurvePoint::adjustable(57.0, -1.0),
                CurvePoint::fixed_adjustable(57.0, -1.0),
            ],
            [
                CurvePoint::adjustable(100.0, -4.0),
                CurvePoint::fixed_adjustable(127.0, -0.5),
            ],
            [
                CurvePoint::adjustable(210.0, 2.5),
                CurvePoint::fixed_adjustable(152.0, -5.5),
            ],
        ],
        reverse_point_index: Some(4),
    },
    JoystickCurve {
        preset: CurvePreset::Digital,
        point_count: 3,
        points: [
            [CurvePoint::new(0.0), CurvePoint::fixed(0.0)],
            [CurvePoint::new(38.0), CurvePoint::fixed(38.0)],
            [
                CurvePoint::new(38.0),
                CurvePoint::fixed_adjustable(165.0, 18.0),
            ],
            [CurvePoint::new(255.0), CurvePoint::fixed(255.0)],
        ],
        reverse_point_index: Some(5),
    },
    JoystickCurve {
        preset: CurvePreset::Dynamic,
        point_count: 3,
        points: [
            [CurvePoint::new(0.0), CurvePoint::fixed(0.0)],
            [
                CurvePoint::adjustable(82.0, 2.5),
                CurvePoint::fixed_adjustable(40.0, -3.5),
            ],
            [
                CurvePoint::adjustable(161.0, -4.5),
                CurvePoint::fixed_adjustable(213.0, 3.0),
            ],
            [CurvePoint::new(255.0), CurvePoint::fixed(255.0)],
        ],
        reverse_point_index: Some(5),
    },
];

impl JoystickCurve {
    pub fn for_preset(preset: CurvePreset) -> &'static JoystickCurve {
        &PRESETS[preset as usize]
    }

    /// Returns true if the preset exposes an adjustment value
    pub fn supports_adjustment(&self) -> bool {
        self.reverse_point_index.is_some()
    }

    /// Points in storage order: x0, y0, x1, y1, ...
    pub fn flattened(&self) -> impl Iterator<Item = &CurvePoint> {
        self.points.iter().flatten()
    }

    /// Evaluates every point of the curve. Values are not clamped to a byte.
    pub fn curve(&self, deadzone: f64, adjustment: i8) -> [i32; CURVE_POINT_BYTES] {
        let mut values = [0; CURVE_POINT_BYTES];
        for (value, point) in values.iter_mut().zip(self.flattened()) {
            *value = point.value(deadzone, adjustment);
        }
        values
    }

    /// Evaluates the curve and clamps each value into a byte for storage
    pub fn curve_bytes(&self, deadzone: f64, adjustment: i8) -> [u8; CURVE_POINT_BYTES] {
        self.curve(deadzone, adjustment)
            .map(|value| value.clamp(0, u8::MAX as i32) as u8)
    }

    /// Recovers the adjustment a curve was evaluated with. Returns `None` for
    /// presets without adjustment support.
    pub fn adjustment(&self, points: &[i32]) -> Option<i8> {
        let index = self.reverse_point_index?;
        let point = self.flattened().nth(index)?;
        let current = *points.get(index)? as f64;
        if point.delta == 0.0 {
            return None;
        }

        let raw = if point.affected_by_deadzone {
            let deadzone = deadzone(points);
            current - point.base * (1.0 - deadzone) - 255.0 * deadzone
        } else {
            current - point.base
        };
        let adjustment = round_half_up(raw / point.delta);
        Some(adjustment.clamp(MIN_ADJUSTMENT as f64, MAX_ADJUSTMENT as f64) as i8)
    }
}

/// Recovers the deadzone (0.0-1.0, in hundredths) from the first curve value
pub fn deadzone(points: &[i32]) -> f64 {
    match points.first() {
        None | Some(0) => 0.0,
        Some(first) => round_half_up(*first as f64 / 2.55) / 100.0,
    }
}

/// Converts stored curve bytes into curve values
pub fn curve_values(bytes: &[u8]) -> Vec<i32> {
    bytes.iter().map(|b| *b as i32).collect()
}
