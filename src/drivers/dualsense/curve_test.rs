use std::error::Error;

use crate::drivers::dualsense::curve::{
    curve_values, deadzone, CurvePreset, JoystickCurve, MAX_ADJUSTMENT, MIN_ADJUSTMENT,
};

/// Evaluating a curve and reading it back should recover both parameters
#[tokio::test]
async fn test_curve_inversion() -> Result<(), Box<dyn Error>> {
    for preset in CurvePreset::ALL {
        let curve = preset.curve();
        assert_eq!(curve.preset, preset);
        for percent in 0..=100u8 {
            let expected_deadzone = percent as f64 / 100.0;
            for adjustment in MIN_ADJUSTMENT..=MAX_ADJUSTMENT {
                let points = curve.curve(expected_deadzone, adjustment);

                if preset != CurvePreset::Default {
                    assert_eq!(
                        deadzone(&points),
                        expected_deadzone,
                        "{preset:?} deadzone {percent}% adjustment {adjustment}"
                    );
                }
                if curve.supports_adjustment() {
                    assert_eq!(
                        curve.adjustment(&points),
                        Some(adjustment),
                        "{preset:?} deadzone {percent}% adjustment {adjustment}"
                    );
                }
            }
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_curve_values() -> Result<(), Box<dyn Error>> {
    let quick = JoystickCurve::for_preset(CurvePreset::Quick);
    assert_eq!(quick.curve(0.3, 2), [77, 0, 103, 38, 145, 178, 255, 255]);

    let default = CurvePreset::Default.curve();
    assert!(!default.supports_adjustment());
    assert_eq!(default.adjustment(&[0; 8]), None);
    assert_eq!(
        default.curve_bytes(0.5, 3),
        [0, 0, 128, 128, 196, 196, 225, 225],
        "default curve ignores its parameters"
    );

    Ok(())
}

#[tokio::test]
async fn test_curve_bytes_clamp() -> Result<(), Box<dyn Error>> {
    let precise = CurvePreset::Precise.curve();
    let points = precise.curve(1.0, MAX_ADJUSTMENT);
    assert_eq!(points, [255, 0, 270, 23, 270, 51, 265, 103]);
    assert_eq!(
        precise.curve_bytes(1.0, MAX_ADJUSTMENT),
        [255, 0, 255, 23, 255, 51, 255, 103]
    );

    Ok(())
}

#[tokio::test]
async fn test_deadzone_from_bytes() -> Result<(), Box<dyn Error>> {
    assert_eq!(deadzone(&[]), 0.0);
    assert_eq!(deadzone(&curve_values(&[0, 0])), 0.0);
    assert_eq!(deadzone(&curve_values(&[255])), 1.0);
    assert_eq!(deadzone(&curve_values(&[26])), 0.1);

    let mut last = 0.0;
    for byte in 0..=u8::MAX {
        let value = deadzone(&curve_values(&[byte]));
        assert!((0.0..=1.0).contains(&value), "byte {byte} gave {value}");
        assert!(value >= last, "byte {byte} decreased to {value}");
        last = value;
    }

    Ok(())
}
