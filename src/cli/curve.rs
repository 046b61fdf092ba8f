use std::error::Error;

use clap::{Args, ValueEnum};
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::drivers::dualsense::curve::{
    curve_values, deadzone, CurvePreset, JoystickCurve, MAX_ADJUSTMENT, MIN_ADJUSTMENT,
};

use super::parse_hex;

#[derive(Args, Debug, Clone)]
pub struct CurveArgs {
    #[arg(value_enum)]
    pub preset: Preset,
    /// Deadzone in percent
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub deadzone: u8,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub adjustment: i8,
    /// Stored curve bytes in hex. Recovers the deadzone and adjustment
    /// instead of evaluating the preset.
    #[arg(long)]
    pub points: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Preset {
    Default,
    Quick,
    Precise,
    Steady,
    Digital,
    Dynamic,
}

impl From<Preset> for CurvePreset {
    fn from(value: Preset) -> Self {
        match value {
            Preset::Default => CurvePreset::Default,
            Preset::Quick => CurvePreset::Quick,
            Preset::Precise => CurvePreset::Precise,
            Preset::Steady => CurvePreset::Steady,
            Preset::Digital => CurvePreset::Digital,
            Preset::Dynamic => CurvePreset::Dynamic,
        }
    }
}

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Point")]
    index: usize,
    #[tabled(rename = "X")]
    x: i32,
    #[tabled(rename = "Y")]
    y: i32,
}

/// Deadzone and adjustment recovered from stored curve bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveParameters {
    pub deadzone_percent: u8,
    pub adjustment: Option<i8>,
}

/// Recovers the parameters a preset curve was stored with
pub fn invert_curve(curve: &JoystickCurve, bytes: &[u8]) -> CurveParameters {
    let points = curve_values(bytes);
    CurveParameters {
        deadzone_percent: (deadzone(&points) * 100.0).round() as u8,
        adjustment: curve.adjustment(&points),
    }
}

pub fn handle_curve(args: CurveArgs) -> Result<(), Box<dyn Error>> {
    let preset: CurvePreset = args.preset.into();
    let curve = JoystickCurve::for_preset(preset);

    if let Some(points) = args.points {
        let bytes = parse_hex(&points)?;
        let params = invert_curve(curve, &bytes);
        println!("Deadzone: {}%", params.deadzone_percent);
        match params.adjustment {
            Some(adjustment) => println!("Adjustment: {adjustment}"),
            None => println!("Adjustment: not supported by {preset:?}"),
        }
        return Ok(());
    }

    if !(MIN_ADJUSTMENT..=MAX_ADJUSTMENT).contains(&args.adjustment) {
        return Err(format!(
            "Adjustment must be between {MIN_ADJUSTMENT} and {MAX_ADJUSTMENT}"
        )
        .into());
    }
    if args.adjustment != 0 && !curve.supports_adjustment() {
        log::warn!("{preset:?} ignores the adjustment value");
    }

    let values = curve.curve(args.deadzone as f64 / 100.0, args.adjustment);
    let rows: Vec<PointRow> = values
        .chunks_exact(2)
        .enumerate()
        .map(|(index, pair)| PointRow {
            index,
            x: pair[0],
            y: pair[1],
        })
        .collect();
    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header(format!("{preset:?} Curve")));
    println!("{table}");
    println!(
        "Stored bytes: {}",
        hex::encode(curve.curve_bytes(args.deadzone as f64 / 100.0, args.adjustment))
    );

    Ok(())
}
