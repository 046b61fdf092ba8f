use std::error::Error;
use std::time::Duration;

use clap::Args;
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::config::CodecConfig;
use crate::drivers::checksum::{crc32, fill_checksum, verify_checksum};
use crate::drivers::dualsense::input::{ControllerState, InputReportDecoder};
use crate::drivers::dualsense::output::{OutputReportEncoder, OutputState};

use super::{format_hex, parse_hex, Family, Link};

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Report bytes in hex, starting with the report id
    pub report: String,
    #[arg(long, value_enum, default_value_t = Family::default())]
    pub family: Family,
    #[arg(long, value_enum, default_value_t = Link::default())]
    pub link: Link,
    /// Print the decoded state as JSON
    #[arg(long, action)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EncodeArgs {
    #[arg(long, value_enum, default_value_t = Family::default())]
    pub family: Family,
    #[arg(long, value_enum, default_value_t = Link::default())]
    pub link: Link,
    /// Output state as JSON. Missing fields take their defaults.
    #[arg(long)]
    pub state: Option<String>,
    /// Lightbar color as hex RRGGBB
    #[arg(long)]
    pub lightbar: Option<String>,
    /// Player number shown on the indicator LEDs (0-5)
    #[arg(long)]
    pub player: Option<u8>,
    #[arg(long)]
    pub left_motor: Option<u8>,
    #[arg(long)]
    pub right_motor: Option<u8>,
    #[arg(long, action)]
    pub mic_led: bool,
    /// Bluetooth sequence number to encode with
    #[arg(long, default_value_t = 0)]
    pub sequence: u8,
}

#[derive(Args, Debug, Clone)]
pub struct Crc32Args {
    /// Bytes in hex
    pub data: String,
    /// Bytes in hex hashed ahead of the data, e.g. "a2 31" for output reports
    #[arg(long, default_value = "")]
    pub prefix: String,
    /// Treat the last 4 bytes as a checksum trailer and fill it
    #[arg(long, action, conflicts_with = "verify")]
    pub fill: bool,
    /// Treat the last 4 bytes as a checksum trailer and verify it
    #[arg(long, action)]
    pub verify: bool,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl FieldRow {
    fn new(field: &str, value: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Decodes the given report bytes, which start with the report id
pub fn decode_report(
    config: &CodecConfig,
    family: Family,
    link: Link,
    report: &[u8],
) -> Result<ControllerState, Box<dyn Error>> {
    let Some((report_id, data)) = report.split_first() else {
        return Err("Report is empty".into());
    };
    let decoder = InputReportDecoder::new(family.into(), link.into())
        .with_checksum_verification(config.verify_input_checksum);
    decoder
        .decode(*report_id, data, Duration::ZERO)
        .ok_or_else(|| {
            format!(
                "Report {report_id:#04x} with {} data bytes is not a {:?} input report over {link}",
                data.len(),
                family
            )
            .into()
        })
}

pub fn handle_decode(config: &CodecConfig, args: DecodeArgs) -> Result<(), Box<dyn Error>> {
    let report = parse_hex(&args.report)?;
    let state = decode_report(config, args.family, args.link, &report)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    let axes = state.axes;
    let battery = match state.battery.level {
        Some(level) => format!(
            "{level}%{}{}",
            if state.battery.charging { " charging" } else { "" },
            if state.battery.full { " full" } else { "" }
        ),
        None => "-".to_string(),
    };
    let buttons: Vec<&str> = state.buttons.iter_names().map(|(name, _)| name).collect();
    let touches: Vec<String> = state
        .touches
        .iter()
        .map(|t| format!("#{} ({}, {})", t.id, t.x, t.y))
        .collect();
    let rows = vec![
        FieldRow::new("Family", state.family.name()),
        FieldRow::new("Link", format!("{:?}", state.link)),
        FieldRow::new("Buttons", buttons.join(" ")),
        FieldRow::new("Left Stick", format!("{:.3}, {:.3}", axes.left_x, axes.left_y)),
        FieldRow::new("Right Stick", format!("{:.3}, {:.3}", axes.right_x, axes.right_y)),
        FieldRow::new("Triggers", format!("{:.3}, {:.3}", axes.l2, axes.r2)),
        FieldRow::new("Touches", touches.join(" ")),
        FieldRow::new("Gyro", format!("{:?}", state.gyro)),
        FieldRow::new("Accel", format!("{:?}", state.accel)),
        FieldRow::new("Battery", battery),
        FieldRow::new("Headphones", state.headphone_connected),
        FieldRow::new("Microphone", state.microphone_connected),
    ];
    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("Input Report"));
    println!("{table}");

    Ok(())
}

/// Builds the output state from the command line flags
pub fn output_state(args: &EncodeArgs) -> Result<OutputState, Box<dyn Error>> {
    let mut state = match &args.state {
        Some(json) => serde_json::from_str(json)?,
        None => OutputState::default(),
    };
    if let Some(color) = &args.lightbar {
        let bytes = parse_hex(color)?;
        let [r, g, b] = bytes.as_slice() else {
            return Err(format!("Lightbar color must be 3 bytes, got {}", bytes.len()).into());
        };
        state.lightbar = [*r, *g, *b];
    }
    if let Some(player) = args.player {
        state.player_led = player;
    }
    if let Some(motor) = args.left_motor {
        state.motor_left = motor;
    }
    if let Some(motor) = args.right_motor {
        state.motor_right = motor;
    }
    if args.mic_led {
        state.mic_led = true;
    }
    Ok(state)
}

pub fn handle_encode(args: EncodeArgs) -> Result<(), Box<dyn Error>> {
    let state = output_state(&args)?;
    let mut encoder = OutputReportEncoder::new(args.family.into(), args.link.into())
        .with_sequence(args.sequence);
    let report = encoder.encode(&state).map_err(|e| e.to_string())?;

    let mut bytes = vec![report.report_id];
    bytes.extend_from_slice(&report.data);
    println!("{}", format_hex(&bytes));

    Ok(())
}

pub fn handle_crc32(args: Crc32Args) -> Result<(), Box<dyn Error>> {
    let prefix = parse_hex(&args.prefix)?;
    let mut data = parse_hex(&args.data)?;

    if args.verify {
        let valid = verify_checksum(&prefix, &data);
        println!("{}", if valid { "valid" } else { "invalid" });
        if !valid {
            return Err("Checksum trailer does not match".into());
        }
        return Ok(());
    }

    if args.fill {
        let Some(checksum) = fill_checksum(&prefix, &mut data) else {
            return Err("Data is too short to hold a checksum trailer".into());
        };
        println!("{checksum:#010x}");
        println!("{}", format_hex(&data));
        return Ok(());
    }

    println!("{:#010x}", crc32(&prefix, &data, &[]));

    Ok(())
}
