use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::drivers::dualsense::profile::{
    JoystickProfile, Profile, ProfileBlocks, SwitchButton, TriggerDeadzone,
};

use super::parse_hex;

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// Decode a profile dump with one hex line per block
    Show {
        path: PathBuf,
        /// Print the profile as JSON
        #[arg(long, action)]
        json: bool,
    },
    /// Print a new empty profile as JSON
    New {
        #[arg(value_enum)]
        button: Button,
        label: String,
    },
    /// Encode a JSON profile into a dump with one hex line per block
    Encode { path: PathBuf },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Button {
    Square,
    Cross,
    Circle,
    Triangle,
}

impl From<Button> for SwitchButton {
    fn from(value: Button) -> Self {
        match value {
            Button::Square => SwitchButton::Square,
            Button::Cross => SwitchButton::Cross,
            Button::Circle => SwitchButton::Circle,
            Button::Triangle => SwitchButton::Triangle,
        }
    }
}

#[derive(Tabled)]
struct ProfileInfo {
    #[tabled(rename = "Button")]
    button: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Assigned")]
    assigned: bool,
    #[tabled(rename = "Left Stick")]
    left: String,
    #[tabled(rename = "Right Stick")]
    right: String,
    #[tabled(rename = "Trigger Deadzone")]
    deadzone: String,
    #[tabled(rename = "Vibration")]
    vibration: String,
    #[tabled(rename = "Trigger Effect")]
    trigger_effect: String,
    #[tabled(rename = "Checksum")]
    checksum: String,
}

/// Parses a profile dump. Blank lines and lines starting with `#` are
/// skipped.
pub fn parse_dump(content: &str) -> Result<Profile, Box<dyn Error>> {
    let blocks = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_hex)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Profile::decode(&blocks)?)
}

/// Formats the blocks as one hex line each
pub fn format_dump(blocks: &ProfileBlocks) -> String {
    blocks
        .iter()
        .map(hex::encode)
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_stick(stick: &JoystickProfile) -> String {
    let deadzone = (stick.deadzone() * 100.0).round();
    match stick.adjustment() {
        Some(adjustment) => format!("{:?} {deadzone}% {adjustment:+}", stick.preset),
        None => format!("{:?} {deadzone}%", stick.preset),
    }
}

fn describe_deadzone(deadzone: &TriggerDeadzone) -> String {
    match deadzone {
        TriggerDeadzone::Unified { range } => format!("{}-{}%", range[0], range[1]),
        TriggerDeadzone::Split { left, right } => format!(
            "L {}-{}% R {}-{}%",
            left[0], left[1], right[0], right[1]
        ),
    }
}

pub fn handle_profile(cmd: ProfileCommand) -> Result<(), Box<dyn Error>> {
    match cmd {
        ProfileCommand::Show { path, json } => {
            let content = fs::read_to_string(&path)?;
            let profile = parse_dump(&content)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
                return Ok(());
            }

            let info = ProfileInfo {
                button: format!("{:?}", profile.switch_button),
                label: profile.label.clone(),
                assigned: profile.assigned,
                left: describe_stick(&profile.left_joystick),
                right: describe_stick(&profile.right_joystick),
                deadzone: describe_deadzone(&profile.trigger_deadzone),
                vibration: format!("{:?}", profile.vibration_intensity),
                trigger_effect: format!("{:?}", profile.trigger_effect_intensity),
                checksum: if profile.checksum_valid() {
                    "valid".to_string()
                } else {
                    "invalid".to_string()
                },
            };
            let mut table = Table::new(vec![info]);
            table
                .with(Style::modern_rounded())
                .with(Panel::header("Controller Profile"));
            println!("{table}");
        }
        ProfileCommand::New { button, label } => {
            let profile = Profile::new(button.into(), &label);
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        ProfileCommand::Encode { path } => {
            let content = fs::read_to_string(&path)?;
            let mut profile: Profile = serde_json::from_str(&content)?;
            println!("{}", format_dump(&profile.encode()));
        }
    }

    Ok(())
}
