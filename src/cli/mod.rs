pub mod completion;
pub mod curve;
pub mod profile;
pub mod report;

use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use curve::{handle_curve, CurveArgs};
use profile::{handle_profile, ProfileCommand};
use report::{handle_crc32, handle_decode, handle_encode, Crc32Args, DecodeArgs, EncodeArgs};

use crate::config::CodecConfig;
use crate::drivers::dualsense::driver::{DeviceFamily, LinkType};

#[derive(Parser)]
#[command(name = "dsctl", author, version, about, long_about = None)]
pub struct Args {
    /// Path to a config file. Searches the default locations if omitted.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Decode a captured input report
    Decode(DecodeArgs),
    /// Encode an output report
    Encode(EncodeArgs),
    /// Compute or verify a report checksum
    Crc32(Crc32Args),
    /// Evaluate or invert a joystick curve preset
    Curve(CurveArgs),
    /// Inspect and build DualSense Edge profile dumps
    Profile {
        #[command(subcommand)]
        cmd: ProfileCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Controller family as given on the command line
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum Family {
    Ds4,
    #[default]
    Dualsense,
    Edge,
}

impl From<Family> for DeviceFamily {
    fn from(value: Family) -> Self {
        match value {
            Family::Ds4 => DeviceFamily::DualShock4,
            Family::Dualsense => DeviceFamily::DualSense,
            Family::Edge => DeviceFamily::DualSenseEdge,
        }
    }
}

/// Link type as given on the command line
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum Link {
    #[default]
    Usb,
    Bluetooth,
}

impl From<Link> for LinkType {
    fn from(value: Link) -> Self {
        match value {
            Link::Usb => LinkType::Usb,
            Link::Bluetooth => LinkType::Bluetooth,
        }
    }
}

impl Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Link::Usb => "usb",
            Link::Bluetooth => "bluetooth",
        };
        write!(f, "{}", value)
    }
}

pub async fn main_cli(args: Args) -> Result<(), Box<dyn Error>> {
    let Some(cmd) = args.cmd else {
        return Ok(());
    };
    let config = CodecConfig::load_from(args.config)?;

    match cmd {
        Commands::Decode(cmd) => handle_decode(&config, cmd)?,
        Commands::Encode(cmd) => handle_encode(cmd)?,
        Commands::Crc32(cmd) => handle_crc32(cmd)?,
        Commands::Curve(cmd) => handle_curve(cmd)?,
        Commands::Profile { cmd } => handle_profile(cmd)?,
        Commands::Completions { shell } => completion::generate_completion(shell),
    }

    Ok(())
}

/// Parses a hex string. Whitespace, colons and a leading `0x` are ignored.
pub fn parse_hex(value: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    let value = value.trim();
    let value = value.strip_prefix("0x").unwrap_or(value);
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&cleaned).map_err(|e| format!("Invalid hex '{value}': {e}").into())
}

/// Formats bytes as space separated hex pairs
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}
