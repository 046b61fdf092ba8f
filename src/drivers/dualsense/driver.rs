use std::{error::Error, time::Duration};

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::CodecConfig;

use super::{
    diagnostic::Diagnostics,
    event::{translate, Event},
    input::{ControllerState, InputReportDecoder},
    output::{OutputReportEncoder, OutputState},
    profile::{self, Profile, ProfileError, SwitchButton},
    transport::{FeatureReports, InputReportEvent, Transport},
};

// Source: https://github.com/torvalds/linux/blob/master/drivers/hid/hid-playstation.c
pub const SONY_VID: u16 = 0x054c;
pub const DS4_V1_PID: u16 = 0x05c4;
pub const DS4_V2_PID: u16 = 0x09cc;
pub const DS5_PID: u16 = 0x0ce6;
pub const DS5_EDGE_PID: u16 = 0x0df2;

pub const PIDS: [u16; 4] = [DS4_V1_PID, DS4_V2_PID, DS5_PID, DS5_EDGE_PID];

pub const FEATURE_REPORT_SIZE: usize = 63;
pub const FEATURE_REPORT_FIRMWARE_INFO: u8 = 0x20;
pub const FEATURE_REPORT_BT_PATCH: u8 = 0x22;
pub const FEATURE_REPORT_TEST_COMMAND: u8 = 0x80;
pub const FEATURE_REPORT_TEST_RESULT: u8 = 0x81;
pub const FEATURE_REPORT_VERIFY_START: u8 = 0x84;
pub const FEATURE_REPORT_VERIFY_RESULT: u8 = 0x85;

// Report sizes exclude the report id
pub const INPUT_REPORT_USB: u8 = 0x01;
pub const INPUT_REPORT_USB_SIZE: usize = 63;
pub const INPUT_REPORT_BT: u8 = 0x31;
pub const INPUT_REPORT_BT_SIZE: usize = 77;
pub const INPUT_REPORT_BT_REDUCED_SIZE: usize = 9;
pub const DS4_INPUT_REPORT_BT: u8 = 0x11;
pub const OUTPUT_REPORT_USB: u8 = 0x02;
pub const OUTPUT_REPORT_USB_SIZE: usize = 47;
pub const OUTPUT_REPORT_BT: u8 = 0x31;
pub const OUTPUT_REPORT_BT_SIZE: usize = 77;
pub const DS4_OUTPUT_REPORT_USB: u8 = 0x05;
pub const DS4_OUTPUT_REPORT_BT: u8 = 0x11;

// Input report axis ranges
pub const STICK_MAX: f64 = u8::MAX as f64;
pub const TRIGGER_MAX: f64 = u8::MAX as f64;

/// Controller generation. Selects report layouts and feature support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFamily {
    DualShock4,
    #[default]
    DualSense,
    DualSenseEdge,
}

impl DeviceFamily {
    pub fn from_product_id(pid: u16) -> Option<Self> {
        match pid {
            DS4_V1_PID | DS4_V2_PID => Some(Self::DualShock4),
            DS5_PID => Some(Self::DualSense),
            DS5_EDGE_PID => Some(Self::DualSenseEdge),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DualShock4 => "DualShock 4",
            Self::DualSense => "DualSense",
            Self::DualSenseEdge => "DualSense Edge",
        }
    }

    /// Returns true if the controller stores profiles
    pub fn supports_profiles(&self) -> bool {
        *self == Self::DualSenseEdge
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    #[default]
    Disconnected,
    Usb,
    Bluetooth,
}

/// Sony controller driver. Owns the decoded input state, the output encoder
/// and its sequence counter for one device.
pub struct Driver<T: Transport> {
    transport: T,
    decoder: InputReportDecoder,
    encoder: OutputReportEncoder,
    config: CodecConfig,
    disconnect: CancellationToken,
    send_failures: u32,
}

impl<T: Transport> Driver<T> {
    pub fn new(transport: T, family: DeviceFamily, link: LinkType) -> Self {
        Self::with_config(transport, family, link, CodecConfig::default())
    }

    pub fn with_config(
        transport: T,
        family: DeviceFamily,
        link: LinkType,
        config: CodecConfig,
    ) -> Self {
        let decoder = InputReportDecoder::new(family, link)
            .with_checksum_verification(config.verify_input_checksum);
        Self {
            transport,
            decoder,
            encoder: OutputReportEncoder::new(family, link),
            config,
            disconnect: CancellationToken::new(),
            send_failures: 0,
        }
    }

    pub fn family(&self) -> DeviceFamily {
        self.decoder.family()
    }

    pub fn link(&self) -> LinkType {
        self.decoder.link()
    }

    /// Returns the latest decoded controller state
    pub fn state(&self) -> &ControllerState {
        self.decoder.state()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a token that is cancelled when the device is considered gone
    pub fn disconnect_token(&self) -> CancellationToken {
        self.disconnect.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.link() != LinkType::Disconnected && !self.disconnect.is_cancelled()
    }

    /// Switches to a new link. Connecting again after a disconnect issues a
    /// fresh disconnect token.
    pub fn set_link(&mut self, link: LinkType) {
        log::debug!("Link changed from {:?} to {link:?}", self.link());
        self.decoder.set_link(link);
        self.encoder.set_link(link);
        self.send_failures = 0;
        if link == LinkType::Disconnected {
            self.disconnect.cancel();
        } else if self.disconnect.is_cancelled() {
            self.disconnect = CancellationToken::new();
        }
    }

    /// Marks the device as disconnected
    pub fn disconnect(&mut self) {
        log::info!("{} disconnected", self.family().name());
        self.set_link(LinkType::Disconnected);
    }

    /// Decodes an input report and returns the events describing how the
    /// state changed. Unrecognized reports produce no events.
    pub fn handle_input_report(
        &mut self,
        report_id: u8,
        data: &[u8],
        timestamp: Duration,
    ) -> Vec<Event> {
        let old_state = self.decoder.state().clone();
        if !self.decoder.handle(report_id, data, timestamp) {
            return Vec::new();
        }
        translate(&old_state, self.decoder.state())
    }

    /// Writes the given output state to the controller. Returns false if the
    /// report could not be encoded or sent. After too many consecutive send
    /// failures the device is marked as disconnected.
    pub fn write(&mut self, state: &OutputState) -> bool {
        let report = match self.encoder.encode(state) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("Unable to encode output report: {e}");
                return false;
            }
        };
        log::trace!(
            "Sending output report {:#04x}: {:02x?}",
            report.report_id,
            report.data
        );

        if let Err(e) = self.transport.send_report(report.report_id, &report.data) {
            self.send_failures += 1;
            log::warn!(
                "Failed to send output report ({}/{}): {e}",
                self.send_failures,
                self.config.disconnect_after_failures
            );
            if self.send_failures >= self.config.disconnect_after_failures {
                self.disconnect();
            }
            return false;
        }
        self.send_failures = 0;

        true
    }

    /// Handles input reports from the given stream and forwards the resulting
    /// events until the stream ends or the device disconnects.
    pub async fn run<S>(
        &mut self,
        mut reports: S,
        events: mpsc::Sender<Event>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>
    where
        S: Stream<Item = InputReportEvent> + Unpin,
    {
        let disconnect = self.disconnect.clone();
        loop {
            let report = tokio::select! {
                _ = disconnect.cancelled() => {
                    log::debug!("Device disconnected. Stopping input loop.");
                    break;
                }
                report = reports.next() => report,
            };
            let Some(report) = report else {
                log::debug!("Input report stream ended");
                break;
            };

            let translated =
                self.handle_input_report(report.report_id, &report.data, report.timestamp);
            for event in translated {
                events.send(event).await?;
            }
        }

        Ok(())
    }

    /// Feature report access for the current link
    pub fn feature_reports(&self) -> FeatureReports<'_, T> {
        FeatureReports::new(&self.transport, self.link())
            .with_report_size(self.config.feature_report_size)
    }

    /// Diagnostic commands, cancelled when the device disconnects
    pub fn diagnostics(&self) -> Diagnostics<'_, T> {
        Diagnostics::new(self.feature_reports(), self.disconnect.clone())
            .with_config(self.config.diagnostic.clone())
    }

    pub fn read_profile(&mut self, switch_button: SwitchButton) -> Result<Profile, ProfileError> {
        self.require_profiles()?;
        profile::read_profile(&self.feature_reports(), switch_button)
    }

    /// Saves the profile and returns the confirmation report. Taking `&mut
    /// self` keeps output reports from interleaving with the block writes.
    pub fn save_profile(&mut self, profile: &mut Profile) -> Result<Vec<u8>, ProfileError> {
        self.require_profiles()?;
        profile::save_profile(&self.feature_reports(), profile)
    }

    fn require_profiles(&self) -> Result<(), ProfileError> {
        let family = self.family();
        if !family.supports_profiles() {
            return Err(ProfileError::Unsupported(family));
        }
        Ok(())
    }
}
