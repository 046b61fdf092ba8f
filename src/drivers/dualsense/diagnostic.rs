//! Factory diagnostic protocol. A test command is written to feature report
//! 0x80 and its result is polled from feature report 0x81, possibly spread
//! over several chunks.
use std::{future, time::Duration};

use packed_struct::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::DiagnosticConfig;

use super::driver::{
    LinkType, FEATURE_REPORT_BT_PATCH, FEATURE_REPORT_FIRMWARE_INFO, FEATURE_REPORT_TEST_COMMAND,
    FEATURE_REPORT_TEST_RESULT, FEATURE_REPORT_VERIFY_RESULT, FEATURE_REPORT_VERIFY_START,
};
use super::hid_report::FirmwareInfoReport;
use super::transport::{FeatureReports, Transport, TransportError};

/// Result payload bytes carried by one reply
pub const CHUNK_SIZE: usize = 56;
/// Report id, device, action and status precede the payload
pub const RESULT_HEADER_SIZE: usize = 4;
/// Size of the firmware info report including the report id
pub const FIRMWARE_INFO_SIZE: usize = 64;

/// Subsystem addressed by a test command
#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum TestDeviceId {
    System = 1,
    Power = 2,
    Memory = 3,
    AnalogData = 4,
    Touch = 5,
    Audio = 6,
    AdaptiveTrigger = 7,
    Bullet = 8,
    Bluetooth = 9,
    Motion = 10,
    Trigger = 11,
    Stick = 12,
    Led = 13,
    BtPatch = 14,
    DspFw = 15,
    SpiderDspFw = 16,
    Finger = 17,
    PositionTracking = 19,
    BuiltinMicCalibData = 20,
}

/// Action ids. Their meaning depends on the device they are sent to.
pub mod action {
    pub const READ_BDADR: u8 = 2;
    pub const READ_PCBAID: u8 = 4;
    pub const GET_MCU_UNIQUE_ID: u8 = 9;
    pub const READ_PCBAID_FULL: u8 = 17;
    pub const READ_SERIAL_NUMBER: u8 = 19;
    pub const READ_ASSEMBLE_PARTS_INFO: u8 = 21;
    pub const READ_BATTERY_BARCODE: u8 = 24;
    pub const READ_VCM_LEFT_BARCODE: u8 = 26;
    pub const READ_VCM_RIGHT_BARCODE: u8 = 28;
    pub const READ_TRACEABILITY_INFO: u8 = 37;
}

/// Status byte of a result reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Idle,
    Running,
    /// Final chunk
    Complete,
    /// Another chunk follows
    CompleteContinued,
    Timeout,
    Unknown(u8),
}

impl From<u8> for TestStatus {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Complete,
            3 => Self::CompleteContinued,
            0xFF => Self::Timeout,
            code => Self::Unknown(code),
        }
    }
}

/// Outcome of a test command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestResult {
    Complete,
    /// The command could not be written
    SetFail,
    Fail,
    Timeout,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum DiagnosticError {
    #[error("Failed to send test command: {0}")]
    SetFail(TransportError),
    #[error("Failed to read test result: {0}")]
    ReadFail(TransportError),
    #[error("Test command failed with status {0:#04x}")]
    CommandFailed(u8),
    #[error("Timed out waiting for test result")]
    Timeout,
    #[error("Test command was cancelled")]
    Cancelled,
    #[error("Invalid reply: {0}")]
    InvalidReply(String),
}

impl DiagnosticError {
    pub fn result(&self) -> TestResult {
        match self {
            Self::SetFail(_) => TestResult::SetFail,
            Self::ReadFail(_) | Self::CommandFailed(_) | Self::InvalidReply(_) => TestResult::Fail,
            Self::Timeout => TestResult::Timeout,
            Self::Cancelled => TestResult::Cancelled,
        }
    }
}

/// A test command and the shape of its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCommand {
    pub device: TestDeviceId,
    pub action: u8,
    pub params: Vec<u8>,
    /// Total result length to reassemble
    pub result_length: usize,
    /// Bytes of echoed parameters at the start of every chunk payload
    pub ignore: usize,
}

impl TestCommand {
    pub fn new(device: TestDeviceId, action: u8, result_length: usize) -> Self {
        Self {
            device,
            action,
            params: Vec::new(),
            result_length,
            ignore: 0,
        }
    }

    /// Adds parameters to the command. The device echoes `ignore` bytes of
    /// them back ahead of each chunk.
    pub fn with_params(mut self, params: &[u8], ignore: usize) -> Self {
        self.params = params.to_vec();
        self.ignore = ignore.min(CHUNK_SIZE);
        self
    }

    fn chunk_size(&self) -> usize {
        CHUNK_SIZE - self.ignore
    }

    /// Returns true if the reply echoes this command
    fn matches(&self, reply: &[u8]) -> bool {
        reply.len() >= RESULT_HEADER_SIZE
            && reply[0] == FEATURE_REPORT_TEST_RESULT
            && reply[1] == self.device.to_primitive()
            && reply[2] == self.action
    }
}

/// Side of an adaptive trigger motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSide {
    Left,
    Right,
}

/// Manufacturing data of an adaptive trigger motor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerTraceability {
    pub serial: String,
    pub motor_info: String,
}

/// Outcome of the individual data verification handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    Successful,
    Fail,
    /// The device stayed busy for every retry
    RetryTimeout,
    StartError,
    GetError,
    NotSupported,
    Cancelled,
}

/// Decoded firmware info feature report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareInfo {
    pub build_date: String,
    pub build_time: String,
    pub firmware_type: u16,
    pub software_series: u16,
    pub hardware_info: u32,
    pub main_firmware_version: u32,
    pub device_info: [u8; 12],
    pub update_version: u16,
    pub update_image_info: u8,
    pub sbl_firmware_version: u32,
    pub dsp_firmware_version: u32,
    pub spider_dsp_firmware_version: u32,
}

impl FirmwareInfo {
    /// Parses a firmware info report, starting at the report id
    pub fn from_report(buf: &[u8]) -> Result<Self, DiagnosticError> {
        let size = FIRMWARE_INFO_SIZE;
        if buf.len() < size {
            return Err(DiagnosticError::InvalidReply(format!(
                "Firmware info is {} bytes, expected {size}",
                buf.len()
            )));
        }
        let report = FirmwareInfoReport::unpack_from_slice(&buf[..size])
            .map_err(|e| DiagnosticError::InvalidReply(e.to_string()))?;

        Ok(Self {
            build_date: decode_text(&report.build_date),
            build_time: decode_text(&report.build_time),
            firmware_type: report.firmware_type.to_primitive(),
            software_series: report.software_series.to_primitive(),
            hardware_info: report.hardware_info.to_primitive(),
            main_firmware_version: report.main_firmware_version.to_primitive(),
            device_info: report.device_info,
            update_version: report.update_version.to_primitive(),
            update_image_info: report.update_image_info,
            sbl_firmware_version: report.sbl_firmware_version.to_primitive(),
            dsp_firmware_version: report.dsp_firmware_version.to_primitive(),
            spider_dsp_firmware_version: report.spider_dsp_firmware_version.to_primitive(),
        })
    }
}

/// Formats a version as `major.minor.patch`
pub fn format_three_part_version(version: u32) -> String {
    format!(
        "{}.{}.{}",
        version >> 24,
        (version >> 16) & 0xFF,
        version & 0xFFFF
    )
}

/// Formats an update version as `XX.YY`
pub fn format_update_version(version: u16) -> String {
    format!("{:02X}.{:02X}", version >> 8, version & 0xFF)
}

/// Formats a DSP version as `XXXX_YYYY`
pub fn format_dsp_version(version: u32) -> String {
    format!("{:04X}_{:04X}", version >> 16, version & 0xFFFF)
}

/// Formats a 48-bit Bluetooth address, most significant byte first
pub fn format_bd_address(address: u64) -> String {
    (0..6)
        .rev()
        .map(|i| format!("{:02X}", (address >> (i * 8)) & 0xFF))
        .collect::<Vec<_>>()
        .join(":")
}

/// Decodes NUL padded text
fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .replace('\0', "")
        .trim_end()
        .to_string()
}

/// Reads a little-endian integer of up to 8 bytes
fn read_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .enumerate()
        .fold(0, |value, (i, b)| value | (*b as u64) << (i * 8))
}

/// Runs diagnostic commands against one device
pub struct Diagnostics<'a, T: Transport + ?Sized> {
    reports: FeatureReports<'a, T>,
    config: DiagnosticConfig,
    cancel: CancellationToken,
}

impl<'a, T: Transport + ?Sized> Diagnostics<'a, T> {
    /// Creates a runner that gives up when the given token is cancelled
    pub fn new(reports: FeatureReports<'a, T>, cancel: CancellationToken) -> Self {
        Self {
            reports,
            config: DiagnosticConfig::default(),
            cancel,
        }
    }

    pub fn with_config(mut self, config: DiagnosticConfig) -> Self {
        self.config = config;
        self
    }

    /// Sends the command and reassembles its result. The returned buffer is
    /// always `result_length` bytes long.
    pub async fn run(&self, command: &TestCommand) -> Result<Vec<u8>, DiagnosticError> {
        log::debug!(
            "Sending test command {:?}/{} with params {:02x?}",
            command.device,
            command.action,
            command.params
        );
        let mut data = vec![command.device.to_primitive(), command.action];
        data.extend_from_slice(&command.params);
        self.reports
            .send(FEATURE_REPORT_TEST_COMMAND, &data)
            .map_err(DiagnosticError::SetFail)?;

        let deadline = self.config.deadline().map(|d| Instant::now() + d);
        let mut result = vec![0u8; command.result_length];
        let mut filled = 0;
        let mut chunks = 0;
        loop {
            let (status, reply) = self.poll_reply(command, deadline).await?;
            let start = RESULT_HEADER_SIZE + command.ignore;
            let payload = reply.get(start..).unwrap_or_default();
            let len = command
                .chunk_size()
                .min(payload.len())
                .min(command.result_length - filled);
            result[filled..filled + len].copy_from_slice(&payload[..len]);
            filled += len;
            chunks += 1;

            if status == TestStatus::Complete {
                break;
            }
        }
        log::debug!(
            "Test command {:?}/{} completed with {chunks} chunk(s), {filled}/{} bytes",
            command.device,
            command.action,
            command.result_length
        );

        Ok(result)
    }

    /// Polls the result report until a reply to the command arrives
    async fn poll_reply(
        &self,
        command: &TestCommand,
        deadline: Option<Instant>,
    ) -> Result<(TestStatus, Vec<u8>), DiagnosticError> {
        loop {
            let reply = self
                .reports
                .receive(FEATURE_REPORT_TEST_RESULT)
                .map_err(DiagnosticError::ReadFail)?;

            if command.matches(&reply) {
                match TestStatus::from(reply[3]) {
                    TestStatus::Idle | TestStatus::Running => (),
                    status @ (TestStatus::Complete | TestStatus::CompleteContinued) => {
                        return Ok((status, reply));
                    }
                    status => {
                        log::warn!(
                            "Test command {:?}/{} failed: {status:?}",
                            command.device,
                            command.action
                        );
                        return Err(DiagnosticError::CommandFailed(reply[3]));
                    }
                }
            } else {
                log::trace!("Discarding unrelated test result: {reply:02x?}");
            }

            self.wait(self.config.poll_interval(), deadline).await?;
        }
    }

    /// Sleeps for the given duration unless cancelled or past the deadline
    async fn wait(&self, duration: Duration, deadline: Option<Instant>) -> Result<(), DiagnosticError> {
        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DiagnosticError::Cancelled),
            _ = expired => Err(DiagnosticError::Timeout),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Runs the command and converts the outcome into a [TestResult]
    pub async fn run_with_result(&self, command: &TestCommand) -> (TestResult, Option<Vec<u8>>) {
        match self.run(command).await {
            Ok(data) => (TestResult::Complete, Some(data)),
            Err(e) => {
                log::debug!("Test command failed: {e}");
                (e.result(), None)
            }
        }
    }

    pub async fn pcba_id(&self) -> Result<u64, DiagnosticError> {
        let command = TestCommand::new(TestDeviceId::System, action::READ_PCBAID, 6);
        Ok(read_le(&self.run(&command).await?))
    }

    /// Full PCBA id, stored reversed
    pub async fn pcba_id_full(&self) -> Result<String, DiagnosticError> {
        let command = TestCommand::new(TestDeviceId::System, action::READ_PCBAID_FULL, 24);
        let data = self.run(&command).await?;
        Ok(decode_text(&data).chars().rev().collect())
    }

    pub async fn serial_number(&self) -> Result<String, DiagnosticError> {
        let command = TestCommand::new(TestDeviceId::System, action::READ_SERIAL_NUMBER, 32);
        Ok(decode_text(&self.run(&command).await?))
    }

    pub async fn assembled_parts_info(&self) -> Result<String, DiagnosticError> {
        let command = TestCommand::new(TestDeviceId::System, action::READ_ASSEMBLE_PARTS_INFO, 32);
        Ok(hex::encode_upper(&self.run(&command).await?))
    }

    pub async fn battery_barcode(&self) -> Result<String, DiagnosticError> {
        let command = TestCommand::new(TestDeviceId::System, action::READ_BATTERY_BARCODE, 32);
        Ok(decode_text(&self.run(&command).await?))
    }

    /// Barcodes of the left and right voice coil motors
    pub async fn vcm_barcodes(&self) -> Result<(String, String), DiagnosticError> {
        let left = TestCommand::new(TestDeviceId::System, action::READ_VCM_LEFT_BARCODE, 32);
        let right = TestCommand::new(TestDeviceId::System, action::READ_VCM_RIGHT_BARCODE, 32);
        let left = decode_text(&self.run(&left).await?);
        let right = decode_text(&self.run(&right).await?);
        Ok((left, right))
    }

    pub async fn mcu_unique_id(&self) -> Result<u64, DiagnosticError> {
        let command = TestCommand::new(TestDeviceId::System, action::GET_MCU_UNIQUE_ID, 9);
        let data = self.run(&command).await?;
        if data[0] != 0 {
            return Err(DiagnosticError::InvalidReply(format!(
                "MCU unique id reply has status {:#04x}",
                data[0]
            )));
        }
        Ok(read_le(&data[1..9]))
    }

    pub async fn bluetooth_address(&self) -> Result<u64, DiagnosticError> {
        let command = TestCommand::new(TestDeviceId::Bluetooth, action::READ_BDADR, 6);
        Ok(read_le(&self.run(&command).await?))
    }

    pub async fn trigger_traceability(
        &self,
        side: TriggerSide,
    ) -> Result<TriggerTraceability, DiagnosticError> {
        let param = match side {
            TriggerSide::Left => 1,
            TriggerSide::Right => 2,
        };
        let command = TestCommand::new(
            TestDeviceId::AdaptiveTrigger,
            action::READ_TRACEABILITY_INFO,
            43,
        )
        .with_params(&[param], 2);
        let data = self.run(&command).await?;
        if data[0] != 0 {
            return Err(DiagnosticError::InvalidReply(format!(
                "Trigger traceability reply has status {:#04x}",
                data[0]
            )));
        }

        Ok(TriggerTraceability {
            serial: hex::encode_upper(&data[12..19]),
            motor_info: decode_text(&data[19..27]),
        })
    }

    pub fn firmware_info(&self) -> Result<FirmwareInfo, DiagnosticError> {
        let buf = self
            .reports
            .receive(FEATURE_REPORT_FIRMWARE_INFO)
            .map_err(DiagnosticError::ReadFail)?;
        FirmwareInfo::from_report(&buf)
    }

    pub fn bt_patch_version(&self) -> Result<u32, DiagnosticError> {
        let buf = self
            .reports
            .receive(FEATURE_REPORT_BT_PATCH)
            .map_err(DiagnosticError::ReadFail)?;
        if buf.first() != Some(&FEATURE_REPORT_BT_PATCH) || buf.len() < 35 {
            return Err(DiagnosticError::InvalidReply(format!(
                "Unexpected Bluetooth patch report: {buf:02x?}"
            )));
        }
        Ok(read_le(&buf[31..35]) as u32)
    }

    /// Asks the device to verify its individual data and waits for the
    /// verdict
    pub async fn verify_individual_data(&self) -> VerifyStatus {
        if self.reports.link() != LinkType::Usb {
            return VerifyStatus::NotSupported;
        }
        if let Err(e) = self.reports.send(FEATURE_REPORT_VERIFY_START, &[2, 0]) {
            log::warn!("Failed to start individual data verification: {e}");
            return VerifyStatus::StartError;
        }

        let interval = self.config.verify_interval();
        if self.wait(interval, None).await.is_err() {
            return VerifyStatus::Cancelled;
        }

        let mut retries = 0;
        loop {
            let reply = match self.reports.receive(FEATURE_REPORT_VERIFY_RESULT) {
                Ok(reply) => reply,
                Err(e) => {
                    log::warn!("Failed to read individual data verification: {e}");
                    return VerifyStatus::GetError;
                }
            };
            match reply.get(2) {
                Some(1) => return VerifyStatus::Successful,
                Some(240) => {
                    retries += 1;
                    if retries >= self.config.verify_retry_limit {
                        return VerifyStatus::RetryTimeout;
                    }
                    log::trace!("Individual data verification busy, retry {retries}");
                    if self.wait(interval, None).await.is_err() {
                        return VerifyStatus::Cancelled;
                    }
                }
                _ => return VerifyStatus::Fail,
            }
        }
    }
}
