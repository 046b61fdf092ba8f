//! Abstract HID transport used by the codec. Concrete implementations (hidraw,
//! hidapi, WebHID bridges) live outside this crate.
use std::{io, time::Duration};

use thiserror::Error;

use crate::drivers::checksum::fill_feature_report_checksum;

use super::driver::{LinkType, FEATURE_REPORT_SIZE};

/// Errors raised by a transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Device is disconnected")]
    Disconnected,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Transport error: {0}")]
    Other(String),
}

/// Input report delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputReportEvent {
    pub report_id: u8,
    /// Report data without the report id
    pub data: Vec<u8>,
    /// Time the report was received, relative to an arbitrary epoch
    pub timestamp: Duration,
}

impl InputReportEvent {
    pub fn new(report_id: u8, data: Vec<u8>, timestamp: Duration) -> Self {
        Self {
            report_id,
            data,
            timestamp,
        }
    }
}

/// Capability to exchange reports with one HID device
pub trait Transport {
    /// Writes an output report. `data` excludes the report id.
    fn send_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError>;

    /// Writes a feature report. `data` excludes the report id.
    fn send_feature_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError>;

    /// Reads a feature report. The returned buffer starts with the report id.
    fn receive_feature_report(&self, report_id: u8) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        (**self).send_report(report_id, data)
    }

    fn send_feature_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        (**self).send_feature_report(report_id, data)
    }

    fn receive_feature_report(&self, report_id: u8) -> Result<Vec<u8>, TransportError> {
        (**self).receive_feature_report(report_id)
    }
}

/// Sends fixed size feature reports, sealing them with a checksum trailer
/// when the device is connected over Bluetooth.
#[derive(Debug)]
pub struct FeatureReports<'a, T: Transport + ?Sized> {
    transport: &'a T,
    link: LinkType,
    report_size: usize,
}

impl<'a, T: Transport + ?Sized> FeatureReports<'a, T> {
    pub fn new(transport: &'a T, link: LinkType) -> Self {
        Self {
            transport,
            link,
            report_size: FEATURE_REPORT_SIZE,
        }
    }

    /// Overrides the padded data size of outgoing reports
    pub fn with_report_size(mut self, report_size: usize) -> Self {
        self.report_size = report_size;
        self
    }

    pub fn link(&self) -> LinkType {
        self.link
    }

    /// Pads the data to the report size and writes it
    pub fn send(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        let mut buf = vec![0u8; self.report_size.max(data.len())];
        buf[..data.len()].copy_from_slice(data);
        if self.link == LinkType::Bluetooth {
            fill_feature_report_checksum(report_id, &mut buf);
        }
        log::trace!("Sending feature report {report_id:#04x}: {buf:02x?}");
        self.transport.send_feature_report(report_id, &buf)
    }

    pub fn receive(&self, report_id: u8) -> Result<Vec<u8>, TransportError> {
        let buf = self.transport.receive_feature_report(report_id)?;
        log::trace!("Received feature report {report_id:#04x}: {buf:02x?}");
        Ok(buf)
    }
}

#[cfg(test)]
pub mod mock {
    //! In-memory transport for exercising the protocols in tests
    use std::{
        collections::{HashMap, VecDeque},
        sync::Mutex,
    };

    use super::{Transport, TransportError};

    /// A report written to the mock transport
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Output(u8, Vec<u8>),
        Feature(u8, Vec<u8>),
    }

    #[derive(Debug, Default)]
    pub struct MockTransport {
        sent: Mutex<Vec<Sent>>,
        replies: Mutex<HashMap<u8, VecDeque<Vec<u8>>>>,
        fail_sends: Mutex<bool>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a feature report reply. Once only one reply is left for an
        /// id it is repeated on every read.
        pub fn queue_reply(&self, report_id: u8, data: Vec<u8>) {
            let mut replies = self.replies.lock().unwrap();
            replies.entry(report_id).or_default().push_back(data);
        }

        pub fn set_fail_sends(&self, fail: bool) {
            *self.fail_sends.lock().unwrap() = fail;
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        pub fn sent_features(&self) -> Vec<(u8, Vec<u8>)> {
            self.sent()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Feature(id, data) => Some((id, data)),
                    Sent::Output(..) => None,
                })
                .collect()
        }

        pub fn sent_outputs(&self) -> Vec<(u8, Vec<u8>)> {
            self.sent()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Output(id, data) => Some((id, data)),
                    Sent::Feature(..) => None,
                })
                .collect()
        }
    }

    impl Transport for MockTransport {
        fn send_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
            if *self.fail_sends.lock().unwrap() {
                return Err(TransportError::Disconnected);
            }
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Output(report_id, data.to_vec()));
            Ok(())
        }

        fn send_feature_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
            if *self.fail_sends.lock().unwrap() {
                return Err(TransportError::Disconnected);
            }
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Feature(report_id, data.to_vec()));
            Ok(())
        }

        fn receive_feature_report(&self, report_id: u8) -> Result<Vec<u8>, TransportError> {
            let mut replies = self.replies.lock().unwrap();
            let Some(queue) = replies.get_mut(&report_id) else {
                return Err(TransportError::Other(format!(
                    "No reply queued for report {report_id:#04x}"
                )));
            };
            let reply = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            reply.ok_or_else(|| TransportError::Other("Empty reply queue".to_string()))
        }
    }
}
