use std::collections::HashMap;
use std::error::Error;
use std::sync::Mutex;
use std::time::Duration;

use dualsense_hid::drivers::checksum::{verify_checksum, OUTPUT_REPORT_SEED};
use dualsense_hid::drivers::dualsense::curve::CurvePreset;
use dualsense_hid::drivers::dualsense::driver::{DeviceFamily, Driver, LinkType};
use dualsense_hid::drivers::dualsense::input::Buttons;
use dualsense_hid::drivers::dualsense::output::OutputState;
use dualsense_hid::drivers::dualsense::profile::{
    Intensity, JoystickProfile, Profile, SwitchButton, TriggerDeadzone,
};
use dualsense_hid::drivers::dualsense::transport::{Transport, TransportError};

/// Simulated DualSense Edge that stores written profiles in its slots
#[derive(Default)]
struct FakeEdge {
    features: Mutex<HashMap<u8, Vec<u8>>>,
    writes: Mutex<HashMap<u8, u8>>,
    outputs: Mutex<Vec<(u8, Vec<u8>)>>,
}

impl FakeEdge {
    /// Maps a profile write code to the first report of its slot
    fn slot_for_code(code: u8) -> Option<u8> {
        match code {
            0x60 => Some(0x73),
            0x61 => Some(0x76),
            0x62 => Some(0x79),
            0x63 => Some(0x70),
            _ => None,
        }
    }
}

impl Transport for FakeEdge {
    fn send_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        self.outputs.lock().unwrap().push((report_id, data.to_vec()));
        Ok(())
    }

    fn send_feature_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        let Some(slot) = Self::slot_for_code(report_id) else {
            return Err(TransportError::Other(format!("unexpected report {report_id:#04x}")));
        };
        let mut block = vec![report_id];
        block.extend_from_slice(data);
        // Blocks arrive in order and fill the three reports of the slot
        let mut writes = self.writes.lock().unwrap();
        let count = writes.entry(report_id).or_default();
        let index = *count % 3;
        *count += 1;
        self.features.lock().unwrap().insert(slot + index, block);
        Ok(())
    }

    fn receive_feature_report(&self, report_id: u8) -> Result<Vec<u8>, TransportError> {
        if matches!(report_id, 0x63..=0x65) {
            return Ok(vec![report_id, 0x00]);
        }
        self.features
            .lock()
            .unwrap()
            .get(&report_id)
            .cloned()
            .ok_or(TransportError::Disconnected)
    }
}

#[tokio::test]
async fn test_profile_save_and_read() -> Result<(), Box<dyn Error>> {
    let mut driver = Driver::new(FakeEdge::default(), DeviceFamily::DualSenseEdge, LinkType::Usb);

    let mut profile = Profile::new(SwitchButton::Circle, "Driving");
    profile.left_joystick = JoystickProfile::from_preset(CurvePreset::Dynamic, 0.05, 1);
    profile.trigger_deadzone = TriggerDeadzone::Unified { range: [15, 85] };
    profile.vibration_intensity = Intensity::Medium;
    driver.save_profile(&mut profile)?;

    let stored = driver.read_profile(SwitchButton::Circle)?;
    println!("Stored profile: {stored:?}");
    assert!(stored.checksum_valid());
    assert_eq!(stored.label, "Driving");
    assert_eq!(stored.left_joystick.preset, CurvePreset::Dynamic);
    assert_eq!(stored.left_joystick.adjustment(), Some(1));
    assert_eq!(stored.trigger_deadzone, profile.trigger_deadzone);
    assert_eq!(stored.vibration_intensity, Intensity::Medium);
    assert_eq!(stored.updated_at, profile.updated_at);

    Ok(())
}

#[tokio::test]
async fn test_bluetooth_session() -> Result<(), Box<dyn Error>> {
    let mut driver = Driver::new(FakeEdge::default(), DeviceFamily::DualSense, LinkType::Bluetooth);

    // Reduced report sent before the full report mode is enabled
    let events = driver.handle_input_report(
        0x01,
        &[0x80, 0x80, 0x80, 0x80, 0x88, 0x00, 0x00, 0x00, 0x00],
        Duration::ZERO,
    );
    assert!(!events.is_empty());
    assert_eq!(driver.state().buttons, Buttons::TRIANGLE);

    let state = OutputState {
        lightbar: [0x00, 0x00, 0xFF],
        ..Default::default()
    };
    for _ in 0..3 {
        assert!(driver.write(&state));
    }

    let outputs = driver.transport().outputs.lock().unwrap().clone();
    assert_eq!(outputs.len(), 3);
    for (i, (report_id, data)) in outputs.iter().enumerate() {
        assert_eq!(*report_id, 0x31);
        assert_eq!(data[0] >> 4, i as u8);
        assert!(verify_checksum(&[OUTPUT_REPORT_SEED, 0x31], data));
    }

    Ok(())
}
