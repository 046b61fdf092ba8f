use std::error::Error;

use crate::drivers::{
    checksum::{verify_checksum, OUTPUT_REPORT_SEED},
    dualsense::{
        driver::{DeviceFamily, LinkType},
        hid_report::LightBrightness,
        output::{player_led_pattern, OutputReportEncoder, OutputState, TriggerEffect},
    },
};

fn sample_state() -> OutputState {
    OutputState {
        mic_led: true,
        lightbar: [0x11, 0x22, 0x33],
        player_led: 2,
        player_led_brightness: LightBrightness::Dim,
        motor_left: 0xAA,
        motor_right: 0x55,
        left_trigger: TriggerEffect::Resistance {
            start: 0x20,
            force: 0xC0,
        },
        right_trigger: TriggerEffect::Off,
    }
}

#[tokio::test]
async fn test_encode_usb() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut encoder = OutputReportEncoder::new(DeviceFamily::DualSense, LinkType::Usb);
    let report = encoder.encode(&sample_state())?;
    println!("USB output report: {:02x?}", report.data);

    assert_eq!(report.report_id, 0x02);
    assert_eq!(report.data.len(), 47);
    let data = &report.data;
    assert_eq!(data[0], 0x0F, "trigger, rumble and emulation flags");
    assert_eq!(data[1], 0x17, "indicator, color, power save and mute flags");
    assert_eq!(data[2], 0x55, "right motor");
    assert_eq!(data[3], 0xAA, "left motor");
    assert_eq!(data[8], 0x01, "mute light on");
    assert_eq!(data[10..21], [0u8; 11], "right trigger off");
    assert_eq!(data[21..24], [0x01, 0x20, 0xC0], "left trigger resistance");
    assert_eq!(data[38] & 0x01, 0x01, "brightness change allowed");
    assert_eq!(data[42], 0x02, "dim brightness");
    assert_eq!(data[43], 0x0A, "player 2 pattern");
    assert_eq!(data[44..47], [0x11, 0x22, 0x33]);

    // USB reports carry no sequence counter
    assert_eq!(encoder.sequence(), 0);

    Ok(())
}

#[tokio::test]
async fn test_encode_bluetooth() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut encoder = OutputReportEncoder::new(DeviceFamily::DualSense, LinkType::Bluetooth);
    let state = sample_state();

    for expected in 0..20u8 {
        let report = encoder.encode(&state)?;
        assert_eq!(report.report_id, 0x31);
        assert_eq!(report.data.len(), 77);
        assert_eq!(report.data[0] >> 4, expected % 16, "sequence number");
        assert_eq!(report.data[1], 0x10, "tag");
        assert_eq!(report.data[2], 0x0F);
        assert_eq!(report.data[3], 0x17);
        assert_eq!(report.data[2 + 44..2 + 47], [0x11, 0x22, 0x33]);
        assert!(
            verify_checksum(&[OUTPUT_REPORT_SEED, 0x31], &report.data),
            "checksum trailer should match"
        );
    }
    assert_eq!(encoder.sequence(), 4);

    Ok(())
}

#[tokio::test]
async fn test_encode_dualshock4() -> Result<(), Box<dyn Error + Send + Sync>> {
    let state = sample_state();

    let mut encoder = OutputReportEncoder::new(DeviceFamily::DualShock4, LinkType::Usb);
    let report = encoder.encode(&state)?;
    assert_eq!(report.report_id, 0x05);
    assert_eq!(report.data.len(), 31);
    assert_eq!(report.data[0], 0x03, "rumble and color flags");
    assert_eq!(report.data[3], 0x55);
    assert_eq!(report.data[4], 0xAA);
    assert_eq!(report.data[5..8], [0x11, 0x22, 0x33]);

    let mut encoder = OutputReportEncoder::new(DeviceFamily::DualShock4, LinkType::Bluetooth);
    let report = encoder.encode(&state)?;
    assert_eq!(report.report_id, 0x11);
    assert_eq!(report.data.len(), 77);
    assert_eq!(report.data[0], 0xC4);
    assert_eq!(report.data[2], 0x03);
    assert!(verify_checksum(&[OUTPUT_REPORT_SEED, 0x11], &report.data));

    Ok(())
}

#[tokio::test]
async fn test_encode_disconnected() -> Result<(), Box<dyn Error>> {
    let mut encoder = OutputReportEncoder::new(DeviceFamily::DualSense, LinkType::Disconnected);
    assert!(encoder.encode(&OutputState::default()).is_err());

    Ok(())
}

#[tokio::test]
async fn test_trigger_effects() -> Result<(), Box<dyn Error>> {
    assert_eq!(TriggerEffect::Off.to_bytes(), [0u8; 11]);
    assert_eq!(TriggerEffect::Off.mode(), 0);

    let soft = TriggerEffect::Soft {
        start: 0x10,
        end: 0x80,
        force: 0xFF,
    };
    assert_eq!(soft.mode(), 2);
    assert_eq!(soft.to_bytes()[..4], [0x02, 0x10, 0x80, 0xFF]);

    let automatic = TriggerEffect::Automatic {
        start: 0x40,
        force: 0x90,
        frequency: 0x1E,
    };
    assert_eq!(automatic.mode(), 3);
    assert_eq!(automatic.to_bytes()[..4], [0x06, 0x1E, 0x90, 0x40]);
    assert_eq!(automatic.to_bytes()[4..], [0u8; 7]);

    Ok(())
}

#[tokio::test]
async fn test_player_led_pattern() -> Result<(), Box<dyn Error>> {
    assert_eq!(player_led_pattern(0), 0x00);
    assert_eq!(player_led_pattern(1), 0x04);
    assert_eq!(player_led_pattern(5), 0x1F);
    assert_eq!(player_led_pattern(200), 0x1F, "out of range players light all");

    Ok(())
}
