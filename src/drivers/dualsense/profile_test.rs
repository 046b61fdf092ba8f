use std::error::Error;

use crate::drivers::checksum::{verify_checksum, FEATURE_REPORT_SEED};
use crate::drivers::dualsense::{
    curve::{CurvePreset, JoystickCurve},
    driver::LinkType,
    profile::{
        profile_checksum, read_profile, save_profile, FieldCodec, Intensity, JoystickProfile,
        Profile, ProfileBlocks, ProfileError, SwitchButton, TriggerDeadzone, ASSIGNMENT,
        CHECKSUM, CHECKSUM_COVERAGE, CHECKSUM_RANGES, PROFILE_BLOCK_SIZE, PROFILE_LAYOUT,
        UNASSIGNED_MARKER,
    },
    transport::{mock::MockTransport, FeatureReports},
};

fn sample_profile() -> Profile {
    let mut profile = Profile::new(SwitchButton::Square, "Racing");
    profile.trigger_deadzone = TriggerDeadzone::Split {
        left: [10, 90],
        right: [5, 100],
    };
    profile.left_joystick = JoystickProfile::from_preset(CurvePreset::Quick, 0.3, 2);
    profile.right_joystick = JoystickProfile::from_preset(CurvePreset::Precise, 0.12, -4);
    profile.vibration_intensity = Intensity::Weak;
    profile.trigger_effect_intensity = Intensity::Off;
    profile
}

#[tokio::test]
async fn test_layout_bounds() -> Result<(), Box<dyn Error>> {
    for (i, a) in PROFILE_LAYOUT.iter().enumerate() {
        assert!(a.end() <= PROFILE_BLOCK_SIZE, "{} exceeds its block", a.name);
        for b in PROFILE_LAYOUT.iter().skip(i + 1) {
            if a.block != b.block {
                continue;
            }
            let overlaps = a.offset < b.end() && b.offset < a.end();
            assert!(!overlaps, "{} overlaps {}", a.name, b.name);
        }
    }

    let coverage: usize = CHECKSUM_RANGES.iter().map(|(_, s, e)| e - s).sum();
    assert_eq!(coverage, CHECKSUM_COVERAGE);
    for (block, start, end) in CHECKSUM_RANGES {
        let covers_checksum =
            block == CHECKSUM.block && start < CHECKSUM.end() && CHECKSUM.offset < end;
        assert!(!covers_checksum, "checksum must not cover itself");
    }
    assert_eq!(CHECKSUM.codec, FieldCodec::Crc32);

    Ok(())
}

#[tokio::test]
async fn test_profile_round_trip() -> Result<(), Box<dyn Error>> {
    let profile = sample_profile();
    let blocks = profile.to_blocks();
    for block in blocks.iter() {
        assert_eq!(block[0], 0x60, "every block carries the header");
    }
    assert_eq!(blocks[0][2], 0x01);
    assert_eq!(blocks[1][1], 0x01);
    assert_eq!(blocks[2][1], 0x02);

    let decoded = Profile::from_blocks(blocks)?;
    println!("Decoded profile: {decoded:?}");
    assert!(decoded.checksum_valid());
    assert!(decoded.assigned);
    assert_eq!(decoded.id, 0x60);
    assert_eq!(decoded.switch_button, SwitchButton::Square);
    assert_eq!(decoded.label, "Racing");
    assert_eq!(decoded.unique_id, profile.unique_id);
    assert_eq!(decoded.trigger_deadzone, profile.trigger_deadzone);
    assert_eq!(decoded.left_joystick, profile.left_joystick);
    assert_eq!(decoded.right_joystick, profile.right_joystick);
    assert_eq!(decoded.left_joystick.deadzone(), 0.3);
    assert_eq!(decoded.left_joystick.adjustment(), Some(2));
    assert_eq!(decoded.right_joystick.deadzone(), 0.12);
    assert_eq!(decoded.right_joystick.adjustment(), Some(-4));
    assert_eq!(decoded.vibration_intensity, Intensity::Weak);
    assert_eq!(decoded.trigger_effect_intensity, Intensity::Off);

    // Re-encoding a decoded profile is stable
    assert_eq!(decoded.to_blocks(), blocks);

    Ok(())
}

#[tokio::test]
async fn test_unified_deadzone() -> Result<(), Box<dyn Error>> {
    let mut profile = sample_profile();
    profile.trigger_deadzone = TriggerDeadzone::Unified { range: [20, 80] };
    let decoded = Profile::from_blocks(profile.to_blocks())?;
    assert_eq!(decoded.trigger_deadzone, TriggerDeadzone::Unified { range: [20, 80] });

    Ok(())
}

#[tokio::test]
async fn test_label_truncated() -> Result<(), Box<dyn Error>> {
    let label = "x".repeat(50);
    let profile = Profile::new(SwitchButton::Cross, &label);
    let decoded = Profile::from_blocks(profile.to_blocks())?;
    assert_eq!(decoded.label, "x".repeat(40));

    Ok(())
}

#[tokio::test]
async fn test_label_truncated_at_char_boundary() -> Result<(), Box<dyn Error>> {
    // 39 units plus a surrogate pair does not fit
    let label = format!("{}\u{1F3CE}", "x".repeat(39));
    let profile = Profile::new(SwitchButton::Cross, &label);
    let decoded = Profile::from_blocks(profile.to_blocks())?;
    assert_eq!(decoded.label, "x".repeat(39));

    let label = format!("{}\u{1F3CE}", "x".repeat(38));
    let profile = Profile::new(SwitchButton::Cross, &label);
    let decoded = Profile::from_blocks(profile.to_blocks())?;
    assert_eq!(decoded.label, label);

    Ok(())
}

#[tokio::test]
async fn test_point_count_follows_preset() -> Result<(), Box<dyn Error>> {
    let mut profile = sample_profile();
    profile.left_joystick.preset = CurvePreset::Steady;
    profile.left_joystick.point_count = 0;
    profile.right_joystick.point_count = 0xFF;

    let decoded = Profile::from_blocks(profile.to_blocks())?;
    assert_eq!(
        decoded.left_joystick.point_count,
        JoystickCurve::for_preset(CurvePreset::Steady).point_count
    );
    assert_eq!(
        decoded.right_joystick.point_count,
        JoystickCurve::for_preset(CurvePreset::Precise).point_count
    );

    Ok(())
}

#[tokio::test]
async fn test_unassigned_profile() -> Result<(), Box<dyn Error>> {
    let mut profile = sample_profile();
    profile.assigned = false;
    let blocks = profile.to_blocks();
    assert_eq!(ASSIGNMENT.read_u8(&blocks), UNASSIGNED_MARKER);
    assert_eq!(blocks[0][6..60], [0u8; 54], "label is not written");

    let decoded = Profile::from_blocks(blocks)?;
    assert!(!decoded.assigned);
    assert_eq!(decoded.label, "");
    assert_eq!(decoded.left_joystick, JoystickProfile::default());
    assert_eq!(decoded.unique_id, profile.unique_id);

    // Assigning the slot again clears the marker
    let mut reassigned = decoded.clone();
    reassigned.assigned = true;
    assert_eq!(ASSIGNMENT.read_u8(&reassigned.to_blocks()), 0x00);

    Ok(())
}

#[tokio::test]
async fn test_unmodeled_bytes_preserved() -> Result<(), Box<dyn Error>> {
    let mut blocks: ProfileBlocks = sample_profile().to_blocks();
    blocks[0][4] = 0xAB;
    blocks[1][62] = 0xCD;
    blocks[2][20] = 0xEF;
    blocks[2][62] = 0x42;

    let mut decoded = Profile::from_blocks(blocks)?;
    assert!(!decoded.checksum_valid(), "edited blocks no longer match");
    decoded.label = "Renamed".to_string();

    let encoded = decoded.to_blocks();
    assert_eq!(encoded[0][4], 0xAB);
    assert_eq!(encoded[1][62], 0xCD);
    assert_eq!(encoded[2][20], 0xEF);
    assert_eq!(encoded[2][62], 0x42);
    assert_eq!(
        CHECKSUM.read(&encoded),
        profile_checksum(&encoded).to_le_bytes()
    );
    assert_eq!(Profile::from_blocks(encoded)?.label, "Renamed");

    Ok(())
}

#[tokio::test]
async fn test_decode_errors() -> Result<(), Box<dyn Error>> {
    let two_blocks = vec![vec![0x70u8; 64]; 2];
    assert!(matches!(
        Profile::decode(&two_blocks),
        Err(ProfileError::Structure(_))
    ));

    let short_block = vec![vec![0x70u8; 64], vec![0x70u8; 63], vec![0x70u8; 64]];
    assert!(matches!(
        Profile::decode(&short_block),
        Err(ProfileError::Structure(_))
    ));

    let unknown = vec![vec![0u8; 64]; 3];
    assert!(matches!(
        Profile::decode(&unknown),
        Err(ProfileError::UnknownHeader(0))
    ));

    Ok(())
}

#[tokio::test]
async fn test_switch_button_tables() -> Result<(), Box<dyn Error>> {
    for button in SwitchButton::ALL {
        assert_eq!(SwitchButton::from_header(button.code()), Some(button));
        assert_eq!(SwitchButton::from_header(button.slot_report_id()), Some(button));
    }
    assert_eq!(SwitchButton::Square.readback_report_id(), Some(0x63));
    assert_eq!(SwitchButton::Cross.readback_report_id(), Some(0x64));
    assert_eq!(SwitchButton::Circle.readback_report_id(), Some(0x65));
    assert_eq!(SwitchButton::Triangle.readback_report_id(), None);

    assert_eq!(Intensity::from_vibration_code(0x42), Intensity::Strong);
    assert_eq!(Intensity::from_trigger_effect_code(0x06), Intensity::Medium);

    Ok(())
}

#[tokio::test]
async fn test_save_profile() -> Result<(), Box<dyn Error>> {
    let transport = MockTransport::new();
    transport.queue_reply(0x63, vec![0x63, 0x01]);
    let reports = FeatureReports::new(&transport, LinkType::Usb);

    let mut profile = sample_profile();
    let confirmation = save_profile(&reports, &mut profile)?;
    assert_eq!(confirmation, vec![0x63, 0x01]);

    let sent = transport.sent_features();
    assert_eq!(sent.len(), 3);
    for (i, (report_id, data)) in sent.iter().enumerate() {
        assert_eq!(*report_id, 0x60, "block {i} is written to the header code");
        assert_eq!(data.len(), PROFILE_BLOCK_SIZE - 1);
        assert_eq!(data[..], profile.raw_blocks()[i][1..]);
    }
    assert!(profile.updated_at > 0, "save stamps the time");
    assert!(profile.checksum_valid());

    Ok(())
}

#[tokio::test]
async fn test_save_profile_bluetooth() -> Result<(), Box<dyn Error>> {
    let transport = MockTransport::new();
    transport.queue_reply(0x65, vec![0x65, 0x01]);
    let reports = FeatureReports::new(&transport, LinkType::Bluetooth);

    let mut profile = Profile::new(SwitchButton::Circle, "Rally");
    save_profile(&reports, &mut profile)?;

    let sent = transport.sent_features();
    assert_eq!(sent.len(), 3);
    for (i, (report_id, data)) in sent.iter().enumerate() {
        assert_eq!(*report_id, 0x62);
        assert_eq!(data.len(), PROFILE_BLOCK_SIZE - 1);
        assert!(
            verify_checksum(&[FEATURE_REPORT_SEED, *report_id], data),
            "block {i} carries the feature report checksum"
        );
        let body = data.len() - 4;
        assert_eq!(data[..body], profile.raw_blocks()[i][1..body + 1]);
    }
    assert!(profile.checksum_valid());

    Ok(())
}

#[tokio::test]
async fn test_save_read_only_slot() -> Result<(), Box<dyn Error>> {
    let transport = MockTransport::new();
    let reports = FeatureReports::new(&transport, LinkType::Usb);

    let mut profile = Profile::new(SwitchButton::Triangle, "Default");
    let result = save_profile(&reports, &mut profile);
    assert!(matches!(
        result,
        Err(ProfileError::ReadOnlySlot(SwitchButton::Triangle))
    ));
    assert!(transport.sent().is_empty(), "nothing may be written");

    Ok(())
}

#[tokio::test]
async fn test_read_profile() -> Result<(), Box<dyn Error>> {
    let transport = MockTransport::new();
    let blocks = Profile::new(SwitchButton::Circle, "Aim").to_blocks();
    for (i, block) in blocks.iter().enumerate() {
        transport.queue_reply(0x79 + i as u8, block.to_vec());
    }
    let reports = FeatureReports::new(&transport, LinkType::Usb);

    let profile = read_profile(&reports, SwitchButton::Circle)?;
    assert_eq!(profile.switch_button, SwitchButton::Circle);
    assert_eq!(profile.label, "Aim");
    assert!(profile.checksum_valid());

    let missing = read_profile(&reports, SwitchButton::Triangle);
    assert!(matches!(missing, Err(ProfileError::Transport(_))));

    Ok(())
}

#[tokio::test]
async fn test_profile_serde() -> Result<(), Box<dyn Error>> {
    let profile = Profile::from_blocks(sample_profile().to_blocks())?;
    let json = serde_json::to_string(&profile)?;
    let parsed: Profile = serde_json::from_str(&json)?;
    assert_eq!(parsed, profile);
    assert_eq!(parsed.raw_blocks(), profile.raw_blocks());

    Ok(())
}
