use std::error::Error;

use packed_struct::{prelude::*, PackedStructSlice};

use crate::drivers::dualsense::hid_report::{
    BluetoothPackedOutputReport, Direction, FirmwareInfoReport, TouchFingerData,
    UsbPackedOutputReport,
};

#[tokio::test]
async fn test_ds_hid() -> Result<(), Box<dyn Error>> {
    let mut finger = TouchFingerData::default();
    println!("Before Report: {finger}");
    assert!(!finger.is_touching(), "Default contact should be inactive");
    finger.set_y(1068);
    finger.set_x(1919);
    assert_eq!(finger.get_y(), 1068);
    assert_eq!(finger.get_x(), 1919);

    println!("After Report: {finger}");
    assert_eq!(finger.pack_to_vec().unwrap(), vec![0x80, 0x7F, 0xC7, 0x42]);

    Ok(())
}

#[tokio::test]
async fn test_touch_unpack() -> Result<(), Box<dyn Error>> {
    let finger = TouchFingerData::unpack_from_slice(&[0x05, 0x7F, 0xC7, 0x42])?;
    assert!(finger.is_touching());
    assert_eq!(finger.get_id(), 5);
    assert_eq!(finger.get_x(), 1919);
    assert_eq!(finger.get_y(), 1068);

    Ok(())
}

#[tokio::test]
async fn test_direction_nibble() -> Result<(), Box<dyn Error>> {
    assert_eq!(Direction::from_nibble(0), Direction::North);
    assert_eq!(Direction::from_nibble(2), Direction::East);
    assert_eq!(Direction::from_nibble(4), Direction::South);
    assert_eq!(Direction::from_nibble(6), Direction::West);
    // Only the low nibble carries the direction
    assert_eq!(Direction::from_nibble(0x23), Direction::SouthEast);
    for value in 8..16 {
        assert_eq!(
            Direction::from_nibble(value),
            Direction::None,
            "Nibble {value} should be released"
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_output_report_headers() -> Result<(), Box<dyn Error>> {
    let usb = UsbPackedOutputReport::default().pack()?;
    assert_eq!(usb.len(), 48);
    assert_eq!(usb[0], 0x02);

    let bt = BluetoothPackedOutputReport {
        seq_number: Integer::from_primitive(5),
        ..Default::default()
    }
    .pack()?;
    assert_eq!(bt.len(), 78);
    assert_eq!(bt[0], 0x31);
    assert_eq!(bt[1], 0x50, "Sequence number lives in the high nibble");
    assert_eq!(bt[2], 0x10);

    Ok(())
}

#[tokio::test]
async fn test_firmware_info_unpack() -> Result<(), Box<dyn Error>> {
    let mut buf = [0u8; 64];
    buf[0] = 0x20;
    buf[1..12].copy_from_slice(b"Jun 12 2023");
    buf[12..20].copy_from_slice(b"12:34:56");
    buf[20..22].copy_from_slice(&0x0003u16.to_le_bytes());
    buf[24..28].copy_from_slice(&0x0001_0314u32.to_le_bytes());
    buf[28..32].copy_from_slice(&0x0110_002Au32.to_le_bytes());
    buf[44..46].copy_from_slice(&0x0630u16.to_le_bytes());

    let report = FirmwareInfoReport::unpack_from_slice(&buf)?;
    assert_eq!(&report.build_date, b"Jun 12 2023");
    assert_eq!(&report.build_time, b"12:34:56");
    assert_eq!(report.firmware_type.to_primitive(), 3);
    assert_eq!(report.hardware_info.to_primitive(), 0x0001_0314);
    assert_eq!(report.main_firmware_version.to_primitive(), 0x0110_002A);
    assert_eq!(report.update_version.to_primitive(), 0x0630);

    Ok(())
}
