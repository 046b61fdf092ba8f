use std::error::Error;

use crate::drivers::checksum::{
    crc32, fill_checksum, fill_feature_report_checksum, fill_output_report_checksum,
    verify_checksum, verify_input_report_checksum, CRC32_RESIDUE, FEATURE_REPORT_SEED,
    INPUT_REPORT_SEED, OUTPUT_REPORT_SEED,
};

#[tokio::test]
async fn test_crc32_check_value() -> Result<(), Box<dyn Error>> {
    let value = crc32(&[], b"123456789", &[]);
    assert_eq!(value, 0xCBF4_3926, "Standard check value should match");
    assert_eq!(crc32(&[], &[], &[]), 0, "Empty input should checksum to zero");

    Ok(())
}

#[tokio::test]
async fn test_crc32_matches_crc32fast() -> Result<(), Box<dyn Error>> {
    let payload: Vec<u8> = (0..=255u8).cycle().take(700).collect();
    for prefix in [
        vec![],
        vec![OUTPUT_REPORT_SEED, 0x31],
        vec![FEATURE_REPORT_SEED, 0x80],
    ] {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&prefix);
        hasher.update(&payload);
        let expected = hasher.finalize();
        let value = crc32(&prefix, &payload, &[]);
        println!("Prefix {prefix:x?}: {value:#010x}");
        assert_eq!(value, expected, "Checksum should match reference implementation");
    }

    Ok(())
}

#[tokio::test]
async fn test_crc32_split_input() -> Result<(), Box<dyn Error>> {
    let data = b"The quick brown fox jumps over the lazy dog";
    let whole = crc32(&[], data, &[]);
    assert_eq!(whole, 0x414F_A339);
    assert_eq!(crc32(&data[..3], &data[3..20], &data[20..]), whole);

    Ok(())
}

#[tokio::test]
async fn test_crc32_residue() -> Result<(), Box<dyn Error>> {
    let prefix = [OUTPUT_REPORT_SEED, 0x31];
    for len in [1usize, 9, 47, 73] {
        let payload: Vec<u8> = (0..len).map(|i| (i * 37 + 11) as u8).collect();
        let crc = crc32(&prefix, &payload, &[]);
        let residue = crc32(&prefix, &payload, &crc.to_le_bytes());
        assert_eq!(residue, CRC32_RESIDUE, "Residue mismatch for length {len}");
    }

    Ok(())
}

#[tokio::test]
async fn test_fill_and_verify() -> Result<(), Box<dyn Error>> {
    let mut buf = [0u8; 77];
    buf[0] = 0x10;
    buf[1] = 0x10;
    let crc = fill_output_report_checksum(0x31, &mut buf).ok_or("no checksum")?;
    assert_eq!(&buf[73..], &crc.to_le_bytes());
    assert!(verify_checksum(&[OUTPUT_REPORT_SEED, 0x31], &buf));

    // Any change to the covered bytes should break the checksum
    buf[5] ^= 0x01;
    assert!(!verify_checksum(&[OUTPUT_REPORT_SEED, 0x31], &buf));

    let mut feature = [0u8; 63];
    feature[0] = 0x01;
    fill_feature_report_checksum(0x80, &mut feature).ok_or("no checksum")?;
    assert!(verify_checksum(&[FEATURE_REPORT_SEED, 0x80], &feature));
    assert!(!verify_checksum(&[OUTPUT_REPORT_SEED, 0x80], &feature));

    let mut input = [0x42u8; 77];
    fill_checksum(&[INPUT_REPORT_SEED, 0x31], &mut input).ok_or("no checksum")?;
    assert!(verify_input_report_checksum(0x31, &input));

    Ok(())
}

#[tokio::test]
async fn test_fill_short_buffer() -> Result<(), Box<dyn Error>> {
    let mut buf = [0xAAu8; 3];
    assert_eq!(fill_checksum(&[], &mut buf), None);
    assert_eq!(buf, [0xAA; 3], "Short buffers should be left untouched");
    assert!(!verify_checksum(&[], &buf));

    Ok(())
}
