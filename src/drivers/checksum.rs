//! Table driven CRC-32 used to frame Bluetooth reports and seal on-device
//! profiles. This is the reflected IEEE variant: polynomial 0xEDB88320,
//! initial value 0xFFFFFFFF and final XOR 0xFFFFFFFF.
use std::sync::OnceLock;

/// Reflected CRC-32 polynomial
pub const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

/// Seed byte prepended to checksummed Bluetooth input reports
pub const INPUT_REPORT_SEED: u8 = 0xA1;
/// Seed byte prepended to checksummed Bluetooth output reports
pub const OUTPUT_REPORT_SEED: u8 = 0xA2;
/// Seed byte prepended to checksummed Bluetooth feature reports
pub const FEATURE_REPORT_SEED: u8 = 0x53;

/// Size of the little-endian checksum trailer
pub const CHECKSUM_SIZE: usize = 4;

/// Checksum of any buffer followed by its own little-endian checksum
pub const CRC32_RESIDUE: u32 = 0x2144_DF1C;

static CRC32_TABLE: OnceLock<[u32; 256]> = OnceLock::new();

/// Returns the lookup table, building it on first use
fn table() -> &'static [u32; 256] {
    CRC32_TABLE.get_or_init(|| {
        let mut table = [0u32; 256];
        for (n, entry) in table.iter_mut().enumerate() {
            let mut c = n as u32;
            for _ in 0..8 {
                c = if c & 1 != 0 {
                    CRC32_POLYNOMIAL ^ (c >> 1)
                } else {
                    c >> 1
                };
            }
            *entry = c;
        }
        table
    })
}

/// Feeds the given bytes into a running (non-finalized) CRC register
fn update(mut crc: u32, bytes: &[u8]) -> u32 {
    let table = table();
    for byte in bytes {
        crc = table[((crc ^ *byte as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc
}

/// Computes the CRC-32 of `prefix ++ payload ++ suffix`
pub fn crc32(prefix: &[u8], payload: &[u8], suffix: &[u8]) -> u32 {
    let crc = update(0xFFFF_FFFF, prefix);
    let crc = update(crc, payload);
    update(crc, suffix) ^ 0xFFFF_FFFF
}

/// Computes the checksum of the buffer (excluding its 4 byte trailer) with the
/// given prefix and writes it little-endian into the trailer. Buffers too
/// short to hold a trailer are left untouched.
pub fn fill_checksum(prefix: &[u8], buf: &mut [u8]) -> Option<u32> {
    if buf.len() < CHECKSUM_SIZE {
        log::warn!("Buffer of {} bytes is too short for a checksum", buf.len());
        return None;
    }
    let split = buf.len() - CHECKSUM_SIZE;
    let crc = crc32(prefix, &buf[..split], &[]);
    buf[split..].copy_from_slice(&crc.to_le_bytes());
    Some(crc)
}

/// Returns true if the 4 byte little-endian trailer of the buffer matches the
/// checksum of the preceding bytes.
pub fn verify_checksum(prefix: &[u8], buf: &[u8]) -> bool {
    if buf.len() < CHECKSUM_SIZE {
        return false;
    }
    let split = buf.len() - CHECKSUM_SIZE;
    let mut trailer = [0u8; CHECKSUM_SIZE];
    trailer.copy_from_slice(&buf[split..]);
    crc32(prefix, &buf[..split], &[]) == u32::from_le_bytes(trailer)
}

/// Fills the checksum trailer of a Bluetooth output report. The buffer holds
/// the report data without the report id.
pub fn fill_output_report_checksum(report_id: u8, buf: &mut [u8]) -> Option<u32> {
    fill_checksum(&[OUTPUT_REPORT_SEED, report_id], buf)
}

/// Fills the checksum trailer of a Bluetooth feature report. The buffer holds
/// the report data without the report id.
pub fn fill_feature_report_checksum(report_id: u8, buf: &mut [u8]) -> Option<u32> {
    fill_checksum(&[FEATURE_REPORT_SEED, report_id], buf)
}

/// Verifies the checksum trailer of a full Bluetooth input report
pub fn verify_input_report_checksum(report_id: u8, buf: &[u8]) -> bool {
    verify_checksum(&[INPUT_REPORT_SEED, report_id], buf)
}
