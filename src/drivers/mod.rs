pub mod checksum;
pub mod dualsense;

#[cfg(test)]
pub mod checksum_test;
