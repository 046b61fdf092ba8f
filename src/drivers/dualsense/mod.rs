pub mod curve;
pub mod diagnostic;
pub mod driver;
pub mod event;
pub mod hid_report;
pub mod input;
pub mod offsets;
pub mod output;
pub mod profile;
pub mod transport;

#[cfg(test)]
pub mod curve_test;
#[cfg(test)]
pub mod hid_report_test;
#[cfg(test)]
pub mod output_test;
#[cfg(test)]
pub mod profile_test;
