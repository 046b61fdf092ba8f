use std::fs::File;
use std::io::Write;

use dualsense_hid::config::CodecConfig;
use schemars::schema_for;

fn main() {
    let config_schema = schema_for!(CodecConfig);
    let mut file = File::create("./rootfs/usr/share/dualsense-hid/schema/config_v1.json")
        .expect("Failed to create schema file");
    write!(
        file,
        "{}",
        serde_json::to_string_pretty(&config_schema).unwrap()
    )
    .expect("Failed to write schema");
}
