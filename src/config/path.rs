//! Module for searching for dualsense-hid config files

use std::path::PathBuf;

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/dualsense-hid";

/// Name of the codec config file in each search directory
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Returns the base path for configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("dualsense-hid") else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    for dir in data_dirs {
        if dir.exists() {
            return dir;
        }
    }

    log::warn!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns the user config directory, if XDG can determine one
fn get_user_config_path() -> Option<PathBuf> {
    let base_dirs = xdg::BaseDirectories::with_prefix("dualsense-hid").ok()?;
    Some(base_dirs.get_config_home())
}

/// Returns the config files to try in load order.
/// E.g. ["~/.config/dualsense-hid/config.yaml", "/etc/dualsense-hid/config.yaml", ...]
pub fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(user) = get_user_config_path() {
        paths.push(user.join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from("/etc/dualsense-hid").join(CONFIG_FILE_NAME));
    paths.push(get_base_path().join(CONFIG_FILE_NAME));
    paths.push(PathBuf::from("./rootfs/usr/share/dualsense-hid").join(CONFIG_FILE_NAME));

    paths
}
