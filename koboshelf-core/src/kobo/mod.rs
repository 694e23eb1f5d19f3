//! Kobo device specifics

mod content_id;
mod device;

pub use content_id::{content_id, image_id, ONBOARD_PREFIX};
pub use device::{
    detect, find_devices, DeviceLocator, KoboDevice, MountPointLocator, CATALOG_FILE, KOBO_DIR,
};
