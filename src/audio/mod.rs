pub mod capture;
pub mod device;
pub mod level;

pub use capture::{CaptureStream, StreamInfo};
pub use device::{detect_driver, find_input_device, list_input_devices, AudioDeviceInfo};
pub use level::{apply_gain, db_level, draw_db_bar, LevelMeter};
