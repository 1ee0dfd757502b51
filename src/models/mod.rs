pub mod device;
pub mod manager;

pub use device::{get_best_device, get_device_with_override};
pub use manager::ModelManager;
