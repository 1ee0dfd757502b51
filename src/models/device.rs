//! Compute device selection for candle models

use crate::error::{Result, ResumeParserError};
use candle_core::Device;

pub const DEVICE_ENV_VAR: &str = "RESUME_PARSER_DEVICE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    Cpu,
    Cuda,
    Metal,
    Auto,
}

impl DevicePreference {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "cpu" => DevicePreference::Cpu,
            "cuda" | "gpu" => DevicePreference::Cuda,
            "metal" | "mps" => DevicePreference::Metal,
            "" | "auto" => DevicePreference::Auto,
            other => {
                log::warn!("Unknown device '{}', falling back to auto-detection", other);
                DevicePreference::Auto
            }
        }
    }

    pub fn from_env() -> Self {
        std::env::var(DEVICE_ENV_VAR)
            .map(|v| Self::parse(&v))
            .unwrap_or(DevicePreference::Auto)
    }
}

/// Best available accelerator, CPU otherwise
pub fn get_best_device() -> Result<Device> {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            log::info!("Using CUDA GPU for inference");
            return Ok(device);
        }
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                log::info!("Using Metal GPU for inference");
                return Ok(device);
            }
            Err(e) => log::warn!("Metal GPU initialization failed: {}", e),
        }
    }

    log::info!("No GPU available, using CPU");
    Ok(Device::Cpu)
}

pub fn device_for(preference: DevicePreference) -> Result<Device> {
    match preference {
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Cuda => {
            #[cfg(feature = "cuda")]
            {
                Device::new_cuda(0)
                    .map_err(|e| ResumeParserError::ModelLoading(format!("Failed to initialize CUDA: {}", e)))
            }
            #[cfg(not(feature = "cuda"))]
            {
                Err(ResumeParserError::ModelLoading("CUDA support not compiled in".to_string()))
            }
        }
        DevicePreference::Metal => {
            #[cfg(feature = "metal")]
            {
                Device::new_metal(0)
                    .map_err(|e| ResumeParserError::ModelLoading(format!("Failed to initialize Metal: {}", e)))
            }
            #[cfg(not(feature = "metal"))]
            {
                Err(ResumeParserError::ModelLoading("Metal support not compiled in".to_string()))
            }
        }
        DevicePreference::Auto => get_best_device(),
    }
}

/// Device chosen by `RESUME_PARSER_DEVICE`, auto-detected when unset
pub fn get_device_with_override() -> Result<Device> {
    let preference = DevicePreference::from_env();
    if preference != DevicePreference::Auto {
        log::info!("Forcing {:?} device from {}", preference, DEVICE_ENV_VAR);
    }
    device_for(preference)
}
