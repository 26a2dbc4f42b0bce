//! Compute device selection.
//!
//! The device is chosen once when the program starts and then handed to every
//! compute-bound call explicitly.

use crate::common::*;

/// The device requested by the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceConfig {
    /// Use the first CUDA device if any, otherwise the CPU.
    Auto,
    Cpu,
    Cuda(usize),
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::Auto
    }
}

impl FromStr for DeviceConfig {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let device = match text {
            "auto" => Self::Auto,
            "cpu" => Self::Cpu,
            "cuda" => Self::Cuda(0),
            _ => {
                let index = text
                    .strip_prefix("cuda:")
                    .ok_or_else(|| format_err!("invalid device name '{}'", text))?;
                let index: usize = index
                    .parse()
                    .with_context(|| format!("invalid CUDA device index in '{}'", text))?;
                Self::Cuda(index)
            }
        };
        Ok(device)
    }
}

impl Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(index) => write!(f, "cuda:{}", index),
        }
    }
}

/// The device where computation actually takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeDevice {
    Cpu,
    Cuda(usize),
}

impl ComputeDevice {
    pub fn is_cuda(&self) -> bool {
        matches!(self, Self::Cuda(_))
    }
}

impl Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(index) => write!(f, "cuda:{}", index),
        }
    }
}

#[cfg(feature = "tch")]
impl From<ComputeDevice> for tch::Device {
    fn from(from: ComputeDevice) -> Self {
        match from {
            ComputeDevice::Cpu => tch::Device::Cpu,
            ComputeDevice::Cuda(index) => tch::Device::Cuda(index),
        }
    }
}

/// Number of usable CUDA devices.
pub fn cuda_device_count() -> usize {
    #[cfg(feature = "tch")]
    {
        if tch::Cuda::is_available() {
            tch::Cuda::device_count() as usize
        } else {
            0
        }
    }

    #[cfg(not(feature = "tch"))]
    {
        0
    }
}

/// Resolve the configured device against the capabilities of this machine.
pub fn select_device(config: DeviceConfig) -> Result<ComputeDevice> {
    let num_cuda = cuda_device_count();
    debug!("detected {} CUDA device(s)", num_cuda);

    let device = match config {
        DeviceConfig::Auto => {
            if num_cuda > 0 {
                ComputeDevice::Cuda(0)
            } else {
                ComputeDevice::Cpu
            }
        }
        DeviceConfig::Cpu => ComputeDevice::Cpu,
        DeviceConfig::Cuda(index) => {
            ensure!(
                index < num_cuda,
                "CUDA device {} is requested, but only {} device(s) are available",
                index,
                num_cuda
            );
            ComputeDevice::Cuda(index)
        }
    };

    info!("use device {}", device);
    Ok(device)
}

pub mod serde_device {
    use super::*;

    pub fn serialize<S>(device: &DeviceConfig, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&device.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DeviceConfig, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse()
            .map_err(|err| D::Error::custom(format!("{:?}", err)))
    }
}
