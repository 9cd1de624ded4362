//! Configuration types for pKa prediction.
//!
//! - [`PkaConfig`] — Main configuration struct
//! - [`NormalizeConfig`] — Input normalization settings
//! - [`FragmentPolicy`] — Handling of disconnected input
//! - [`ModelSource`] — Location of the per-polarity weight files
//! - [`DeviceKind`] — Compute device for inference

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use candle_core::Device;
use thiserror::Error;
use tracing::warn;

use crate::model::types::Polarity;

/// Directory holding the bundled weight files.
pub const DEFAULT_MODEL_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/models");

/// Main configuration for pKa prediction.
///
/// # Examples
///
/// ```
/// use pka_forge::{FragmentPolicy, NormalizeConfig, PkaConfig};
///
/// // Default configuration: uncharge, reject salts, bundled models on the CPU
/// let default = PkaConfig::default();
/// assert!(default.normalize.uncharge);
///
/// // Strip counter-ions and keep the input charges
/// let custom = PkaConfig {
///     normalize: NormalizeConfig {
///         uncharge: false,
///         fragments: FragmentPolicy::KeepLargest,
///     },
///     ..Default::default()
/// };
/// assert_eq!(custom.normalize.fragments, FragmentPolicy::KeepLargest);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PkaConfig {
    /// Input normalization applied before site detection.
    pub normalize: NormalizeConfig,

    /// Custom ionization pattern table in TOML format.
    ///
    /// If `None`, uses the embedded `ionization.patterns.toml`.
    pub patterns: Option<String>,

    /// Where the acid and base weights are loaded from.
    pub models: ModelSource,

    /// Device the networks run on.
    pub device: DeviceKind,
}

/// Normalization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeConfig {
    /// Neutralize removable charges and re-canonicalize the structure.
    pub uncharge: bool,

    /// What to do with inputs made of several disconnected fragments.
    pub fragments: FragmentPolicy,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            uncharge: true,
            fragments: FragmentPolicy::Reject,
        }
    }
}

/// Handling of disconnected input such as salts and solvates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FragmentPolicy {
    /// Disconnected input is an invalid structure.
    #[default]
    Reject,

    /// Keep the fragment with the most heavy atoms; ties go to the first.
    KeepLargest,
}

/// Location of the model weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    pub dir: PathBuf,
}

impl ModelSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Weight file for `polarity`.
    ///
    /// Prefers `weight_<polarity>.safetensors` and falls back to the PyTorch
    /// `.pth` state dict. When neither exists the `.safetensors` path is
    /// returned so error messages point at the preferred name.
    pub fn weight_path(&self, polarity: Polarity) -> PathBuf {
        let stem = format!("weight_{polarity}");
        let preferred = self.dir.join(format!("{stem}.safetensors"));
        if preferred.is_file() {
            return preferred;
        }
        let fallback = self.dir.join(format!("{stem}.pth"));
        if fallback.is_file() {
            return fallback;
        }
        preferred
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_DIR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid device '{0}' (expected cpu, cuda[:N] or metal[:N])")]
pub struct ParseDeviceError(String);

/// Compute device selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    #[default]
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl DeviceKind {
    /// Opens the device, falling back to the CPU when it is unavailable.
    pub fn select(&self) -> Device {
        let opened = match *self {
            DeviceKind::Cpu => return Device::Cpu,
            DeviceKind::Cuda(ordinal) => Device::new_cuda(ordinal),
            DeviceKind::Metal(ordinal) => Device::new_metal(ordinal),
        };
        match opened {
            Ok(device) => device,
            Err(e) => {
                warn!(device = %self, error = %e, "device unavailable, falling back to CPU");
                Device::Cpu
            }
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Cuda(n) => write!(f, "cuda:{n}"),
            DeviceKind::Metal(n) => write!(f, "metal:{n}"),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = ParseDeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let (name, ordinal) = match lower.split_once(':') {
            Some((name, n)) => {
                let n = n.parse().map_err(|_| ParseDeviceError(s.to_string()))?;
                (name, n)
            }
            None => (lower.as_str(), 0),
        };
        match name {
            "cpu" if ordinal == 0 => Ok(DeviceKind::Cpu),
            "cuda" | "gpu" => Ok(DeviceKind::Cuda(ordinal)),
            "metal" | "mps" => Ok(DeviceKind::Metal(ordinal)),
            _ => Err(ParseDeviceError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = PkaConfig::default();
        assert!(config.normalize.uncharge);
        assert_eq!(config.normalize.fragments, FragmentPolicy::Reject);
        assert!(config.patterns.is_none());
        assert_eq!(config.models.dir(), Path::new(DEFAULT_MODEL_DIR));
        assert_eq!(config.device, DeviceKind::Cpu);
    }

    #[test]
    fn weight_path_prefers_safetensors() {
        let dir = tempfile::tempdir().unwrap();
        let source = ModelSource::new(dir.path());

        assert_eq!(
            source.weight_path(Polarity::Acid),
            dir.path().join("weight_acid.safetensors")
        );

        std::fs::write(dir.path().join("weight_acid.pth"), b"").unwrap();
        assert_eq!(
            source.weight_path(Polarity::Acid),
            dir.path().join("weight_acid.pth")
        );

        std::fs::write(dir.path().join("weight_acid.safetensors"), b"").unwrap();
        assert_eq!(
            source.weight_path(Polarity::Acid),
            dir.path().join("weight_acid.safetensors")
        );
        assert_eq!(
            source.weight_path(Polarity::Base),
            dir.path().join("weight_base.safetensors")
        );
    }

    #[test]
    fn device_kind_parse_and_display() {
        assert_eq!("cpu".parse::<DeviceKind>().unwrap(), DeviceKind::Cpu);
        assert_eq!("CUDA".parse::<DeviceKind>().unwrap(), DeviceKind::Cuda(0));
        assert_eq!("cuda:2".parse::<DeviceKind>().unwrap(), DeviceKind::Cuda(2));
        assert_eq!("metal:1".parse::<DeviceKind>().unwrap(), DeviceKind::Metal(1));
        assert!("tpu".parse::<DeviceKind>().is_err());
        assert!("cuda:x".parse::<DeviceKind>().is_err());
        assert_eq!(DeviceKind::Cuda(3).to_string(), "cuda:3");
    }

    #[test]
    fn cpu_selection_never_falls_back() {
        assert!(matches!(DeviceKind::Cpu.select(), Device::Cpu));
    }
}
