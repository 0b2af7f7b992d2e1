//! Processor configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// GPU backend preference.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendPreference {
    /// CUDA if it is compiled in and a device is present, host emulation otherwise.
    #[default]
    Auto,
    /// Force the CUDA backend (NVIDIA only).
    Cuda,
    /// Force the CPU host emulation backend.
    Host,
}

/// Top-level processor configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VppConfig {
    pub backend: BackendPreference,
    /// CUDA device ordinal.
    pub device_ordinal: usize,
    /// Directory receiving one `<consumer>.dump` file per consumer.
    pub dump_dir: PathBuf,
    /// Default for `initialize` callers that read it from configuration.
    pub enable_diagnostics: bool,
}

impl Default for VppConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            device_ordinal: 0,
            dump_dir: std::env::temp_dir().join("vpp-dumps"),
            enable_diagnostics: false,
        }
    }
}

impl VppConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, std::io::Error> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = dir.into();
        self
    }

    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: VppConfig = serde_json::from_str(r#"{"backend":"Host"}"#).unwrap();
        assert_eq!(config.backend, BackendPreference::Host);
        assert_eq!(config.device_ordinal, 0);
        assert!(!config.enable_diagnostics);
        assert!(config.dump_dir.ends_with("vpp-dumps"));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join("vpp_config_load_test.json");
        std::fs::write(&path, r#"{"device_ordinal":1,"dump_dir":"/tmp/x"}"#).unwrap();
        let config = VppConfig::from_json_file(&path).unwrap();
        assert_eq!(config.device_ordinal, 1);
        assert_eq!(config.dump_dir, PathBuf::from("/tmp/x"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn invalid_json_is_invalid_data() {
        let path = std::env::temp_dir().join("vpp_config_invalid_test.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = VppConfig::from_json_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        let _ = std::fs::remove_file(&path);
    }
}
