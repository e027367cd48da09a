use serde::{Deserialize, Serialize};

use crate::{
    bytecode::DEFAULT_CODE_CACHE_CAPACITY,
    constants::{INIT_CODE_MAX_SIZE, MAX_CALL_DEPTH, MAX_CODE_SIZE},
    errors::{InternalError, VMError},
};

/// Interpreter limits and switches.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct VmConfig {
    /// Calls and creates at this depth fail without spawning a child.
    pub max_call_depth: usize,
    /// EIP-170 limit on deployed code.
    pub max_code_size: usize,
    /// EIP-3860 limit on initcode.
    pub max_initcode_size: usize,
    /// Programs kept by a VM-owned bytecode cache.
    pub code_cache_capacity: usize,
    /// Report every SLOAD/SSTORE to the tracer.
    pub track_state_changes: bool,
    pub chain_id: u64,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: MAX_CALL_DEPTH,
            max_code_size: MAX_CODE_SIZE,
            max_initcode_size: INIT_CODE_MAX_SIZE,
            code_cache_capacity: DEFAULT_CODE_CACHE_CAPACITY,
            track_state_changes: false,
            chain_id: 1,
        }
    }
}

impl VmConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, VMError> {
        serde_json::from_str(json).map_err(|err| InternalError::Custom(err.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = VmConfig::default();
        assert_eq!(config.max_call_depth, 1024);
        assert_eq!(config.max_code_size, 24576);
        assert_eq!(config.max_initcode_size, 49152);
        assert!(!config.track_state_changes);
        assert_eq!(config.chain_id, 1);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = VmConfig::from_json(r#"{"max_call_depth": 8, "track_state_changes": true}"#)
            .expect("parse");
        assert_eq!(config.max_call_depth, 8);
        assert!(config.track_state_changes);
        assert_eq!(config.max_code_size, MAX_CODE_SIZE);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = VmConfig {
            chain_id: 17,
            code_cache_capacity: 3,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).expect("serialize");
        assert_eq!(VmConfig::from_json(&json).expect("deserialize"), config);
    }

    #[test]
    fn test_invalid_json() {
        assert!(VmConfig::from_json("{\"max_call_depth\": \"deep\"}").is_err());
    }
}
