// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};

use dap4_core::{Result, arg_err};

/// Knobs for a `ModelCompiler`. Missing fields deserialize to their
/// defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Log the node map and a summary of every compiled array at debug
    /// level once compilation succeeds.
    pub debug: bool,
    /// Size record buffers from the data source's count hint, when it
    /// offers one.
    pub preallocate_records: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            debug: false,
            preallocate_records: true,
        }
    }
}

impl CompilerConfig {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_preallocate_records(mut self, preallocate: bool) -> Self {
        self.preallocate_records = preallocate;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        match serde_json::from_str(json) {
            Ok(config) => Ok(config),
            Err(err) => arg_err!(InvalidArgument, format!("compiler config: {err}")),
        }
    }
}

#[test]
fn test_config_from_json() {
    let config = CompilerConfig::from_json(r#"{"debug": true}"#).unwrap();
    assert!(config.debug);
    assert!(config.preallocate_records);

    assert_eq!(
        CompilerConfig::default(),
        CompilerConfig::from_json("{}").unwrap()
    );

    let err = CompilerConfig::from_json(r#"{"debug": "yes"}"#).unwrap_err();
    assert_eq!(dap4_core::ErrorCode::InvalidArgument, err.code);
}

#[test]
fn test_config_builders() {
    let config = CompilerConfig::default()
        .with_debug(true)
        .with_preallocate_records(false);
    assert!(config.debug);
    assert!(!config.preallocate_records);
}
