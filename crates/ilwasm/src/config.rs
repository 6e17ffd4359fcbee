//! Compilation options and the host-bridge manifest.
//!
//! The manifest describes what the embedding host provides to the compiled
//! module: the shared memory, the allocator and logger entry points, the
//! interop invoker, and any statically bound external methods.
//!
//! ```toml
//! [memory]
//! module = "sys"
//! name = "memory"
//! minimum_pages = 1
//!
//! [[imports]]
//! module = "static"
//! name = "System.Console|System.Void System.Console::WriteLine(System.Int32)"
//! params = ["i32"]
//! ```

use crate::wasm::{Signature, ValueKind};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Which methods become module exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportPolicy {
    /// Externally visible methods only.
    #[default]
    Public,
    All,
    None,
}

/// Configuration options for compilation
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Byte length of the managed object header preceding the first field.
    pub object_header_size: u32,
    pub export_policy: ExportPolicy,
    /// Full method names compiled as interop thunks instead of translated bodies.
    pub interop_methods: Vec<String>,
    pub bridge: HostBridge,
    /// Validate the emitted binary before returning it.
    pub validate: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            object_header_size: 8,
            export_policy: ExportPolicy::Public,
            interop_methods: Vec::new(),
            bridge: HostBridge::default(),
            validate: true,
        }
    }
}

impl CompileOptions {
    pub fn is_interop(&self, full_name: &str) -> bool {
        self.interop_methods.iter().any(|m| m == full_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryImport {
    pub module: String,
    pub name: String,
    #[serde(default = "default_minimum_pages")]
    pub minimum_pages: u64,
}

fn default_minimum_pages() -> u64 {
    1
}

/// A host function at a fixed position of the import table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionImport {
    pub module: String,
    pub name: String,
}

impl FunctionImport {
    fn new(module: &str, name: &str) -> Self {
        Self {
            module: module.to_string(),
            name: name.to_string(),
        }
    }
}

/// A statically bound external method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportDecl {
    pub module: String,
    /// Formatted identifier `<assembly>|<method full name>`.
    pub name: String,
    #[serde(default)]
    pub params: Vec<ValueKind>,
    #[serde(default)]
    pub result: Option<ValueKind>,
}

impl ImportDecl {
    pub fn signature(&self) -> Signature {
        Signature::new(self.params.clone(), self.result)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostBridge {
    pub memory: MemoryImport,
    /// `(i32 type handle) -> i32 address`
    pub allocator: FunctionImport,
    /// `(i32) -> ()`
    pub logger: FunctionImport,
    /// `(i32 method handle, i32 argc, i32 x 4) -> i32`
    pub interop: FunctionImport,
    pub imports: Vec<ImportDecl>,
}

impl Default for HostBridge {
    fn default() -> Self {
        Self {
            memory: MemoryImport {
                module: "sys".to_string(),
                name: "memory".to_string(),
                minimum_pages: 1,
            },
            allocator: FunctionImport::new("sys", "object_new"),
            logger: FunctionImport::new("sys", "log"),
            interop: FunctionImport::new("interop", "invoke"),
            imports: vec![ImportDecl {
                module: "static".to_string(),
                name: "System.Console|System.Void System.Console::WriteLine(System.Int32)"
                    .to_string(),
                params: vec![ValueKind::I32],
                result: None,
            }],
        }
    }
}

impl HostBridge {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse host bridge manifest")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }
}
