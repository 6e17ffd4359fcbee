//! ilwasm — IL bytecode to structured WebAssembly compiler.
//!
//! This crate compiles the methods of a managed assembly into a WebAssembly
//! module whose control flow is expressed purely with nested `block`/`loop`
//! regions. Objects live in a linear memory shared with the host, which also
//! provides allocation, logging and late-bound type handles.

pub mod builder;
pub mod config;
pub mod error;
pub mod il;
pub mod module;
pub mod parser;
pub mod wasm;

// Re-export key types for convenience
pub use anyhow::{Context, Result};
pub use config::{CompileOptions, ExportPolicy, HostBridge};
pub use error::CompileError;
use il::SourceModule;

/// Compile a source module to a WebAssembly binary.
///
/// This is the main entry point of the pipeline. Any error aborts the whole
/// compilation; no partial module is ever returned.
///
/// # Example
/// ```no_run
/// use ilwasm::{compile, parser::parse_listing, CompileOptions};
///
/// let text = std::fs::read_to_string("Primes.il").unwrap();
/// let source = parse_listing(&text).unwrap();
/// let wasm = compile(&source, &CompileOptions::default()).unwrap();
/// std::fs::write("Primes.wasm", wasm).unwrap();
/// ```
pub fn compile(source: &SourceModule, options: &CompileOptions) -> Result<Vec<u8>> {
    let image = builder::build_module(source, options)
        .with_context(|| format!("failed to compile assembly {}", source.assembly))?;

    let bytes = module::encode(&image);

    if options.validate {
        wasmparser::validate(&bytes).map_err(|e| CompileError::InvalidModule {
            message: e.to_string(),
        })?;
    }

    Ok(bytes)
}

/// Parse an IL listing and compile it.
pub fn compile_listing(text: &str, options: &CompileOptions) -> Result<Vec<u8>> {
    let source = parser::parse_listing(text).context("failed to parse IL listing")?;
    compile(&source, options)
}
