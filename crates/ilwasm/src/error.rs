//! Compilation errors.
//!
//! Every variant is fatal: the pipeline stops at the first error and no
//! artifact is produced.

use thiserror::Error;

use crate::wasm::ValueKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The opcode has no translation rule.
    #[error("unsupported instruction: {opcode}")]
    UnsupportedInstruction { opcode: String },

    /// A source type outside the supported value kinds appeared in a
    /// signature or a field.
    #[error("unsupported type: {ty}")]
    UnsupportedType { ty: String },

    /// Malformed or unstructurable control flow.
    #[error("control flow error: {message}")]
    ControlFlow { message: String },

    /// An external call matched no declared import.
    #[error("unresolved import: no host import declared for '{identifier}'")]
    UnresolvedImport { identifier: String },

    /// A slot was re-used with a different value kind.
    #[error("slot '{slot}' is already allocated as {existing}, cannot re-use it as {requested}")]
    LocalSlotConflict {
        slot: String,
        existing: ValueKind,
        requested: ValueKind,
    },

    /// Interop substitution met more arguments than the bridge accepts.
    #[error("method '{method}' takes {arity} arguments, interop bridge accepts at most {limit}")]
    ArityExceeded {
        method: String,
        arity: usize,
        limit: usize,
    },

    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unresolved field: {field}")]
    UnresolvedField { field: String },

    #[error("malformed operand for {opcode}: {detail}")]
    MalformedOperand { opcode: String, detail: String },

    #[error("function '{name}' was referenced but never defined")]
    MissingFunctionBody { name: String },

    #[error("function '{name}' is defined more than once")]
    DuplicateFunction { name: String },

    #[error("emitted module failed validation: {message}")]
    InvalidModule { message: String },
}

impl CompileError {
    pub(crate) fn control_flow(message: impl Into<String>) -> Self {
        CompileError::ControlFlow {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported_type(ty: impl std::fmt::Display) -> Self {
        CompileError::UnsupportedType { ty: ty.to_string() }
    }
}
