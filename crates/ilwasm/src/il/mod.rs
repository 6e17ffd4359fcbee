//! In-memory source model.
//!
//! A front-end (the listing parser in [`crate::parser`], or a container
//! reader) produces a [`SourceModule`]; the builder only ever reads it.

mod opcode;
mod types;

pub use opcode::{OpCode, OperandKind};
pub use types::*;
