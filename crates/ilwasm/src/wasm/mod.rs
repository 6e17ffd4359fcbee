//! Structured target instruction set.
//!
//! The translator emits [`Op`] sequences rather than encoder instructions so
//! that function bodies can be inspected, compared, and rendered as text
//! before the module is serialized.

mod types;
pub use types::*;
