//! Interop substitution: a method body replaced by a call into the host
//! interpreter's generic invoker.
//!
//! The invoker receives an opaque method handle (a late-bound global named
//! `method:<escaped identifier>`), the argument count, and exactly
//! [`MAX_INTEROP_ARGS`] argument words, unused ones zero.

use super::core::FunctionBuilder;
use crate::error::CompileError;
use crate::module::ModuleBuilder;
use crate::wasm::Op;
use anyhow::{bail, Result};

/// Argument words accepted by the invoker, receiver included.
pub const MAX_INTEROP_ARGS: usize = 4;

/// Escape `.` so the identifier survives as a single path component on the
/// host, where `.` separates hierarchy levels. `~` is the escape character.
pub fn escape_identifier(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len());
    for c in identifier.chars() {
        match c {
            '~' => out.push_str("~0"),
            '.' => out.push_str("~1"),
            c => out.push(c),
        }
    }
    out
}

pub fn unescape_identifier(escaped: &str) -> Result<String> {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('.'),
            Some(other) => bail!("invalid escape sequence '~{}'", other),
            None => bail!("identifier ends with a bare '~'"),
        }
    }
    Ok(out)
}

/// Global name holding the host handle of `identifier`.
pub fn method_handle_name(identifier: &str) -> String {
    format!("method:{}", escape_identifier(identifier))
}

/// Emit the complete thunk body for `func`, whose parameters are the method's
/// arguments (receiver first).
pub(super) fn emit_thunk(
    func: &mut FunctionBuilder,
    module: &mut ModuleBuilder,
    identifier: &str,
) -> Result<()> {
    let argc = func.signature.params.len();
    if argc > MAX_INTEROP_ARGS {
        return Err(CompileError::ArityExceeded {
            method: func.name.clone(),
            arity: argc,
            limit: MAX_INTEROP_ARGS,
        }
        .into());
    }
    let invoke = module
        .interop_invoke()
        .ok_or_else(|| CompileError::UnresolvedImport {
            identifier: identifier.to_string(),
        })?;
    let handle = module.global(&method_handle_name(identifier));

    func.emit(Op::GlobalGet(handle));
    func.emit(Op::I32Const(argc as i32));
    for i in 0..argc {
        func.emit(Op::LocalGet(i as u32));
    }
    for _ in argc..MAX_INTEROP_ARGS {
        func.emit(Op::I32Const(0));
    }
    func.emit(Op::Call(invoke));
    if !func.has_result() {
        func.emit(Op::Drop);
    }
    func.emit(Op::End);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostBridge;
    use crate::wasm::{Signature, ValueKind};

    #[test]
    fn escaping_round_trips() -> Result<()> {
        for s in [
            "MyLibrary|System.Int32 MyLibrary.Test::Run(System.Int32)",
            "a~b.c~~..",
            "",
        ] {
            let escaped = escape_identifier(s);
            assert!(!escaped.contains('.'));
            assert_eq!(unescape_identifier(&escaped)?, s);
        }
        Ok(())
    }

    #[test]
    fn bad_escape_is_rejected() {
        assert!(unescape_identifier("abc~2").is_err());
        assert!(unescape_identifier("abc~").is_err());
    }

    #[test]
    fn thunk_pads_arguments() -> Result<()> {
        let mut module = ModuleBuilder::new(&HostBridge::default(), true);
        let invoke = module.interop_invoke().unwrap();
        let mut func = FunctionBuilder::new(
            "f".into(),
            Signature::new(vec![ValueKind::I32, ValueKind::I32], None),
            None,
        );
        emit_thunk(&mut func, &mut module, "Lib|System.Void Lib.T::F(System.Int32)")?;
        let handle = module.global("method:Lib|System~1Void Lib~1T::F(System~1Int32)");
        assert_eq!(
            func.body,
            vec![
                Op::GlobalGet(handle),
                Op::I32Const(2),
                Op::LocalGet(0),
                Op::LocalGet(1),
                Op::I32Const(0),
                Op::I32Const(0),
                Op::Call(invoke),
                Op::Drop,
                Op::End,
            ]
        );
        Ok(())
    }

    #[test]
    fn too_many_arguments() {
        let mut module = ModuleBuilder::new(&HostBridge::default(), true);
        let mut func = FunctionBuilder::new(
            "f".into(),
            Signature::new(vec![ValueKind::I32; 5], Some(ValueKind::I32)),
            None,
        );
        let err = emit_thunk(&mut func, &mut module, "Lib|x").unwrap_err();
        assert_eq!(
            err.downcast_ref::<CompileError>(),
            Some(&CompileError::ArityExceeded {
                method: "f".into(),
                arity: 5,
                limit: 4
            })
        );
    }
}
