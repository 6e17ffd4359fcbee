//! # Builder
//!
//! Compiles a [`SourceModule`] into a [`ModuleImage`].
//!
//! ## Pipeline overview
//!
//! ```text
//! SourceModule
//!      │
//!      ├─ ModuleBuilder::new()  ─► imports: memory, allocator, logger,
//!      │                            interop invoker, static imports
//!      │
//!      └─ for each type, for each method:
//!           compile_method()
//!             ├── method_signature()         ─► Signature
//!             ├── interop::emit_thunk()      (interop methods)
//!             └── Translator::translate_body()
//!                   ├── TargetSchedule::analyze()   [flow]
//!                   ├── loop + N blocks + resume dispatch
//!                   └── for each Instruction:
//!                         RegionCursor::advance_to() ─► end
//!                         translate_instruction()    [translate]
//!             ─► ModuleBuilder::define_function()
//!
//!   ModuleBuilder::finish() ─► ModuleImage ──► module::encode
//! ```
//!
//! ## Architecture
//!
//! | Module        | Responsibility                                              |
//! |---------------|-------------------------------------------------------------|
//! | [`core`]      | Slot allocator and `FunctionBuilder`                        |
//! | [`flow`]      | Target schedule and break-depth computation                 |
//! | [`translate`] | Source opcode → target operator dispatch                    |
//! | [`interop`]   | Bodies that forward to the host interpreter                 |
//!
//! Function indices are assigned in first-reference order, so a method may
//! call a sibling that has not been compiled yet; the callee's body is
//! attached to the reserved index when its turn comes.

pub mod core;
pub mod flow;
pub mod interop;
mod translate;

pub use interop::{escape_identifier, unescape_identifier, MAX_INTEROP_ARGS};
pub use translate::{field_offset, import_identifier, value_kind};

use crate::config::{CompileOptions, ExportPolicy};
use crate::il::{MethodDef, SourceModule, TypeDef};
use crate::module::{ModuleBuilder, ModuleImage};
use crate::wasm::{render, Signature, ValueKind};
use anyhow::{Context, Result};
use self::core::FunctionBuilder;
use tracing::{debug, warn};
use translate::Translator;

/// Compile every method of `source`.
pub fn build_module(source: &SourceModule, options: &CompileOptions) -> Result<ModuleImage> {
    let mut module = ModuleBuilder::new(&options.bridge, !options.interop_methods.is_empty());

    for name in &options.interop_methods {
        let declared = source.types.iter().any(|ty| {
            ty.methods
                .iter()
                .any(|m| m.reference(&ty.name).full_name() == *name)
        });
        if !declared {
            warn!(method = %name, "interop method not found in module");
        }
    }

    for ty in &source.types {
        for method in &ty.methods {
            let full_name = method.reference(&ty.name).full_name();
            compile_method(source, options, &mut module, ty, method)
                .with_context(|| format!("compiling method {}", full_name))?;
        }
    }

    Ok(module.finish()?)
}

/// Target signature of `method`; instance methods take the receiver first.
pub fn method_signature(method: &MethodDef) -> Result<Signature> {
    let mut params = Vec::with_capacity(method.params.len() + 1);
    if method.has_this() {
        params.push(ValueKind::I32);
    }
    for p in &method.params {
        params.push(value_kind(&p.ty)?);
    }
    let result = if method.return_type.is_void() {
        None
    } else {
        Some(value_kind(&method.return_type)?)
    };
    Ok(Signature::new(params, result))
}

fn compile_method(
    source: &SourceModule,
    options: &CompileOptions,
    module: &mut ModuleBuilder,
    ty: &TypeDef,
    method: &MethodDef,
) -> Result<()> {
    let full_name = method.reference(&ty.name).full_name();
    // A call site may already hold this index; otherwise it is taken now.
    module.reserve_function(&full_name);
    let signature = method_signature(method)?;
    let export = match options.export_policy {
        ExportPolicy::All => Some(full_name.clone()),
        ExportPolicy::Public if method.is_public => Some(full_name.clone()),
        _ => None,
    };
    let mut func = FunctionBuilder::new(full_name.clone(), signature, export);

    if options.is_interop(&full_name) {
        debug!(method = %full_name, "compiling interop thunk");
        let identifier = format!("{}|{}", source.assembly, full_name);
        interop::emit_thunk(&mut func, module, &identifier)?;
    } else {
        debug!(method = %full_name, signature = %func.signature, "compiling method");
        let mut translator = Translator {
            source,
            options,
            module: &mut *module,
            func: &mut func,
        };
        match &method.body {
            Some(body) => translator.translate_body(body)?,
            None => translator.emit_empty_body(),
        }
    }

    let entry = func.finish();
    debug!(method = %full_name, "body\n{}", render(&entry.body));
    let idx = module.define_function(entry)?;
    debug!(method = %full_name, index = idx.as_u32(), "defined function");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{Instruction, MethodBody, MethodRef, OpCode, Operand, Param, TypeName, TypeSig};
    use crate::wasm::Op;

    fn method(name: &str, is_static: bool, body: Vec<Instruction>) -> MethodDef {
        MethodDef {
            name: name.into(),
            return_type: TypeSig::I4,
            params: vec![],
            is_public: true,
            is_static,
            is_virtual: false,
            body: Some(MethodBody {
                locals: vec![],
                instructions: body,
                exception_regions: vec![],
            }),
        }
    }

    fn call(to: &str) -> Instruction {
        Instruction::new(
            0,
            OpCode::Call,
            Operand::Method(MethodRef {
                declaring_type: TypeName::parse(None, "Lib.T"),
                name: to.into(),
                has_this: false,
                return_type: TypeSig::I4,
                params: vec![],
            }),
        )
    }

    fn module_of(methods: Vec<MethodDef>) -> SourceModule {
        SourceModule {
            assembly: "Lib".into(),
            types: vec![TypeDef {
                name: TypeName::parse(None, "Lib.T"),
                is_public: true,
                explicit_layout: false,
                fields: vec![],
                methods,
            }],
        }
    }

    #[test]
    fn forward_call_reserves_the_callee_index() -> Result<()> {
        let source = module_of(vec![
            method("A", true, vec![call("B"), Instruction::simple(5, OpCode::Ret)]),
            method("B", true, vec![Instruction::simple(0, OpCode::LdcI4_7), Instruction::simple(1, OpCode::Ret)]),
            method("C", true, vec![call("B"), Instruction::simple(5, OpCode::Ret)]),
        ]);
        let image = build_module(&source, &CompileOptions::default())?;
        let base = image.num_imported_functions();
        let b = Op::Call(crate::wasm::FuncIdx::new(base + 1));

        let (_, a) = &image.functions[0];
        assert!(a.body.contains(&b));
        let (_, c) = &image.functions[2];
        assert_eq!(c.name, "System.Int32 Lib.T::C()");
        assert!(c.body.contains(&b));

        let exports = image.exports();
        assert_eq!(exports[1].0, "System.Int32 Lib.T::B()");
        assert_eq!(exports[1].1.as_u32(), base + 1);
        assert_eq!(exports[2].1.as_u32(), base + 2);
        Ok(())
    }

    #[test]
    fn instance_methods_take_a_receiver() -> Result<()> {
        let mut m = method("Get", false, vec![]);
        m.params.push(Param {
            name: Some("flag".into()),
            ty: TypeSig::Boolean,
        });
        let sig = method_signature(&m)?;
        assert_eq!(sig.params, vec![ValueKind::I32, ValueKind::I32]);
        assert_eq!(sig.result, Some(ValueKind::I32));
        Ok(())
    }

    #[test]
    fn unsupported_parameter_type_fails() {
        let mut m = method("F", true, vec![]);
        m.params.push(Param {
            name: None,
            ty: TypeSig::R8,
        });
        let source = module_of(vec![m]);
        let err = build_module(&source, &CompileOptions::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("compiling method System.Int32 Lib.T::F(System.Double)"));
        assert!(matches!(
            err.downcast_ref::<crate::CompileError>(),
            Some(crate::CompileError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn bodyless_method_with_result_traps() -> Result<()> {
        let mut m = method("Abstract", false, vec![]);
        m.body = None;
        let image = build_module(&module_of(vec![m]), &CompileOptions::default())?;
        assert_eq!(image.functions[0].1.body, vec![Op::Unreachable, Op::End]);
        Ok(())
    }

    #[test]
    fn export_policy_none_exports_nothing() -> Result<()> {
        let source = module_of(vec![method("A", true, vec![Instruction::simple(0, OpCode::LdcI4_1), Instruction::simple(1, OpCode::Ret)])]);
        let options = CompileOptions {
            export_policy: ExportPolicy::None,
            ..CompileOptions::default()
        };
        let image = build_module(&source, &options)?;
        assert!(image.exports().is_empty());
        Ok(())
    }

    #[test]
    fn interop_method_becomes_a_thunk() -> Result<()> {
        let source = module_of(vec![method("A", true, vec![Instruction::simple(0, OpCode::Ldstr)])]);
        let options = CompileOptions {
            interop_methods: vec!["System.Int32 Lib.T::A()".into()],
            ..CompileOptions::default()
        };
        let image = build_module(&source, &options)?;
        let body = &image.functions[0].1.body;
        assert_eq!(body[1], Op::I32Const(0));
        assert_eq!(image.globals[0].name, "method:Lib|System~1Int32 Lib~1T::A()");
        Ok(())
    }
}
