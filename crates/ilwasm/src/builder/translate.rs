//! Instruction translation - lowers source instructions to structured target
//! operators.
//!
//! Both sides are stack machines, so most opcodes are a one-to-one or short
//! fixed expansion. Every value is the i32 kind.

use super::core::{FunctionBuilder, SlotName};
use super::flow::{BranchDepth, RegionCursor, TargetSchedule};
use crate::config::CompileOptions;
use crate::error::CompileError;
use crate::il::{FieldRef, Instruction, MethodBody, MethodRef, OpCode, Operand, SourceModule, TypeSig};
use crate::module::ModuleBuilder;
use crate::wasm::{BinOp, FuncIdx, Op, ValueKind};
use anyhow::Result;
use tracing::trace;

/// Full name of the base object constructor, compiled as `drop`.
const OBJECT_CTOR: &str = "System.Void System.Object::.ctor()";

/// Bytes occupied by every supported field kind.
const FIELD_SIZE: u32 = 4;

/// Map a source type onto a target value kind. `void` has no kind and is
/// rejected here; callers handle it for results.
pub fn value_kind(ty: &TypeSig) -> Result<ValueKind, CompileError> {
    match ty {
        TypeSig::Boolean | TypeSig::I4 => Ok(ValueKind::I32),
        other => Err(CompileError::unsupported_type(other)),
    }
}

/// Byte offset of `field` within an instance of its declaring type.
pub fn field_offset(
    source: &SourceModule,
    field: &FieldRef,
    header_size: u32,
) -> Result<u32, CompileError> {
    let unresolved = || CompileError::UnresolvedField {
        field: field.full_name(),
    };
    let ty = source.find_type(&field.declaring_type).ok_or_else(unresolved)?;
    let pos = ty
        .fields
        .iter()
        .position(|f| f.name == field.name)
        .ok_or_else(unresolved)?;
    let def = &ty.fields[pos];
    if def.is_static {
        return Err(CompileError::MalformedOperand {
            opcode: "ldfld/stfld".to_string(),
            detail: format!("{} is a static field", field.full_name()),
        });
    }
    value_kind(&def.ty)?;

    if let Some(explicit) = def.explicit_offset {
        return Ok(header_size + explicit);
    }
    let mut offset = header_size;
    // Static fields hold no instance storage.
    for prev in ty.fields[..pos].iter().filter(|f| !f.is_static) {
        value_kind(&prev.ty)?;
        offset += FIELD_SIZE;
    }
    Ok(offset)
}

/// Import identifier of an external method: `<assembly>|<full name>`.
pub fn import_identifier(local_assembly: &str, method: &MethodRef) -> String {
    format!(
        "{}|{}",
        method.declaring_type.scope(local_assembly),
        method.full_name()
    )
}

/// Per-method translation state.
pub(super) struct Translator<'a> {
    pub(super) source: &'a SourceModule,
    pub(super) options: &'a CompileOptions,
    pub(super) module: &'a mut ModuleBuilder,
    pub(super) func: &'a mut FunctionBuilder,
}

impl Translator<'_> {
    /// Emit the structured body of `body`, terminated by the function's `end`.
    pub(super) fn translate_body(&mut self, body: &MethodBody) -> Result<()> {
        if body.instructions.is_empty() {
            self.emit_empty_body();
            return Ok(());
        }
        let schedule = TargetSchedule::analyze(body)?;
        let n = schedule.len();

        self.func.emit(Op::Loop);
        for _ in 0..n {
            self.func.emit(Op::Block);
        }
        if n > 0 {
            let selector = self.func.slot(SlotName::ResumeSelector, ValueKind::I32)?;
            self.func.emit(Op::Block);
            self.func.emit(Op::LocalGet(selector));
            self.func.emit(Op::BrTable {
                targets: (0..n as u32).collect(),
                default: n as u32,
            });
            self.func.emit(Op::End);
        }

        let mut cursor = RegionCursor::new(&schedule);
        for instr in &body.instructions {
            for _ in 0..cursor.advance_to(instr.offset) {
                self.func.emit(Op::End);
            }
            trace!(%instr, open = cursor.open_regions(), "translate");
            self.translate_instruction(instr, &cursor)?;
        }
        for _ in 0..cursor.open_regions() {
            self.func.emit(Op::End);
        }
        self.func.emit(Op::End);

        if self.func.has_result() {
            self.func.emit(Op::Unreachable);
        }
        self.func.emit(Op::End);
        Ok(())
    }

    /// Body of a method with no instructions (abstract or external).
    pub(super) fn emit_empty_body(&mut self) {
        if self.func.has_result() {
            self.func.emit(Op::Unreachable);
        }
        self.func.emit(Op::End);
    }

    /// Translate a single source instruction.
    fn translate_instruction(&mut self, instr: &Instruction, cursor: &RegionCursor) -> Result<()> {
        use OpCode::*;
        let op = instr.opcode;
        match op {
            Nop => {}

            // Arguments and locals
            Ldarg0 => self.load(SlotName::Arg(0))?,
            Ldarg1 => self.load(SlotName::Arg(1))?,
            Ldarg2 => self.load(SlotName::Arg(2))?,
            Ldarg3 => self.load(SlotName::Arg(3))?,
            LdargS | Ldarg => {
                let i = self.arg_operand(instr)?;
                self.load(SlotName::Arg(i))?;
            }
            StargS | Starg => {
                let i = self.arg_operand(instr)?;
                self.store(SlotName::Arg(i))?;
            }
            Ldloc0 => self.load(SlotName::Local(0))?,
            Ldloc1 => self.load(SlotName::Local(1))?,
            Ldloc2 => self.load(SlotName::Local(2))?,
            Ldloc3 => self.load(SlotName::Local(3))?,
            Stloc0 => self.store(SlotName::Local(0))?,
            Stloc1 => self.store(SlotName::Local(1))?,
            Stloc2 => self.store(SlotName::Local(2))?,
            Stloc3 => self.store(SlotName::Local(3))?,
            LdlocS | Ldloc => {
                let i = self.local_operand(instr)?;
                self.load(SlotName::Local(i))?;
            }
            StlocS | Stloc => {
                let i = self.local_operand(instr)?;
                self.store(SlotName::Local(i))?;
            }

            // Constants
            LdcI4M1 => self.func.emit(Op::I32Const(-1)),
            LdcI4_0 => self.func.emit(Op::I32Const(0)),
            LdcI4_1 => self.func.emit(Op::I32Const(1)),
            LdcI4_2 => self.func.emit(Op::I32Const(2)),
            LdcI4_3 => self.func.emit(Op::I32Const(3)),
            LdcI4_4 => self.func.emit(Op::I32Const(4)),
            LdcI4_5 => self.func.emit(Op::I32Const(5)),
            LdcI4_6 => self.func.emit(Op::I32Const(6)),
            LdcI4_7 => self.func.emit(Op::I32Const(7)),
            LdcI4_8 => self.func.emit(Op::I32Const(8)),
            LdcI4S | LdcI4 => match instr.operand {
                Operand::Int32(v) => self.func.emit(Op::I32Const(v)),
                _ => return Err(malformed(instr, "expected an int32 literal").into()),
            },

            // Stack
            Dup => {
                let t = self.func.slot(SlotName::DupTemp, ValueKind::I32)?;
                self.func.emit(Op::LocalSet(t));
                self.func.emit(Op::LocalGet(t));
                self.func.emit(Op::LocalGet(t));
            }
            Pop => self.func.emit(Op::Drop),
            Ret => self.func.emit(Op::Return),

            // Arithmetic
            Add => self.bin(BinOp::Add),
            Sub => self.bin(BinOp::Sub),
            Mul => self.bin(BinOp::Mul),
            Div => self.bin(BinOp::DivS),
            DivUn => self.bin(BinOp::DivU),
            Rem => self.bin(BinOp::RemS),
            RemUn => self.bin(BinOp::RemU),
            And => self.bin(BinOp::And),
            Or => self.bin(BinOp::Or),
            Xor => self.bin(BinOp::Xor),
            Shl => self.bin(BinOp::Shl),
            Shr => self.bin(BinOp::ShrS),
            ShrUn => self.bin(BinOp::ShrU),
            Neg => {
                self.func.emit(Op::I32Const(-1));
                self.bin(BinOp::Mul);
            }
            Not => {
                self.func.emit(Op::I32Const(-1));
                self.bin(BinOp::Xor);
            }

            // Comparisons
            Ceq => self.bin(BinOp::Eq),
            Cgt => self.bin(BinOp::GtS),
            CgtUn => self.bin(BinOp::GtU),
            Clt => self.bin(BinOp::LtS),
            CltUn => self.bin(BinOp::LtU),

            // Conversions within the 4-byte kind
            ConvI4 | ConvU4 | ConvI | ConvU => {}
            ConvI1 => self.func.emit(Op::I32Extend8S),
            ConvI2 => self.func.emit(Op::I32Extend16S),
            ConvU1 => {
                self.func.emit(Op::I32Const(0xff));
                self.bin(BinOp::And);
            }
            ConvU2 => {
                self.func.emit(Op::I32Const(0xffff));
                self.bin(BinOp::And);
            }

            // Branches
            BrS | Br => {
                let target = target_operand(instr)?;
                self.branch(target, cursor, false)?;
            }
            BrtrueS | Brtrue => {
                let target = target_operand(instr)?;
                self.branch(target, cursor, true)?;
            }
            BrfalseS | Brfalse => {
                let target = target_operand(instr)?;
                self.func.emit(Op::I32Eqz);
                self.branch(target, cursor, true)?;
            }
            BeqS | Beq => self.compare_branch(instr, BinOp::Eq, cursor)?,
            BneUnS | BneUn => self.compare_branch(instr, BinOp::Ne, cursor)?,
            BgeS | Bge => self.compare_branch(instr, BinOp::GeS, cursor)?,
            BgeUnS | BgeUn => self.compare_branch(instr, BinOp::GeU, cursor)?,
            BgtS | Bgt => self.compare_branch(instr, BinOp::GtS, cursor)?,
            BgtUnS | BgtUn => self.compare_branch(instr, BinOp::GtU, cursor)?,
            BleS | Ble => self.compare_branch(instr, BinOp::LeS, cursor)?,
            BleUnS | BleUn => self.compare_branch(instr, BinOp::LeU, cursor)?,
            BltS | Blt => self.compare_branch(instr, BinOp::LtS, cursor)?,
            BltUnS | BltUn => self.compare_branch(instr, BinOp::LtU, cursor)?,
            Switch => {
                let targets = match &instr.operand {
                    Operand::Targets(ts) => ts,
                    _ => return Err(malformed(instr, "expected a target list").into()),
                };
                let value = self.func.slot(SlotName::SwitchValue, ValueKind::I32)?;
                self.func.emit(Op::LocalSet(value));
                for (i, target) in targets.iter().enumerate() {
                    self.func.emit(Op::LocalGet(value));
                    self.func.emit(Op::I32Const(i as i32));
                    self.bin(BinOp::Eq);
                    self.branch(*target, cursor, true)?;
                }
            }

            // Calls and objects. Virtual calls bind to the declared target.
            Call | Callvirt => {
                let method = method_operand(instr)?;
                if method.full_name() == OBJECT_CTOR {
                    self.func.emit(Op::Drop);
                } else {
                    let idx = self.resolve_call(method)?;
                    self.func.emit(Op::Call(idx));
                }
            }
            Newobj => {
                let ctor = method_operand(instr)?;
                self.construct(ctor)?;
            }
            Ldfld => {
                let offset = self.field_operand(instr)?;
                self.func.emit(Op::I32Load { offset });
            }
            Stfld => {
                let offset = self.field_operand(instr)?;
                self.func.emit(Op::I32Store { offset });
            }

            Break | LdargaS | Ldarga | LdlocaS | Ldloca | Ldnull | LdcI8 | LdcR4 | LdcR8
            | Ldstr | Jmp | Calli | LdindI1 | LdindU1 | LdindI2 | LdindU2 | LdindI4
            | LdindU4 | LdindI8 | LdindI | LdindR4 | LdindR8 | LdindRef | StindRef | StindI1
            | StindI2 | StindI4 | StindI8 | StindR4 | StindR8 | StindI | AddOvf | SubOvf
            | MulOvf | ConvI8 | ConvR4 | ConvR8 | ConvU8 | ConvRUn | ConvOvfI4 | Ckfinite
            | Cpobj | Ldobj | Stobj | Castclass | Isinst | Unbox | UnboxAny | Box | Throw
            | Rethrow | Ldflda | Ldsfld | Ldsflda | Stsfld | Newarr | Ldlen | Ldelema
            | LdelemI4 | LdelemRef | StelemI4 | StelemRef | Ldelem | Stelem | Ldtoken
            | Endfinally | Endfilter | Leave | LeaveS | Ldftn | Ldvirtftn | Localloc
            | Initobj | Sizeof | Cpblk | Initblk | Constrained | Tail | Volatile => {
                return Err(CompileError::UnsupportedInstruction {
                    opcode: op.mnemonic().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn bin(&mut self, op: BinOp) {
        self.func.emit(Op::Bin(op));
    }

    fn load(&mut self, slot: SlotName) -> Result<()> {
        let idx = self.func.slot(slot, ValueKind::I32)?;
        self.func.emit(Op::LocalGet(idx));
        Ok(())
    }

    fn store(&mut self, slot: SlotName) -> Result<()> {
        let idx = self.func.slot(slot, ValueKind::I32)?;
        self.func.emit(Op::LocalSet(idx));
        Ok(())
    }

    fn arg_operand(&self, instr: &Instruction) -> Result<u16, CompileError> {
        match instr.operand {
            Operand::Arg(i) => Ok(i),
            _ => Err(malformed(instr, "expected an argument index")),
        }
    }

    fn local_operand(&self, instr: &Instruction) -> Result<u16, CompileError> {
        match instr.operand {
            Operand::Local(i) => Ok(i),
            _ => Err(malformed(instr, "expected a local index")),
        }
    }

    fn field_operand(&self, instr: &Instruction) -> Result<u32, CompileError> {
        match &instr.operand {
            Operand::Field(field) => {
                field_offset(self.source, field, self.options.object_header_size)
            }
            _ => Err(malformed(instr, "expected a field reference")),
        }
    }

    /// Transfer to `target`. With `conditional`, the i32 condition is on top
    /// of the stack.
    fn branch(&mut self, target: u32, cursor: &RegionCursor, conditional: bool) -> Result<()> {
        let br = |depth| if conditional { Op::BrIf(depth) } else { Op::Br(depth) };
        match cursor.depth(target)? {
            BranchDepth::Forward(depth) => self.func.emit(br(depth)),
            BranchDepth::Backward { resume, depth } => {
                // The selector is only read at the loop head, so setting it
                // on the not-taken path is harmless.
                let selector = self.func.slot(SlotName::ResumeSelector, ValueKind::I32)?;
                self.func.emit(Op::I32Const(resume));
                self.func.emit(Op::LocalSet(selector));
                self.func.emit(br(depth));
            }
        }
        Ok(())
    }

    fn compare_branch(&mut self, instr: &Instruction, cmp: BinOp, cursor: &RegionCursor) -> Result<()> {
        let target = target_operand(instr)?;
        self.bin(cmp);
        self.branch(target, cursor, true)
    }

    /// Function index of a call target: a function of this module, or a
    /// declared host import.
    fn resolve_call(&mut self, method: &MethodRef) -> Result<FuncIdx, CompileError> {
        if self.source.find_method(method).is_some() {
            Ok(self.module.reserve_function(&method.full_name()))
        } else {
            self.module
                .import_function(&import_identifier(&self.source.assembly, method))
        }
    }

    /// `newobj`: park the arguments, allocate, then call the constructor with
    /// the fresh address followed by the arguments. The address stays on the
    /// stack.
    fn construct(&mut self, ctor: &MethodRef) -> Result<()> {
        let argc = ctor.params.len() as u16;
        let mut parked = Vec::with_capacity(argc as usize);
        for i in (0..argc).rev() {
            let slot = self.func.slot(SlotName::CtorArg(i), ValueKind::I32)?;
            self.func.emit(Op::LocalSet(slot));
            parked.push(slot);
        }
        parked.reverse();

        let ty = &ctor.declaring_type;
        let handle_name = format!(
            "type:{}|{}",
            ty.scope(&self.source.assembly),
            ty.full_name()
        );
        let handle = self.module.global(&handle_name);
        let allocator = self.module.allocator();
        let addr = self.func.slot(SlotName::NewObject, ValueKind::I32)?;
        self.func.emit(Op::GlobalGet(handle));
        self.func.emit(Op::Call(allocator));
        self.func.emit(Op::LocalSet(addr));

        if ctor.full_name() != OBJECT_CTOR {
            let idx = self.resolve_call(ctor)?;
            self.func.emit(Op::LocalGet(addr));
            for slot in parked {
                self.func.emit(Op::LocalGet(slot));
            }
            self.func.emit(Op::Call(idx));
        }
        self.func.emit(Op::LocalGet(addr));
        Ok(())
    }
}

fn malformed(instr: &Instruction, detail: &str) -> CompileError {
    CompileError::MalformedOperand {
        opcode: instr.opcode.mnemonic().to_string(),
        detail: format!("{} at IL_{:04x}", detail, instr.offset),
    }
}

fn target_operand(instr: &Instruction) -> Result<u32, CompileError> {
    match instr.operand {
        Operand::Target(t) => Ok(t),
        _ => Err(malformed(instr, "expected a branch target")),
    }
}

fn method_operand(instr: &Instruction) -> Result<&MethodRef, CompileError> {
    match &instr.operand {
        Operand::Method(m) => Ok(m),
        _ => Err(malformed(instr, "expected a method reference")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostBridge;
    use crate::il::{FieldDef, TypeDef, TypeName};
    use crate::wasm::Signature;

    fn point_module(explicit: bool) -> SourceModule {
        let field = |name: &str, is_static: bool, offset: Option<u32>| FieldDef {
            name: name.to_string(),
            ty: TypeSig::I4,
            is_static,
            explicit_offset: offset,
        };
        SourceModule {
            assembly: "Lib".into(),
            types: vec![TypeDef {
                name: TypeName::parse(None, "Lib.Point"),
                is_public: true,
                explicit_layout: explicit,
                fields: vec![
                    field("x", false, explicit.then_some(0)),
                    field("count", true, None),
                    field("y", false, explicit.then_some(20)),
                ],
                methods: vec![],
            }],
        }
    }

    fn field_ref(name: &str) -> FieldRef {
        FieldRef {
            declaring_type: TypeName::parse(None, "Lib.Point"),
            name: name.into(),
            ty: TypeSig::I4,
        }
    }

    fn translate(
        source: &SourceModule,
        signature: Signature,
        body: Vec<Instruction>,
    ) -> Result<(Vec<Op>, ModuleBuilder)> {
        let options = CompileOptions::default();
        let mut module = ModuleBuilder::new(&HostBridge::default(), false);
        let mut func = FunctionBuilder::new("t".into(), signature, None);
        Translator {
            source,
            options: &options,
            module: &mut module,
            func: &mut func,
        }
        .translate_body(&MethodBody {
            locals: vec![],
            instructions: body,
            exception_regions: vec![],
        })?;
        Ok((func.body, module))
    }

    #[test]
    fn sequential_field_offsets_skip_statics() {
        let m = point_module(false);
        assert_eq!(field_offset(&m, &field_ref("x"), 8).unwrap(), 8);
        assert_eq!(field_offset(&m, &field_ref("y"), 8).unwrap(), 12);
    }

    #[test]
    fn explicit_field_offsets_follow_the_header() {
        let m = point_module(true);
        assert_eq!(field_offset(&m, &field_ref("y"), 8).unwrap(), 28);
    }

    #[test]
    fn unknown_field_is_unresolved() {
        let m = point_module(false);
        assert!(matches!(
            field_offset(&m, &field_ref("z"), 8),
            Err(CompileError::UnresolvedField { .. })
        ));
    }

    #[test]
    fn kind_function_is_total() {
        assert_eq!(value_kind(&TypeSig::Boolean), Ok(ValueKind::I32));
        assert_eq!(value_kind(&TypeSig::I4), Ok(ValueKind::I32));
        assert!(matches!(
            value_kind(&TypeSig::R8),
            Err(CompileError::UnsupportedType { .. })
        ));
        assert!(value_kind(&TypeSig::Void).is_err());
    }

    #[test]
    fn straight_line_body() -> Result<()> {
        let source = point_module(false);
        let sig = Signature::new(vec![ValueKind::I32; 2], Some(ValueKind::I32));
        let (body, _) = translate(
            &source,
            sig,
            vec![
                Instruction::simple(0, OpCode::Ldarg0),
                Instruction::simple(1, OpCode::Ldarg1),
                Instruction::simple(2, OpCode::Neg),
                Instruction::simple(3, OpCode::Add),
                Instruction::simple(4, OpCode::Ret),
            ],
        )?;
        assert_eq!(
            body,
            vec![
                Op::Loop,
                Op::LocalGet(0),
                Op::LocalGet(1),
                Op::I32Const(-1),
                Op::Bin(BinOp::Mul),
                Op::Bin(BinOp::Add),
                Op::Return,
                Op::End,
                Op::Unreachable,
                Op::End,
            ]
        );
        Ok(())
    }

    #[test]
    fn backward_branch_sets_resume_selector() -> Result<()> {
        let source = point_module(false);
        let (body, _) = translate(
            &source,
            Signature::new(vec![ValueKind::I32], None),
            vec![
                Instruction::simple(0, OpCode::Ldarg0),
                Instruction::new(1, OpCode::BrtrueS, Operand::Target(0)),
                Instruction::simple(3, OpCode::Ret),
            ],
        )?;
        // selector is local 1 (after the parameter)
        assert_eq!(
            body,
            vec![
                Op::Loop,
                Op::Block,
                Op::Block,
                Op::LocalGet(1),
                Op::BrTable {
                    targets: vec![0],
                    default: 1
                },
                Op::End,
                Op::End,
                Op::LocalGet(0),
                Op::I32Const(1),
                Op::LocalSet(1),
                Op::BrIf(0),
                Op::Return,
                Op::End,
                Op::End,
            ]
        );
        Ok(())
    }

    #[test]
    fn brfalse_inverts_with_eqz() -> Result<()> {
        let source = point_module(false);
        let (body, _) = translate(
            &source,
            Signature::new(vec![ValueKind::I32], Some(ValueKind::I32)),
            vec![
                Instruction::simple(0, OpCode::Ldarg0),
                Instruction::new(1, OpCode::BrfalseS, Operand::Target(5)),
                Instruction::simple(3, OpCode::LdcI4_1),
                Instruction::simple(4, OpCode::Ret),
                Instruction::simple(5, OpCode::LdcI4_0),
                Instruction::simple(6, OpCode::Ret),
            ],
        )?;
        let at = body.iter().position(|op| *op == Op::I32Eqz).unwrap();
        assert_eq!(body[at + 1], Op::BrIf(0));
        Ok(())
    }

    #[test]
    fn unsupported_opcode_names_itself() {
        let source = point_module(false);
        let err = translate(
            &source,
            Signature::default(),
            vec![
                Instruction::new(0, OpCode::Ldstr, Operand::String("hi".into())),
                Instruction::simple(5, OpCode::Ret),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CompileError>(),
            Some(&CompileError::UnsupportedInstruction {
                opcode: "ldstr".into()
            })
        );
    }

    #[test]
    fn external_call_needs_a_declared_import() {
        let source = point_module(false);
        let method = MethodRef {
            declaring_type: TypeName::parse(Some("Other".into()), "Other.Api"),
            name: "Go".into(),
            has_this: false,
            return_type: TypeSig::Void,
            params: vec![],
        };
        let err = translate(
            &source,
            Signature::default(),
            vec![
                Instruction::new(0, OpCode::Call, Operand::Method(method)),
                Instruction::simple(5, OpCode::Ret),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CompileError>(),
            Some(&CompileError::UnresolvedImport {
                identifier: "Other|System.Void Other.Api::Go()".into()
            })
        );
    }

    #[test]
    fn every_opcode_is_either_translated_or_rejected() {
        // Operand-free opcodes only; the point is that nothing panics.
        let source = point_module(false);
        for op in OpCode::ALL {
            if op.operand_kind() != crate::il::OperandKind::None {
                continue;
            }
            let sig = Signature::new(vec![ValueKind::I32; 4], Some(ValueKind::I32));
            let result = translate(
                &source,
                sig,
                vec![Instruction::simple(0, *op), Instruction::simple(1, OpCode::Ret)],
            );
            if let Err(err) = result {
                assert!(
                    matches!(
                        err.downcast_ref::<CompileError>(),
                        Some(CompileError::UnsupportedInstruction { .. })
                    ),
                    "{}: {}",
                    op,
                    err
                );
            }
        }
    }
}
