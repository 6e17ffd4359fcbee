//! Serialization of a [`ModuleImage`] with `wasm-encoder`.
//!
//! Section order is fixed: type, import, function, export, code. All
//! imports of one kind are contiguous (memory, functions, globals).

use super::ModuleImage;
use crate::wasm::{BinOp, Op, ValueKind};
use std::borrow::Cow;
use wasm_encoder::{
    CodeSection, EntityType, ExportKind, ExportSection, Function, FunctionSection, GlobalType,
    ImportSection, Instruction, MemArg, MemoryType, Module, TypeSection, ValType,
};

impl From<ValueKind> for ValType {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::I32 => ValType::I32,
            ValueKind::I64 => ValType::I64,
            ValueKind::F32 => ValType::F32,
            ValueKind::F64 => ValType::F64,
        }
    }
}

/// Encode the module to its binary form.
pub fn encode(image: &ModuleImage) -> Vec<u8> {
    let mut module = Module::new();

    let mut types = TypeSection::new();
    for sig in &image.types {
        let params: Vec<ValType> = sig.params.iter().map(|k| (*k).into()).collect();
        let results: Vec<ValType> = sig.result.iter().map(|k| (*k).into()).collect();
        types.ty().function(params, results);
    }

    let mut imports = ImportSection::new();
    imports.import(
        &image.memory.module,
        &image.memory.name,
        EntityType::Memory(MemoryType {
            minimum: image.memory.minimum_pages,
            maximum: None,
            memory64: false,
            shared: false,
            page_size_log2: None,
        }),
    );
    for import in &image.func_imports {
        imports.import(
            &import.module,
            &import.name,
            EntityType::Function(import.ty.as_u32()),
        );
    }
    for global in &image.globals {
        imports.import(
            &global.module,
            &global.name,
            EntityType::Global(GlobalType {
                val_type: ValType::I32,
                mutable: false,
                shared: false,
            }),
        );
    }

    let mut functions = FunctionSection::new();
    for (ty, _) in &image.functions {
        functions.function(ty.as_u32());
    }

    let mut exports = ExportSection::new();
    for (name, idx) in image.exports() {
        exports.export(name, ExportKind::Func, idx.as_u32());
    }

    let mut code = CodeSection::new();
    for (_, entry) in &image.functions {
        let mut func = Function::new(group_locals(&entry.locals));
        for op in &entry.body {
            func.instruction(&lower(op));
        }
        code.function(&func);
    }

    module.section(&types);
    module.section(&imports);
    module.section(&functions);
    module.section(&exports);
    module.section(&code);
    module.finish()
}

/// Collapse consecutive locals of one kind into `(count, type)` runs.
fn group_locals(locals: &[ValueKind]) -> Vec<(u32, ValType)> {
    let mut runs: Vec<(u32, ValueKind)> = Vec::new();
    for kind in locals {
        match runs.last_mut() {
            Some((count, last)) if last == kind => *count += 1,
            _ => runs.push((1, *kind)),
        }
    }
    runs.into_iter().map(|(n, k)| (n, k.into())).collect()
}

fn mem_arg(offset: u32) -> MemArg {
    MemArg {
        offset: u64::from(offset),
        align: 2,
        memory_index: 0,
    }
}

fn lower(op: &Op) -> Instruction<'static> {
    match op {
        Op::Block => Instruction::Block(wasm_encoder::BlockType::Empty),
        Op::Loop => Instruction::Loop(wasm_encoder::BlockType::Empty),
        Op::End => Instruction::End,
        Op::Br(d) => Instruction::Br(*d),
        Op::BrIf(d) => Instruction::BrIf(*d),
        Op::BrTable { targets, default } => {
            Instruction::BrTable(Cow::Owned(targets.clone()), *default)
        }
        Op::Return => Instruction::Return,
        Op::Unreachable => Instruction::Unreachable,
        Op::Drop => Instruction::Drop,
        Op::Call(idx) => Instruction::Call(idx.as_u32()),
        Op::LocalGet(i) => Instruction::LocalGet(*i),
        Op::LocalSet(i) => Instruction::LocalSet(*i),
        Op::GlobalGet(i) => Instruction::GlobalGet(i.as_u32()),
        Op::I32Const(v) => Instruction::I32Const(*v),
        Op::I32Load { offset } => Instruction::I32Load(mem_arg(*offset)),
        Op::I32Store { offset } => Instruction::I32Store(mem_arg(*offset)),
        Op::I32Eqz => Instruction::I32Eqz,
        Op::I32Extend8S => Instruction::I32Extend8S,
        Op::I32Extend16S => Instruction::I32Extend16S,
        Op::Bin(bin) => match bin {
            BinOp::Add => Instruction::I32Add,
            BinOp::Sub => Instruction::I32Sub,
            BinOp::Mul => Instruction::I32Mul,
            BinOp::DivS => Instruction::I32DivS,
            BinOp::DivU => Instruction::I32DivU,
            BinOp::RemS => Instruction::I32RemS,
            BinOp::RemU => Instruction::I32RemU,
            BinOp::And => Instruction::I32And,
            BinOp::Or => Instruction::I32Or,
            BinOp::Xor => Instruction::I32Xor,
            BinOp::Shl => Instruction::I32Shl,
            BinOp::ShrS => Instruction::I32ShrS,
            BinOp::ShrU => Instruction::I32ShrU,
            BinOp::Eq => Instruction::I32Eq,
            BinOp::Ne => Instruction::I32Ne,
            BinOp::LtS => Instruction::I32LtS,
            BinOp::LtU => Instruction::I32LtU,
            BinOp::GtS => Instruction::I32GtS,
            BinOp::GtU => Instruction::I32GtU,
            BinOp::LeS => Instruction::I32LeS,
            BinOp::LeU => Instruction::I32LeU,
            BinOp::GeS => Instruction::I32GeS,
            BinOp::GeU => Instruction::I32GeU,
        },
    }
}
