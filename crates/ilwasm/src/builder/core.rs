//! Per-function state: the slot allocator and the function builder.

use crate::error::CompileError;
use crate::module::FunctionEntry;
use crate::wasm::{Op, Signature, ValueKind};
use std::collections::HashMap;
use std::fmt;

/// Symbolic name of a storage location within one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotName {
    /// Parameter, receiver included.
    Arg(u16),
    /// Declared local variable.
    Local(u16),
    /// Scratch for `dup`.
    DupTemp,
    /// Scratch for `switch`.
    SwitchValue,
    /// Constructor argument `n`, parked while the object is allocated.
    CtorArg(u16),
    /// Address returned by the allocator.
    NewObject,
    /// Schedule position + 1 to resume at after a backward branch; 0 enters
    /// the body from the top.
    ResumeSelector,
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotName::Arg(i) => write!(f, "arg{}", i),
            SlotName::Local(i) => write!(f, "loc{}", i),
            SlotName::DupTemp => write!(f, "dupTemp"),
            SlotName::SwitchValue => write!(f, "switchValue"),
            SlotName::CtorArg(i) => write!(f, "ctorparam{}", i),
            SlotName::NewObject => write!(f, "newObjectAddr"),
            SlotName::ResumeSelector => write!(f, "jumpTarget"),
        }
    }
}

/// Maps slot names to dense local indices, creating non-parameter slots on
/// first reference. A slot's kind never changes once assigned.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    slots: HashMap<SlotName, (u32, ValueKind)>,
    param_count: u32,
    /// Kinds of non-parameter locals in index order.
    locals: Vec<ValueKind>,
}

impl SlotAllocator {
    /// Parameters occupy indices `0..params.len()`.
    pub fn with_params(params: &[ValueKind]) -> Self {
        let mut slots = HashMap::new();
        for (i, kind) in params.iter().enumerate() {
            slots.insert(SlotName::Arg(i as u16), (i as u32, *kind));
        }
        Self {
            slots,
            param_count: params.len() as u32,
            locals: Vec::new(),
        }
    }

    pub fn resolve(&mut self, name: SlotName, kind: ValueKind) -> Result<u32, CompileError> {
        if let Some((index, existing)) = self.slots.get(&name) {
            if *existing != kind {
                return Err(CompileError::LocalSlotConflict {
                    slot: name.to_string(),
                    existing: *existing,
                    requested: kind,
                });
            }
            return Ok(*index);
        }
        if let SlotName::Arg(i) = name {
            return Err(CompileError::MalformedOperand {
                opcode: "argument".to_string(),
                detail: format!(
                    "index {} is outside the {} parameter(s) of the method",
                    i, self.param_count
                ),
            });
        }
        let index = self.param_count + self.locals.len() as u32;
        self.locals.push(kind);
        self.slots.insert(name, (index, kind));
        Ok(index)
    }

    pub fn locals(&self) -> &[ValueKind] {
        &self.locals
    }
}

/// Accumulates one function: signature, slots, body and export name.
#[derive(Debug)]
pub struct FunctionBuilder {
    pub name: String,
    pub signature: Signature,
    pub slots: SlotAllocator,
    pub body: Vec<Op>,
    pub export: Option<String>,
}

impl FunctionBuilder {
    pub fn new(name: String, signature: Signature, export: Option<String>) -> Self {
        let slots = SlotAllocator::with_params(&signature.params);
        Self {
            name,
            signature,
            slots,
            body: Vec::new(),
            export,
        }
    }

    pub fn emit(&mut self, op: Op) {
        self.body.push(op);
    }

    pub fn slot(&mut self, name: SlotName, kind: ValueKind) -> Result<u32, CompileError> {
        self.slots.resolve(name, kind)
    }

    pub fn has_result(&self) -> bool {
        self.signature.result.is_some()
    }

    pub fn finish(self) -> FunctionEntry {
        FunctionEntry {
            locals: self.slots.locals().to_vec(),
            name: self.name,
            signature: self.signature,
            body: self.body,
            export: self.export,
        }
    }
}
