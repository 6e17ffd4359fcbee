//! Module Builder: owns every module-wide index space.
//!
//! Function indices are handed out in first-reference order. Imports are all
//! declared up front in [`ModuleBuilder::new`], so imported functions always
//! occupy the lowest indices; module-defined functions follow in the order
//! they were first reserved, whether by a call site or by their own
//! definition. Late-bound globals are created on first request.

mod encode;

pub use encode::encode;

use crate::config::{HostBridge, MemoryImport};
use crate::error::CompileError;
use crate::wasm::{FuncIdx, GlobalIdx, Op, Signature, TypeIdx, ValueKind};
use std::collections::HashMap;
use tracing::debug;

/// Import namespace of late-bound globals.
pub const GLOBAL_MODULE: &str = "global";

/// An imported host function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncImport {
    pub module: String,
    pub name: String,
    pub ty: TypeIdx,
}

/// An imported immutable i32 global, resolved by the host at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalImport {
    pub module: String,
    pub name: String,
}

/// A completed module-defined function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionEntry {
    /// Identity used for reservation (the method full name).
    pub name: String,
    pub signature: Signature,
    /// Non-parameter locals, in index order.
    pub locals: Vec<ValueKind>,
    /// Body, terminated by the function's final `End`.
    pub body: Vec<Op>,
    pub export: Option<String>,
}

#[derive(Debug)]
struct FunctionSlot {
    name: String,
    entry: Option<(TypeIdx, FunctionEntry)>,
}

/// Everything needed to serialize the module, in index order.
#[derive(Debug, Clone)]
pub struct ModuleImage {
    pub types: Vec<Signature>,
    pub memory: MemoryImport,
    pub func_imports: Vec<FuncImport>,
    pub globals: Vec<GlobalImport>,
    pub functions: Vec<(TypeIdx, FunctionEntry)>,
}

impl ModuleImage {
    pub fn num_imported_functions(&self) -> u32 {
        self.func_imports.len() as u32
    }

    /// `(export name, function index)` pairs in function index order.
    pub fn exports(&self) -> Vec<(&str, FuncIdx)> {
        let base = self.num_imported_functions();
        self.functions
            .iter()
            .enumerate()
            .filter_map(|(i, (_, f))| {
                f.export
                    .as_deref()
                    .map(|name| (name, FuncIdx::new(base + i as u32)))
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct ModuleBuilder {
    types: Vec<Signature>,
    type_lookup: HashMap<Signature, TypeIdx>,

    memory: MemoryImport,
    func_imports: Vec<FuncImport>,
    /// Static imports by formatted identifier.
    import_lookup: HashMap<String, FuncIdx>,
    allocator: FuncIdx,
    interop: Option<FuncIdx>,

    globals: Vec<GlobalImport>,
    global_lookup: HashMap<String, GlobalIdx>,

    functions: Vec<FunctionSlot>,
    function_lookup: HashMap<String, FuncIdx>,
}

impl ModuleBuilder {
    /// Declare every import of `bridge`. The interop invoker is declared only
    /// when `with_interop` is set.
    pub fn new(bridge: &HostBridge, with_interop: bool) -> Self {
        let mut builder = Self {
            types: Vec::new(),
            type_lookup: HashMap::new(),
            memory: bridge.memory.clone(),
            func_imports: Vec::new(),
            import_lookup: HashMap::new(),
            allocator: FuncIdx::new(0),
            interop: None,
            globals: Vec::new(),
            global_lookup: HashMap::new(),
            functions: Vec::new(),
            function_lookup: HashMap::new(),
        };

        builder.allocator = builder.declare_import(
            &bridge.allocator.module,
            &bridge.allocator.name,
            Signature::new(vec![ValueKind::I32], Some(ValueKind::I32)),
        );
        builder.declare_import(
            &bridge.logger.module,
            &bridge.logger.name,
            Signature::new(vec![ValueKind::I32], None),
        );
        if with_interop {
            let mut params = vec![ValueKind::I32, ValueKind::I32];
            params.extend([ValueKind::I32; crate::builder::MAX_INTEROP_ARGS]);
            builder.interop = Some(builder.declare_import(
                &bridge.interop.module,
                &bridge.interop.name,
                Signature::new(params, Some(ValueKind::I32)),
            ));
        }
        for decl in &bridge.imports {
            if builder.import_lookup.contains_key(&decl.name) {
                continue;
            }
            let idx = builder.declare_import(&decl.module, &decl.name, decl.signature());
            builder.import_lookup.insert(decl.name.clone(), idx);
        }
        builder
    }

    fn declare_import(&mut self, module: &str, name: &str, sig: Signature) -> FuncIdx {
        let ty = self.intern_signature(&sig);
        let idx = FuncIdx::new(self.func_imports.len() as u32);
        self.func_imports.push(FuncImport {
            module: module.to_string(),
            name: name.to_string(),
            ty,
        });
        idx
    }

    /// Return the type index of `sig`, appending it on first sight.
    pub fn intern_signature(&mut self, sig: &Signature) -> TypeIdx {
        if let Some(idx) = self.type_lookup.get(sig) {
            return *idx;
        }
        let idx = TypeIdx::new(self.types.len() as u32);
        self.types.push(sig.clone());
        self.type_lookup.insert(sig.clone(), idx);
        idx
    }

    pub fn num_imported_functions(&self) -> u32 {
        self.func_imports.len() as u32
    }

    pub fn allocator(&self) -> FuncIdx {
        self.allocator
    }

    pub fn interop_invoke(&self) -> Option<FuncIdx> {
        self.interop
    }

    /// Resolve an external method by its formatted identifier.
    pub fn import_function(&self, identifier: &str) -> Result<FuncIdx, CompileError> {
        self.import_lookup
            .get(identifier)
            .copied()
            .ok_or_else(|| CompileError::UnresolvedImport {
                identifier: identifier.to_string(),
            })
    }

    /// Late-bound global `name`, created on first request.
    pub fn global(&mut self, name: &str) -> GlobalIdx {
        if let Some(idx) = self.global_lookup.get(name) {
            return *idx;
        }
        let idx = GlobalIdx::new(self.globals.len() as u32);
        debug!(global = name, index = idx.as_u32(), "late-bound global");
        self.globals.push(GlobalImport {
            module: GLOBAL_MODULE.to_string(),
            name: name.to_string(),
        });
        self.global_lookup.insert(name.to_string(), idx);
        idx
    }

    /// Index of function `name`, reserving the next free index on first
    /// reference.
    pub fn reserve_function(&mut self, name: &str) -> FuncIdx {
        if let Some(idx) = self.function_lookup.get(name) {
            return *idx;
        }
        let idx = FuncIdx::new(self.num_imported_functions() + self.functions.len() as u32);
        debug!(function = name, index = idx.as_u32(), "reserved function index");
        self.functions.push(FunctionSlot {
            name: name.to_string(),
            entry: None,
        });
        self.function_lookup.insert(name.to_string(), idx);
        idx
    }

    /// Attach a body to the (possibly already reserved) index of `entry.name`.
    pub fn define_function(&mut self, entry: FunctionEntry) -> Result<FuncIdx, CompileError> {
        let idx = self.reserve_function(&entry.name);
        let ty = self.intern_signature(&entry.signature);
        let pos = (idx.as_u32() - self.num_imported_functions()) as usize;
        let slot = &mut self.functions[pos];
        if slot.entry.is_some() {
            return Err(CompileError::DuplicateFunction { name: entry.name });
        }
        slot.entry = Some((ty, entry));
        Ok(idx)
    }

    /// Check that every reserved index received a body and hand over the
    /// tables in index order.
    pub fn finish(self) -> Result<ModuleImage, CompileError> {
        let mut functions = Vec::with_capacity(self.functions.len());
        for slot in self.functions {
            match slot.entry {
                Some(entry) => functions.push(entry),
                None => return Err(CompileError::MissingFunctionBody { name: slot.name }),
            }
        }
        Ok(ModuleImage {
            types: self.types,
            memory: self.memory,
            func_imports: self.func_imports,
            globals: self.globals,
            functions,
        })
    }
}
