//! Host harness for executing compiled modules under wasmtime.
//!
//! [`Program`] plays the role of the embedding runtime: it creates the shared
//! linear memory, provides the allocator, logger, console and interop entry
//! points, and resolves every late-bound global to a fresh handle.

use anyhow::{anyhow, bail, Result};
use ilwasm::builder::{unescape_identifier, MAX_INTEROP_ARGS};
use ilwasm::{compile_listing, CompileOptions};
use wasmtime::{
    Caller, Engine, ExternType, Global, GlobalType, Instance, Linker, Memory, MemoryType, Module,
    Mutability, Store, Val, ValType, WasmParams, WasmResults,
};

pub const ARITHMETIC: &str = include_str!("../data/il/arithmetic.il");
pub const CONTROL: &str = include_str!("../data/il/control.il");
pub const PRIMES: &str = include_str!("../data/il/primes.il");
pub const OBJECTS: &str = include_str!("../data/il/objects.il");
pub const INTEROP: &str = include_str!("../data/il/interop.il");
pub const DISPATCH: &str = include_str!("../data/il/dispatch.il");

/// First address handed out by the allocator.
pub const HEAP_BASE: u32 = 1024;
/// Bytes reserved for every object.
pub const OBJECT_SIZE: u32 = 64;

/// One call into `interop.invoke`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteropCall {
    /// Identifier recovered from the method handle.
    pub method: String,
    pub args: Vec<i32>,
}

/// An object handed out by `sys.object_new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Identifier recovered from the type handle, `<assembly>|<type>`.
    pub ty: String,
    pub addr: u32,
}

#[derive(Debug, Default)]
pub struct HostState {
    next_addr: u32,
    /// Global import names, indexed by `handle - 1`.
    handles: Vec<String>,
    pub allocations: Vec<Allocation>,
    pub console: Vec<i32>,
    pub diagnostics: Vec<i32>,
    pub interop_calls: Vec<InteropCall>,
}

impl HostState {
    fn new() -> Self {
        Self {
            next_addr: HEAP_BASE,
            ..Self::default()
        }
    }

    fn register(&mut self, name: &str) -> i32 {
        self.handles.push(name.to_string());
        self.handles.len() as i32
    }

    fn resolve(&self, handle: i32) -> String {
        usize::try_from(handle - 1)
            .ok()
            .and_then(|i| self.handles.get(i))
            .cloned()
            .unwrap_or_else(|| format!("<invalid handle {}>", handle))
    }
}

/// A compiled module instantiated against the test host.
pub struct Program {
    store: Store<HostState>,
    instance: Instance,
    memory: Memory,
}

impl Program {
    /// Compile `listing` with default options and instantiate it.
    pub fn load(listing: &str) -> Result<Self> {
        Self::load_with(listing, &CompileOptions::default())
    }

    pub fn load_with(listing: &str, options: &CompileOptions) -> Result<Self> {
        let wasm = compile_listing(listing, options)?;
        Self::instantiate(&wasm)
    }

    /// Instantiate a compiled binary, wiring every import to the host.
    pub fn instantiate(wasm: &[u8]) -> Result<Self> {
        let engine = Engine::default();
        let module = Module::new(&engine, wasm)?;
        let mut store = Store::new(&engine, HostState::new());
        let mut linker = Linker::new(&engine);

        let memory = Memory::new(&mut store, MemoryType::new(1, None))?;
        linker.define(&store, "sys", "memory", memory)?;

        linker.func_wrap(
            "sys",
            "object_new",
            |mut caller: Caller<'_, HostState>, ty: i32| -> i32 {
                let state = caller.data_mut();
                let addr = state.next_addr;
                state.next_addr += OBJECT_SIZE;
                let ty = state.resolve(ty);
                let ty = ty.strip_prefix("type:").unwrap_or(&ty).to_string();
                state.allocations.push(Allocation { ty, addr });
                addr as i32
            },
        )?;
        linker.func_wrap(
            "sys",
            "log",
            |mut caller: Caller<'_, HostState>, value: i32| {
                caller.data_mut().diagnostics.push(value);
            },
        )?;
        linker.func_wrap(
            "static",
            "System.Console|System.Void System.Console::WriteLine(System.Int32)",
            |mut caller: Caller<'_, HostState>, value: i32| {
                caller.data_mut().console.push(value);
            },
        )?;
        linker.func_wrap(
            "interop",
            "invoke",
            |mut caller: Caller<'_, HostState>,
             handle: i32,
             argc: i32,
             a0: i32,
             a1: i32,
             a2: i32,
             a3: i32|
             -> Result<i32> {
                let state = caller.data_mut();
                let name = state.resolve(handle);
                let escaped = name
                    .strip_prefix("method:")
                    .ok_or_else(|| anyhow!("{} is not a method handle", name))?;
                let method = unescape_identifier(escaped)?;
                let argc = usize::try_from(argc).map_err(|_| anyhow!("negative argc {}", argc))?;
                if argc > MAX_INTEROP_ARGS {
                    bail!("argc {} exceeds {} slots", argc, MAX_INTEROP_ARGS);
                }
                let args = [a0, a1, a2, a3][..argc].to_vec();
                // The stand-in interpreter answers with the sum of the arguments.
                let answer = args.iter().fold(0i32, |acc, v| acc.wrapping_add(*v));
                state.interop_calls.push(InteropCall { method, args });
                Ok(answer)
            },
        )?;

        for import in module.imports() {
            if let ExternType::Global(_) = import.ty() {
                let handle = store.data_mut().register(import.name());
                let global = Global::new(
                    &mut store,
                    GlobalType::new(ValType::I32, Mutability::Const),
                    Val::I32(handle),
                )?;
                linker.define(&store, import.module(), import.name(), global)?;
            }
        }

        let instance = linker.instantiate(&mut store, &module)?;
        Ok(Self {
            store,
            instance,
            memory,
        })
    }

    /// Call the export named `name` (the method's full name).
    pub fn call<P, R>(&mut self, name: &str, args: P) -> Result<R>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self
            .instance
            .get_typed_func::<P, R>(&mut self.store, name)?;
        Ok(func.call(&mut self.store, args)?)
    }

    pub fn exports(&mut self) -> Vec<String> {
        self.instance
            .exports(&mut self.store)
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Little-endian i32 at `addr` in the shared memory.
    pub fn read_i32(&self, addr: u32) -> Result<i32> {
        let data = self.memory.data(&self.store);
        let start = addr as usize;
        let bytes = data
            .get(start..start + 4)
            .ok_or_else(|| anyhow!("address {} out of bounds", addr))?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn state(&self) -> &HostState {
        self.store.data()
    }
}
