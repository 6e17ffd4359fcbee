//! Source model types: module, types, fields, methods and instructions.

use super::opcode::OpCode;
use std::fmt;

/// A compiled unit: one assembly and its declared types, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceModule {
    pub assembly: String,
    pub types: Vec<TypeDef>,
}

/// A (possibly assembly-qualified) type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    /// Resolution scope; `None` means the module being compiled.
    pub assembly: Option<String>,
    pub namespace: String,
    pub name: String,
}

impl TypeName {
    /// Split a dotted name at its last `.` into namespace and name.
    pub fn parse(assembly: Option<String>, dotted: &str) -> Self {
        match dotted.rfind('.') {
            Some(pos) => Self {
                assembly,
                namespace: dotted[..pos].to_string(),
                name: dotted[pos + 1..].to_string(),
            },
            None => Self {
                assembly,
                namespace: String::new(),
                name: dotted.to_string(),
            },
        }
    }

    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// The assembly that defines this type, defaulting to `local`.
    pub fn scope<'a>(&'a self, local: &'a str) -> &'a str {
        self.assembly.as_deref().unwrap_or(local)
    }

    /// Whether the name refers to a type of the assembly named `local`.
    pub fn is_local(&self, local: &str) -> bool {
        self.scope(local) == local
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Type signature as it appears in method signatures, locals and fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    IntPtr,
    UIntPtr,
    String,
    Object,
    Class(TypeName),
    ValueType(TypeName),
    Array(Box<TypeSig>),
}

impl TypeSig {
    pub fn is_void(&self) -> bool {
        matches!(self, TypeSig::Void)
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSig::Void => write!(f, "System.Void"),
            TypeSig::Boolean => write!(f, "System.Boolean"),
            TypeSig::Char => write!(f, "System.Char"),
            TypeSig::I1 => write!(f, "System.SByte"),
            TypeSig::U1 => write!(f, "System.Byte"),
            TypeSig::I2 => write!(f, "System.Int16"),
            TypeSig::U2 => write!(f, "System.UInt16"),
            TypeSig::I4 => write!(f, "System.Int32"),
            TypeSig::U4 => write!(f, "System.UInt32"),
            TypeSig::I8 => write!(f, "System.Int64"),
            TypeSig::U8 => write!(f, "System.UInt64"),
            TypeSig::R4 => write!(f, "System.Single"),
            TypeSig::R8 => write!(f, "System.Double"),
            TypeSig::IntPtr => write!(f, "System.IntPtr"),
            TypeSig::UIntPtr => write!(f, "System.UIntPtr"),
            TypeSig::String => write!(f, "System.String"),
            TypeSig::Object => write!(f, "System.Object"),
            TypeSig::Class(name) | TypeSig::ValueType(name) => write!(f, "{}", name),
            TypeSig::Array(elem) => write!(f, "{}[]", elem),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: TypeName,
    pub is_public: bool,
    /// Fields carry explicit byte offsets.
    pub explicit_layout: bool,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
}

impl TypeDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeSig,
    pub is_static: bool,
    /// Declared byte offset (explicit layout only).
    pub explicit_offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub ty: TypeSig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub name: String,
    pub return_type: TypeSig,
    pub params: Vec<Param>,
    pub is_public: bool,
    pub is_static: bool,
    pub is_virtual: bool,
    /// `None` for abstract and external methods.
    pub body: Option<MethodBody>,
}

impl MethodDef {
    pub fn has_this(&self) -> bool {
        !self.is_static
    }

    /// A reference to this method as a call site would spell it.
    pub fn reference(&self, declaring_type: &TypeName) -> MethodRef {
        MethodRef {
            declaring_type: declaring_type.clone(),
            name: self.name.clone(),
            has_this: self.has_this(),
            return_type: self.return_type.clone(),
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
        }
    }

    /// Whether `method` names this method of `declaring_type`.
    pub fn matches(&self, declaring_type: &TypeName, method: &MethodRef) -> bool {
        self.name == method.name
            && declaring_type.full_name() == method.declaring_type.full_name()
            && self.return_type == method.return_type
            && self.params.len() == method.params.len()
            && self.params.iter().zip(&method.params).all(|(p, t)| p.ty == *t)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodBody {
    /// Declared local variable types, by index.
    pub locals: Vec<TypeSig>,
    /// Instructions in ascending offset order.
    pub instructions: Vec<Instruction>,
    pub exception_regions: Vec<ExceptionRegion>,
}

/// A protected region and its handler, as offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionRegion {
    pub try_start: u32,
    pub try_end: u32,
    pub handler_start: u32,
    pub handler_end: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: OpCode,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(offset: u32, opcode: OpCode, operand: Operand) -> Self {
        Self {
            offset,
            opcode,
            operand,
        }
    }

    pub fn simple(offset: u32, opcode: OpCode) -> Self {
        Self::new(offset, opcode, Operand::None)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.opcode)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Int32(v) => write!(f, " {}", v),
            Operand::Int64(v) => write!(f, " {}", v),
            Operand::Float(v) => write!(f, " {}", v),
            Operand::String(s) => write!(f, " {:?}", s),
            Operand::Arg(i) | Operand::Local(i) => write!(f, " {}", i),
            Operand::Target(t) => write!(f, " IL_{:04x}", t),
            Operand::Targets(ts) => {
                write!(f, " (")?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "IL_{:04x}", t)?;
                }
                write!(f, ")")
            }
            Operand::Method(m) => write!(f, " {}", m.full_name()),
            Operand::Field(fr) => write!(f, " {}", fr.full_name()),
            Operand::Type(t) => write!(f, " {}", t),
            Operand::Raw(s) => write!(f, " {}", s),
        }
    }
}

/// Decoded instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Int32(i32),
    Int64(i64),
    Float(f64),
    String(String),
    Arg(u16),
    Local(u16),
    Target(u32),
    Targets(Vec<u32>),
    Method(MethodRef),
    Field(FieldRef),
    Type(TypeSig),
    Raw(String),
}

/// A call-site reference to a method, local or external.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub declaring_type: TypeName,
    pub name: String,
    pub has_this: bool,
    pub return_type: TypeSig,
    pub params: Vec<TypeSig>,
}

impl MethodRef {
    /// Canonical signature string, e.g.
    /// `System.Int32 MyLibrary.Test::Run(System.Int32)`.
    pub fn full_name(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        format!(
            "{} {}::{}({})",
            self.return_type,
            self.declaring_type.full_name(),
            self.name,
            params.join(",")
        )
    }

    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub declaring_type: TypeName,
    pub name: String,
    pub ty: TypeSig,
}

impl FieldRef {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}::{}",
            self.ty,
            self.declaring_type.full_name(),
            self.name
        )
    }
}

impl SourceModule {
    /// Find a type of this module by name.
    pub fn find_type(&self, name: &TypeName) -> Option<&TypeDef> {
        if !name.is_local(&self.assembly) {
            return None;
        }
        let full = name.full_name();
        self.types.iter().find(|t| t.name.full_name() == full)
    }

    /// Resolve a method reference against this module's types.
    pub fn find_method(&self, method: &MethodRef) -> Option<(&TypeDef, &MethodDef)> {
        let ty = self.find_type(&method.declaring_type)?;
        ty.methods
            .iter()
            .find(|m| m.matches(&ty.name, method))
            .map(|m| (ty, m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console_write_line() -> MethodRef {
        MethodRef {
            declaring_type: TypeName::parse(Some("System.Console".into()), "System.Console"),
            name: "WriteLine".into(),
            has_this: false,
            return_type: TypeSig::Void,
            params: vec![TypeSig::I4],
        }
    }

    #[test]
    fn method_full_name_uses_clr_type_names() {
        assert_eq!(
            console_write_line().full_name(),
            "System.Void System.Console::WriteLine(System.Int32)"
        );
    }

    #[test]
    fn type_name_splits_at_last_dot() {
        let t = TypeName::parse(None, "My.Library.Point");
        assert_eq!(t.namespace, "My.Library");
        assert_eq!(t.name, "Point");
        assert_eq!(t.full_name(), "My.Library.Point");
        assert!(t.is_local("Anything"));
    }

    #[test]
    fn external_references_do_not_resolve_locally() {
        let module = SourceModule {
            assembly: "MyLibrary".into(),
            types: vec![TypeDef {
                name: TypeName::parse(None, "System.Console"),
                is_public: true,
                explicit_layout: false,
                fields: vec![],
                methods: vec![MethodDef {
                    name: "WriteLine".into(),
                    return_type: TypeSig::Void,
                    params: vec![Param {
                        name: None,
                        ty: TypeSig::I4,
                    }],
                    is_public: true,
                    is_static: true,
                    is_virtual: false,
                    body: None,
                }],
            }],
        };
        assert!(module.find_method(&console_write_line()).is_none());

        let mut local = console_write_line();
        local.declaring_type.assembly = None;
        assert!(module.find_method(&local).is_some());
    }

    #[test]
    fn instruction_display() {
        let i = Instruction::new(0x1c, OpCode::BltS, Operand::Target(0x0a));
        assert_eq!(i.to_string(), "IL_001c: blt.s IL_000a");
    }
}
