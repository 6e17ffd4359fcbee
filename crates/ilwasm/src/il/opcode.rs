//! Source opcode table.
//!
//! Every opcode the listing front-end can name is declared here together with
//! the shape of operand it carries. Whether an opcode can be translated is
//! decided by the translator, not by this table.

/// Shape of the operand an opcode carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    None,
    Int32,
    Int64,
    Float,
    String,
    Arg,
    Local,
    Target,
    Targets,
    Method,
    Field,
    Type,
    /// Call-site signature (calli); kept as raw text.
    Raw,
}

macro_rules! opcodes {
    ($($variant:ident => $mnemonic:literal, $kind:ident;)*) => {
        /// Source opcodes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OpCode {
            $($variant,)*
        }

        impl OpCode {
            pub const ALL: &'static [OpCode] = &[$(OpCode::$variant,)*];

            /// Listing mnemonic, e.g. `ldc.i4.s`.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $mnemonic,)*
                }
            }

            pub fn from_mnemonic(s: &str) -> Option<Self> {
                match s {
                    $($mnemonic => Some(OpCode::$variant),)*
                    _ => None,
                }
            }

            pub fn operand_kind(self) -> OperandKind {
                match self {
                    $(OpCode::$variant => OperandKind::$kind,)*
                }
            }
        }
    };
}

opcodes! {
    Nop => "nop", None;
    Break => "break", None;

    Ldarg0 => "ldarg.0", None;
    Ldarg1 => "ldarg.1", None;
    Ldarg2 => "ldarg.2", None;
    Ldarg3 => "ldarg.3", None;
    Ldloc0 => "ldloc.0", None;
    Ldloc1 => "ldloc.1", None;
    Ldloc2 => "ldloc.2", None;
    Ldloc3 => "ldloc.3", None;
    Stloc0 => "stloc.0", None;
    Stloc1 => "stloc.1", None;
    Stloc2 => "stloc.2", None;
    Stloc3 => "stloc.3", None;
    LdargS => "ldarg.s", Arg;
    LdargaS => "ldarga.s", Arg;
    StargS => "starg.s", Arg;
    LdlocS => "ldloc.s", Local;
    LdlocaS => "ldloca.s", Local;
    StlocS => "stloc.s", Local;
    Ldarg => "ldarg", Arg;
    Ldarga => "ldarga", Arg;
    Starg => "starg", Arg;
    Ldloc => "ldloc", Local;
    Ldloca => "ldloca", Local;
    Stloc => "stloc", Local;

    Ldnull => "ldnull", None;
    LdcI4M1 => "ldc.i4.m1", None;
    LdcI4_0 => "ldc.i4.0", None;
    LdcI4_1 => "ldc.i4.1", None;
    LdcI4_2 => "ldc.i4.2", None;
    LdcI4_3 => "ldc.i4.3", None;
    LdcI4_4 => "ldc.i4.4", None;
    LdcI4_5 => "ldc.i4.5", None;
    LdcI4_6 => "ldc.i4.6", None;
    LdcI4_7 => "ldc.i4.7", None;
    LdcI4_8 => "ldc.i4.8", None;
    LdcI4S => "ldc.i4.s", Int32;
    LdcI4 => "ldc.i4", Int32;
    LdcI8 => "ldc.i8", Int64;
    LdcR4 => "ldc.r4", Float;
    LdcR8 => "ldc.r8", Float;
    Ldstr => "ldstr", String;

    Dup => "dup", None;
    Pop => "pop", None;
    Jmp => "jmp", Method;
    Call => "call", Method;
    Calli => "calli", Raw;
    Callvirt => "callvirt", Method;
    Ret => "ret", None;

    BrS => "br.s", Target;
    BrfalseS => "brfalse.s", Target;
    BrtrueS => "brtrue.s", Target;
    BeqS => "beq.s", Target;
    BgeS => "bge.s", Target;
    BgtS => "bgt.s", Target;
    BleS => "ble.s", Target;
    BltS => "blt.s", Target;
    BneUnS => "bne.un.s", Target;
    BgeUnS => "bge.un.s", Target;
    BgtUnS => "bgt.un.s", Target;
    BleUnS => "ble.un.s", Target;
    BltUnS => "blt.un.s", Target;
    Br => "br", Target;
    Brfalse => "brfalse", Target;
    Brtrue => "brtrue", Target;
    Beq => "beq", Target;
    Bge => "bge", Target;
    Bgt => "bgt", Target;
    Ble => "ble", Target;
    Blt => "blt", Target;
    BneUn => "bne.un", Target;
    BgeUn => "bge.un", Target;
    BgtUn => "bgt.un", Target;
    BleUn => "ble.un", Target;
    BltUn => "blt.un", Target;
    Switch => "switch", Targets;

    LdindI1 => "ldind.i1", None;
    LdindU1 => "ldind.u1", None;
    LdindI2 => "ldind.i2", None;
    LdindU2 => "ldind.u2", None;
    LdindI4 => "ldind.i4", None;
    LdindU4 => "ldind.u4", None;
    LdindI8 => "ldind.i8", None;
    LdindI => "ldind.i", None;
    LdindR4 => "ldind.r4", None;
    LdindR8 => "ldind.r8", None;
    LdindRef => "ldind.ref", None;
    StindRef => "stind.ref", None;
    StindI1 => "stind.i1", None;
    StindI2 => "stind.i2", None;
    StindI4 => "stind.i4", None;
    StindI8 => "stind.i8", None;
    StindR4 => "stind.r4", None;
    StindR8 => "stind.r8", None;
    StindI => "stind.i", None;

    Add => "add", None;
    Sub => "sub", None;
    Mul => "mul", None;
    Div => "div", None;
    DivUn => "div.un", None;
    Rem => "rem", None;
    RemUn => "rem.un", None;
    And => "and", None;
    Or => "or", None;
    Xor => "xor", None;
    Shl => "shl", None;
    Shr => "shr", None;
    ShrUn => "shr.un", None;
    Neg => "neg", None;
    Not => "not", None;
    AddOvf => "add.ovf", None;
    SubOvf => "sub.ovf", None;
    MulOvf => "mul.ovf", None;

    ConvI1 => "conv.i1", None;
    ConvI2 => "conv.i2", None;
    ConvI4 => "conv.i4", None;
    ConvI8 => "conv.i8", None;
    ConvR4 => "conv.r4", None;
    ConvR8 => "conv.r8", None;
    ConvU4 => "conv.u4", None;
    ConvU8 => "conv.u8", None;
    ConvU2 => "conv.u2", None;
    ConvU1 => "conv.u1", None;
    ConvI => "conv.i", None;
    ConvU => "conv.u", None;
    ConvRUn => "conv.r.un", None;
    ConvOvfI4 => "conv.ovf.i4", None;
    Ckfinite => "ckfinite", None;

    Cpobj => "cpobj", Type;
    Ldobj => "ldobj", Type;
    Stobj => "stobj", Type;
    Newobj => "newobj", Method;
    Castclass => "castclass", Type;
    Isinst => "isinst", Type;
    Unbox => "unbox", Type;
    UnboxAny => "unbox.any", Type;
    Box => "box", Type;
    Throw => "throw", None;
    Rethrow => "rethrow", None;

    Ldfld => "ldfld", Field;
    Ldflda => "ldflda", Field;
    Stfld => "stfld", Field;
    Ldsfld => "ldsfld", Field;
    Ldsflda => "ldsflda", Field;
    Stsfld => "stsfld", Field;

    Newarr => "newarr", Type;
    Ldlen => "ldlen", None;
    Ldelema => "ldelema", Type;
    LdelemI4 => "ldelem.i4", None;
    LdelemRef => "ldelem.ref", None;
    StelemI4 => "stelem.i4", None;
    StelemRef => "stelem.ref", None;
    Ldelem => "ldelem", Type;
    Stelem => "stelem", Type;

    Ldtoken => "ldtoken", Type;
    Endfinally => "endfinally", None;
    Endfilter => "endfilter", None;
    Leave => "leave", Target;
    LeaveS => "leave.s", Target;

    Ceq => "ceq", None;
    Cgt => "cgt", None;
    CgtUn => "cgt.un", None;
    Clt => "clt", None;
    CltUn => "clt.un", None;

    Ldftn => "ldftn", Method;
    Ldvirtftn => "ldvirtftn", Method;
    Localloc => "localloc", None;
    Initobj => "initobj", Type;
    Sizeof => "sizeof", Type;
    Cpblk => "cpblk", None;
    Initblk => "initblk", None;
    Constrained => "constrained.", Type;
    Tail => "tail.", None;
    Volatile => "volatile.", None;
}

impl OpCode {
    /// Whether the opcode transfers control to an offset operand that takes
    /// part in region structuring.
    pub fn is_branch(self) -> bool {
        self.operand_kind() == OperandKind::Target && !matches!(self, OpCode::Leave | OpCode::LeaveS)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
