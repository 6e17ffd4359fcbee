//! Target type definitions: value kinds, signatures, index spaces and the
//! structured operator set.

use serde::Deserialize;
use std::fmt;

/// Generic index type with a phantom tag to distinguish different index spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Idx<TAG> {
    idx: u32,
    _marker: std::marker::PhantomData<TAG>,
}

impl<TAG> Idx<TAG> {
    pub fn new(idx: u32) -> Self {
        Self {
            idx,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn as_u32(&self) -> u32 {
        self.idx
    }
}

impl<TAG> fmt::Display for Idx<TAG> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.idx)
    }
}

/// Marker type for the function index space (imports first, then module-defined).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncIdxTag;
pub type FuncIdx = Idx<FuncIdxTag>;

/// Marker type for the type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIdxTag;
pub type TypeIdx = Idx<TypeIdxTag>;

/// Marker type for the global index space (late-bound imports only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalIdxTag;
pub type GlobalIdx = Idx<GlobalIdxTag>;

/// Target value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::I32 => write!(f, "i32"),
            ValueKind::I64 => write!(f, "i64"),
            ValueKind::F32 => write!(f, "f32"),
            ValueKind::F64 => write!(f, "f64"),
        }
    }
}

/// Function signature. Structural equality is the dedup key of the type table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    pub params: Vec<ValueKind>,
    pub result: Option<ValueKind>,
}

impl Signature {
    pub fn new(params: Vec<ValueKind>, result: Option<ValueKind>) -> Self {
        Self { params, result }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ") -> ")?;
        match self.result {
            Some(r) => write!(f, "{}", r),
            None => write!(f, "()"),
        }
    }
}

/// i32 binary operators (arithmetic and comparisons).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    DivS,
    DivU,
    RemS,
    RemU,
    And,
    Or,
    Xor,
    Shl,
    ShrS,
    ShrU,

    Eq,
    Ne,
    LtS,
    LtU,
    GtS,
    GtU,
    LeS,
    LeU,
    GeS,
    GeU,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "i32.add",
            BinOp::Sub => "i32.sub",
            BinOp::Mul => "i32.mul",
            BinOp::DivS => "i32.div_s",
            BinOp::DivU => "i32.div_u",
            BinOp::RemS => "i32.rem_s",
            BinOp::RemU => "i32.rem_u",
            BinOp::And => "i32.and",
            BinOp::Or => "i32.or",
            BinOp::Xor => "i32.xor",
            BinOp::Shl => "i32.shl",
            BinOp::ShrS => "i32.shr_s",
            BinOp::ShrU => "i32.shr_u",
            BinOp::Eq => "i32.eq",
            BinOp::Ne => "i32.ne",
            BinOp::LtS => "i32.lt_s",
            BinOp::LtU => "i32.lt_u",
            BinOp::GtS => "i32.gt_s",
            BinOp::GtU => "i32.gt_u",
            BinOp::LeS => "i32.le_s",
            BinOp::LeU => "i32.le_u",
            BinOp::GeS => "i32.ge_s",
            BinOp::GeU => "i32.ge_u",
        };
        write!(f, "{}", s)
    }
}

/// A structured target instruction.
///
/// Regions (`Block`/`Loop`) never carry a result type: every region boundary
/// is crossed with an empty operand stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Block,
    Loop,
    End,
    /// Break out of `n` enclosing regions (0 = innermost).
    Br(u32),
    BrIf(u32),
    BrTable {
        targets: Vec<u32>,
        default: u32,
    },
    Return,
    Unreachable,
    Drop,
    Call(FuncIdx),
    LocalGet(u32),
    LocalSet(u32),
    GlobalGet(GlobalIdx),
    I32Const(i32),
    /// Load 4 bytes from `address + offset`.
    I32Load {
        offset: u32,
    },
    /// Store 4 bytes at `address + offset`.
    I32Store {
        offset: u32,
    },
    I32Eqz,
    I32Extend8S,
    I32Extend16S,
    Bin(BinOp),
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Block => write!(f, "block"),
            Op::Loop => write!(f, "loop"),
            Op::End => write!(f, "end"),
            Op::Br(d) => write!(f, "br {}", d),
            Op::BrIf(d) => write!(f, "br_if {}", d),
            Op::BrTable { targets, default } => {
                write!(f, "br_table")?;
                for t in targets {
                    write!(f, " {}", t)?;
                }
                write!(f, " {}", default)
            }
            Op::Return => write!(f, "return"),
            Op::Unreachable => write!(f, "unreachable"),
            Op::Drop => write!(f, "drop"),
            Op::Call(idx) => write!(f, "call {}", idx),
            Op::LocalGet(i) => write!(f, "local.get {}", i),
            Op::LocalSet(i) => write!(f, "local.set {}", i),
            Op::GlobalGet(i) => write!(f, "global.get {}", i),
            Op::I32Const(v) => write!(f, "i32.const {}", v),
            Op::I32Load { offset } => write!(f, "i32.load offset={}", offset),
            Op::I32Store { offset } => write!(f, "i32.store offset={}", offset),
            Op::I32Eqz => write!(f, "i32.eqz"),
            Op::I32Extend8S => write!(f, "i32.extend8_s"),
            Op::I32Extend16S => write!(f, "i32.extend16_s"),
            Op::Bin(op) => write!(f, "{}", op),
        }
    }
}

/// Render an operator sequence as indented text, one operator per line.
pub fn render(ops: &[Op]) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for op in ops {
        if *op == Op::End {
            depth = depth.saturating_sub(1);
        }
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&op.to_string());
        out.push('\n');
        if matches!(op, Op::Block | Op::Loop) {
            depth += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_display() {
        assert_eq!(ValueKind::I32.to_string(), "i32");
        assert_eq!(ValueKind::F64.to_string(), "f64");
    }

    #[test]
    fn test_signature_equality_is_structural() {
        let a = Signature::new(vec![ValueKind::I32, ValueKind::I32], Some(ValueKind::I32));
        let b = Signature::new(vec![ValueKind::I32, ValueKind::I32], Some(ValueKind::I32));
        let c = Signature::new(vec![ValueKind::I32, ValueKind::I32], None);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "(i32 i32) -> i32");
        assert_eq!(c.to_string(), "(i32 i32) -> ()");
    }

    #[test]
    fn test_op_display() {
        assert_eq!(Op::Bin(BinOp::Add).to_string(), "i32.add");
        assert_eq!(Op::I32Load { offset: 12 }.to_string(), "i32.load offset=12");
        assert_eq!(
            Op::BrTable {
                targets: vec![0, 1],
                default: 2
            }
            .to_string(),
            "br_table 0 1 2"
        );
    }

    #[test]
    fn test_render_indents_regions() {
        let text = render(&[Op::Loop, Op::Block, Op::Br(0), Op::End, Op::End]);
        assert_eq!(text, "loop\n  block\n    br 0\n  end\nend\n");
    }
}
