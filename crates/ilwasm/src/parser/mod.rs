//! IL listing front-end.
//!
//! Reads the textual form of an assembly into a [`SourceModule`]:
//!
//! ```text
//! .assembly MyLibrary
//! .class public MyLibrary.Point
//! {
//!   .field public int32 x
//!   .field [12] int32 y
//!   .method public static int32 Add(int32 a, int32 b) cil managed
//!   {
//!     .locals init (int32 V_0)
//!     IL_0000: ldarg.0
//!     IL_0001: ldarg.1
//!     IL_0002: add
//!     IL_0003: ret
//!   }
//! }
//! ```
//!
//! Every instruction carries an `IL_xxxx` label holding its hexadecimal byte
//! offset. A method without a `{ }` body is abstract or external.

mod lexer;

use crate::error::CompileError;
use crate::il::{
    ExceptionRegion, FieldDef, FieldRef, Instruction, MethodBody, MethodDef, MethodRef, OpCode,
    Operand, OperandKind, Param, SourceModule, TypeDef, TypeName, TypeSig,
};
use anyhow::Result;
use lexer::{tokenize, Tok, Token};

/// Parse a complete listing.
pub fn parse_listing(text: &str) -> Result<SourceModule> {
    let tokens = tokenize(text)?;
    let module = Parser { tokens, pos: 0 }.parse_module()?;
    Ok(module)
}

/// Words that may precede a class name.
const CLASS_ATTRS: &[&str] = &[
    "public", "private", "auto", "ansi", "beforefieldinit", "sealed", "abstract", "sequential",
    "explicit", "serializable", "interface", "specialname", "rtspecialname",
];

const FIELD_ATTRS: &[&str] = &[
    "public", "private", "family", "assembly", "famandassem", "famorassem", "static",
    "initonly", "literal", "notserialized", "specialname", "rtspecialname",
];

const METHOD_ATTRS: &[&str] = &[
    "public", "private", "family", "assembly", "famandassem", "famorassem", "hidebysig",
    "static", "instance", "virtual", "final", "newslot", "abstract", "specialname",
    "rtspecialname", "pinvokeimpl", "strict",
];

const IMPL_ATTRS: &[&str] = &[
    "cil", "managed", "unmanaged", "native", "runtime", "internalcall", "forwardref",
    "synchronized", "noinlining", "aggressiveinlining",
];

/// Per-method name tables for `ldarg.s a` / `ldloc.s V_0` operands.
struct NameScope {
    /// Parameter names; index 0 is the receiver of instance methods.
    args: Vec<Option<String>>,
    locals: Vec<Option<String>>,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos].tok
    }

    fn peek_at(&self, n: usize) -> &Tok {
        let i = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[i].tok
    }

    fn line(&self) -> usize {
        self.tokens[self.pos].line
    }

    fn next(&mut self) -> Tok {
        let tok = self.tokens[self.pos].tok.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            line: self.line(),
            message: message.into(),
        }
    }

    fn is_punct(&self, c: char) -> bool {
        *self.peek() == Tok::Punct(c)
    }

    fn is_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Ident(s) if s == word)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.is_punct(c) {
            self.next();
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if self.is_ident(word) {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<(), CompileError> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}', found {}", c, describe(self.peek()))))
        }
    }

    fn expect_ident(&mut self) -> Result<String, CompileError> {
        match self.peek().clone() {
            Tok::Ident(s) => {
                self.next();
                Ok(s)
            }
            other => Err(self.error(format!("expected a name, found {}", describe(&other)))),
        }
    }

    fn expect_int(&mut self) -> Result<i64, CompileError> {
        match self.peek().clone() {
            Tok::Int(v) => {
                self.next();
                Ok(v)
            }
            other => Err(self.error(format!("expected an integer, found {}", describe(&other)))),
        }
    }

    /// Consume every leading word found in `attrs`.
    fn attributes(&mut self, attrs: &[&str]) -> Vec<String> {
        let mut seen = Vec::new();
        while let Tok::Ident(s) = self.peek() {
            if !attrs.contains(&s.as_str()) {
                break;
            }
            seen.push(s.clone());
            self.next();
        }
        seen
    }

    /// Skip a balanced `{ ... }` block if one follows.
    fn skip_block(&mut self) -> Result<(), CompileError> {
        if !self.eat_punct('{') {
            return Ok(());
        }
        let mut depth = 1;
        while depth > 0 {
            match self.next() {
                Tok::Punct('{') => depth += 1,
                Tok::Punct('}') => depth -= 1,
                Tok::Eof => return Err(self.error("unterminated block")),
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_module(mut self) -> Result<SourceModule, CompileError> {
        let mut module = SourceModule::default();
        let mut named = false;
        loop {
            match self.peek().clone() {
                Tok::Eof => break,
                Tok::Ident(d) if d == ".assembly" => {
                    self.next();
                    if self.eat_ident("extern") {
                        self.expect_ident()?;
                    } else {
                        module.assembly = self.expect_ident()?;
                        named = true;
                    }
                    self.skip_block()?;
                }
                Tok::Ident(d) if d == ".module" => {
                    self.next();
                    self.expect_ident()?;
                }
                Tok::Ident(d) if d == ".class" => {
                    let ty = self.parse_class()?;
                    module.types.push(ty);
                }
                other => {
                    return Err(self.error(format!(
                        "expected .assembly, .module or .class, found {}",
                        describe(&other)
                    )))
                }
            }
        }
        if !named {
            return Err(CompileError::Syntax {
                line: 1,
                message: "listing declares no .assembly".into(),
            });
        }
        Ok(module)
    }

    fn parse_class(&mut self) -> Result<TypeDef, CompileError> {
        self.next();
        let attrs = self.attributes(CLASS_ATTRS);
        let name = TypeName::parse(None, &self.expect_ident()?);
        if self.eat_ident("extends") {
            self.parse_type_name()?;
        }
        self.expect_punct('{')?;

        let mut ty = TypeDef {
            name,
            is_public: attrs.iter().any(|a| a == "public"),
            explicit_layout: attrs.iter().any(|a| a == "explicit"),
            fields: Vec::new(),
            methods: Vec::new(),
        };

        loop {
            match self.peek().clone() {
                Tok::Punct('}') => {
                    self.next();
                    break;
                }
                Tok::Ident(d) if d == ".field" => {
                    let field = self.parse_field()?;
                    ty.fields.push(field);
                }
                Tok::Ident(d) if d == ".method" => {
                    let method = self.parse_method()?;
                    ty.methods.push(method);
                }
                Tok::Ident(d) if d == ".pack" || d == ".size" => {
                    self.next();
                    self.expect_int()?;
                }
                other => {
                    return Err(self.error(format!(
                        "expected .field, .method or '}}' in class {}, found {}",
                        ty.name,
                        describe(&other)
                    )))
                }
            }
        }
        Ok(ty)
    }

    fn parse_field(&mut self) -> Result<FieldDef, CompileError> {
        self.next();
        let mut attrs = self.attributes(FIELD_ATTRS);
        let mut explicit_offset = None;
        if self.eat_punct('[') {
            let v = self.expect_int()?;
            explicit_offset =
                Some(u32::try_from(v).map_err(|_| self.error("field offset out of range"))?);
            self.expect_punct(']')?;
            attrs.extend(self.attributes(FIELD_ATTRS));
        }
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        Ok(FieldDef {
            name,
            ty,
            is_static: attrs.iter().any(|a| a == "static"),
            explicit_offset,
        })
    }

    fn parse_method(&mut self) -> Result<MethodDef, CompileError> {
        self.next();
        let attrs = self.attributes(METHOD_ATTRS);
        let return_type = self.parse_type()?;
        let name = self.expect_ident()?;
        self.expect_punct('(')?;
        let mut params = Vec::new();
        if !self.is_punct(')') {
            loop {
                let ty = self.parse_type()?;
                let name = match self.peek() {
                    Tok::Ident(_) => Some(self.expect_ident()?),
                    _ => None,
                };
                params.push(Param { name, ty });
                if !self.eat_punct(',') {
                    break;
                }
            }
        }
        self.expect_punct(')')?;
        self.attributes(IMPL_ATTRS);

        let is_static = attrs.iter().any(|a| a == "static");
        let body = if self.is_punct('{') {
            let mut scope = NameScope {
                args: Vec::new(),
                locals: Vec::new(),
            };
            if !is_static {
                scope.args.push(None);
            }
            scope.args.extend(params.iter().map(|p: &Param| p.name.clone()));
            Some(self.parse_body(&mut scope)?)
        } else {
            None
        };

        Ok(MethodDef {
            name,
            return_type,
            params,
            is_public: attrs.iter().any(|a| a == "public"),
            is_static,
            is_virtual: attrs.iter().any(|a| a == "virtual"),
            body,
        })
    }

    fn parse_body(&mut self, scope: &mut NameScope) -> Result<MethodBody, CompileError> {
        self.expect_punct('{')?;
        let mut body = MethodBody::default();
        loop {
            match self.peek().clone() {
                Tok::Punct('}') => {
                    self.next();
                    break;
                }
                Tok::Ident(d) if d == ".maxstack" => {
                    self.next();
                    self.expect_int()?;
                }
                Tok::Ident(d) if d == ".entrypoint" => {
                    self.next();
                }
                Tok::Ident(d) if d == ".locals" => {
                    self.next();
                    self.eat_ident("init");
                    self.expect_punct('(')?;
                    if !self.is_punct(')') {
                        loop {
                            // Optional `[n]` slot number.
                            if self.eat_punct('[') {
                                self.expect_int()?;
                                self.expect_punct(']')?;
                            }
                            let ty = self.parse_type()?;
                            let name = match self.peek() {
                                Tok::Ident(_) => Some(self.expect_ident()?),
                                _ => None,
                            };
                            body.locals.push(ty);
                            scope.locals.push(name);
                            if !self.eat_punct(',') {
                                break;
                            }
                        }
                    }
                    self.expect_punct(')')?;
                }
                Tok::Ident(d) if d == ".try" => {
                    self.next();
                    let try_start = self.parse_label()?;
                    self.expect_word("to")?;
                    let try_end = self.parse_label()?;
                    if self.eat_ident("finally") || self.eat_ident("fault") {
                        self.expect_word("handler")?;
                    } else if !self.eat_ident("handler") {
                        self.expect_word("catch")?;
                        self.parse_type_name()?;
                        self.expect_word("handler")?;
                    }
                    let handler_start = self.parse_label()?;
                    self.expect_word("to")?;
                    let handler_end = self.parse_label()?;
                    body.exception_regions.push(ExceptionRegion {
                        try_start,
                        try_end,
                        handler_start,
                        handler_end,
                    });
                }
                Tok::Ident(label) if label.starts_with("IL_") => {
                    let offset = self.parse_label()?;
                    self.expect_punct(':')?;
                    let instr = self.parse_instruction(offset, scope)?;
                    body.instructions.push(instr);
                }
                other => {
                    return Err(self.error(format!(
                        "expected a labeled instruction, found {}",
                        describe(&other)
                    )))
                }
            }
        }
        Ok(body)
    }

    fn expect_word(&mut self, word: &str) -> Result<(), CompileError> {
        if self.eat_ident(word) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}', found {}", word, describe(self.peek()))))
        }
    }

    /// `IL_00a2` -> 0xa2
    fn parse_label(&mut self) -> Result<u32, CompileError> {
        let word = self.expect_ident()?;
        word.strip_prefix("IL_")
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .ok_or_else(|| self.error(format!("invalid label '{}'", word)))
    }

    fn parse_instruction(
        &mut self,
        offset: u32,
        scope: &NameScope,
    ) -> Result<Instruction, CompileError> {
        let line = self.line();
        let mnemonic = self.expect_ident()?;
        let opcode = OpCode::from_mnemonic(&mnemonic).ok_or_else(|| CompileError::Syntax {
            line,
            message: format!("unknown opcode '{}'", mnemonic),
        })?;

        let operand = match opcode.operand_kind() {
            OperandKind::None => Operand::None,
            OperandKind::Int32 => {
                let v = self.expect_int()?;
                let v = i32::try_from(v)
                    .or_else(|_| u32::try_from(v).map(|u| u as i32))
                    .map_err(|_| self.error(format!("{} does not fit in 32 bits", v)))?;
                Operand::Int32(v)
            }
            OperandKind::Int64 => Operand::Int64(self.expect_int()?),
            OperandKind::Float => match self.next() {
                Tok::Float(f) => Operand::Float(f),
                Tok::Int(i) => Operand::Float(i as f64),
                other => return Err(self.error(format!("expected a number, found {}", describe(&other)))),
            },
            OperandKind::String => match self.next() {
                Tok::Str(s) => Operand::String(s),
                other => return Err(self.error(format!("expected a string, found {}", describe(&other)))),
            },
            OperandKind::Arg => Operand::Arg(self.slot_operand(&scope.args, "argument")?),
            OperandKind::Local => Operand::Local(self.slot_operand(&scope.locals, "local")?),
            OperandKind::Target => Operand::Target(self.parse_label()?),
            OperandKind::Targets => {
                self.expect_punct('(')?;
                let mut targets = Vec::new();
                if !self.is_punct(')') {
                    loop {
                        targets.push(self.parse_label()?);
                        if !self.eat_punct(',') {
                            break;
                        }
                    }
                }
                self.expect_punct(')')?;
                Operand::Targets(targets)
            }
            OperandKind::Method => Operand::Method(self.parse_method_ref()?),
            OperandKind::Field => Operand::Field(self.parse_field_ref()?),
            OperandKind::Type => Operand::Type(self.parse_type()?),
            OperandKind::Raw => {
                let mut words = Vec::new();
                while self.line() == line && *self.peek() != Tok::Eof {
                    words.push(describe(&self.next()));
                }
                Operand::Raw(words.join(" "))
            }
        };
        Ok(Instruction::new(offset, opcode, operand))
    }

    /// Slot index given as a number or a declared name.
    fn slot_operand(&mut self, names: &[Option<String>], what: &str) -> Result<u16, CompileError> {
        match self.next() {
            Tok::Int(v) => u16::try_from(v).map_err(|_| self.error(format!("{} index {} out of range", what, v))),
            Tok::Ident(name) => names
                .iter()
                .position(|n| n.as_deref() == Some(name.as_str()))
                .map(|i| i as u16)
                .ok_or_else(|| self.error(format!("unknown {} '{}'", what, name))),
            other => Err(self.error(format!("expected {} index or name, found {}", what, describe(&other)))),
        }
    }

    /// `[Assembly]Ns.Type`
    fn parse_type_name(&mut self) -> Result<TypeName, CompileError> {
        let assembly = if self.eat_punct('[') {
            let a = self.expect_ident()?;
            self.expect_punct(']')?;
            Some(a)
        } else {
            None
        };
        let dotted = self.expect_ident()?;
        Ok(TypeName::parse(assembly, &dotted))
    }

    fn parse_type(&mut self) -> Result<TypeSig, CompileError> {
        let word = match self.peek().clone() {
            Tok::Ident(w) => w,
            Tok::Punct('[') => {
                let name = self.parse_type_name()?;
                return self.array_suffix(TypeSig::Class(name));
            }
            other => return Err(self.error(format!("expected a type, found {}", describe(&other)))),
        };
        self.next();
        let base = match word.as_str() {
            "void" => TypeSig::Void,
            "bool" => TypeSig::Boolean,
            "char" => TypeSig::Char,
            "int8" => TypeSig::I1,
            "uint8" => TypeSig::U1,
            "int16" => TypeSig::I2,
            "uint16" => TypeSig::U2,
            "int32" => TypeSig::I4,
            "uint32" => TypeSig::U4,
            "int64" => TypeSig::I8,
            "uint64" => TypeSig::U8,
            "float32" => TypeSig::R4,
            "float64" => TypeSig::R8,
            "string" => TypeSig::String,
            "object" => TypeSig::Object,
            "unsigned" => match self.expect_ident()?.as_str() {
                "int8" => TypeSig::U1,
                "int16" => TypeSig::U2,
                "int32" => TypeSig::U4,
                "int64" => TypeSig::U8,
                other => return Err(self.error(format!("invalid type 'unsigned {}'", other))),
            },
            "native" => {
                let unsigned = self.eat_ident("unsigned");
                self.expect_word("int")?;
                if unsigned {
                    TypeSig::UIntPtr
                } else {
                    TypeSig::IntPtr
                }
            }
            "class" => TypeSig::Class(self.parse_type_name()?),
            "valuetype" => TypeSig::ValueType(self.parse_type_name()?),
            dotted => TypeSig::Class(TypeName::parse(None, dotted)),
        };
        self.array_suffix(base)
    }

    fn array_suffix(&mut self, mut ty: TypeSig) -> Result<TypeSig, CompileError> {
        while self.is_punct('[') && *self.peek_at(1) == Tok::Punct(']') {
            self.next();
            self.next();
            ty = TypeSig::Array(Box::new(ty));
        }
        Ok(ty)
    }

    /// `[instance] <ret> <type>::<name>(<types>)`
    fn parse_method_ref(&mut self) -> Result<MethodRef, CompileError> {
        let has_this = self.eat_ident("instance");
        let return_type = self.parse_type()?;
        let declaring_type = self.parse_type_name()?;
        if self.next() != Tok::DoubleColon {
            return Err(self.error("expected '::' in method reference"));
        }
        let name = self.expect_ident()?;
        self.expect_punct('(')?;
        let mut params = Vec::new();
        if !self.is_punct(')') {
            loop {
                params.push(self.parse_type()?);
                if !self.eat_punct(',') {
                    break;
                }
            }
        }
        self.expect_punct(')')?;
        Ok(MethodRef {
            declaring_type,
            name,
            has_this,
            return_type,
            params,
        })
    }

    /// `<type> <type>::<name>`
    fn parse_field_ref(&mut self) -> Result<FieldRef, CompileError> {
        let ty = self.parse_type()?;
        let declaring_type = self.parse_type_name()?;
        if self.next() != Tok::DoubleColon {
            return Err(self.error("expected '::' in field reference"));
        }
        let name = self.expect_ident()?;
        Ok(FieldRef {
            declaring_type,
            name,
            ty,
        })
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Ident(s) => s.clone(),
        Tok::Int(v) => v.to_string(),
        Tok::Float(v) => v.to_string(),
        Tok::Str(s) => format!("{:?}", s),
        Tok::Punct(c) => c.to_string(),
        Tok::DoubleColon => "::".to_string(),
        Tok::Eof => "end of input".to_string(),
    }
}
