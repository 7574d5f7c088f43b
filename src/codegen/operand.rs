//! Operands: immediates, variables and registers.
//!
//! Every operand emits as a one-byte [`OperandTag`] followed by its
//! reference: a 2-byte id for variables and registers, the literal bytes for
//! immediates. Variables and registers are created through
//! [`ProgramBuilder`](crate::codegen::program::ProgramBuilder), which keeps
//! the canonical instance of each id; operands share it through an [`Arc`].

use crate::codegen::errors::CodegenError;
use crate::codegen::isa::{IMMEDIATE_WIDTH, MAX_VARIABLE_SIZE, OperandTag, REGISTER_WIDTH};
use crate::codegen::writer::CodeWriter;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Initial content of a variable, before conversion to raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    /// 8 bytes, unsigned.
    U64(u64),
    /// 8 bytes, two's complement.
    I64(i64),
    /// UTF-8 bytes plus a NUL terminator.
    Text(String),
    /// Stored verbatim.
    Bytes(Vec<u8>),
}

impl Content {
    /// Picks the unsigned form for non-negative values and the signed form otherwise.
    pub fn from_signed(value: i64) -> Self {
        if value >= 0 {
            Content::U64(value as u64)
        } else {
            Content::I64(value)
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Content::U64(v) => v.to_le_bytes().to_vec(),
            Content::I64(v) => v.to_le_bytes().to_vec(),
            Content::Text(s) => {
                let mut bytes = s.into_bytes();
                bytes.push(0);
                bytes
            }
            Content::Bytes(bytes) => bytes,
        }
    }
}

impl From<u64> for Content {
    fn from(value: u64) -> Self {
        Content::U64(value)
    }
}

impl From<i64> for Content {
    fn from(value: i64) -> Self {
        Content::from_signed(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<Vec<u8>> for Content {
    fn from(value: Vec<u8>) -> Self {
        Content::Bytes(value)
    }
}

impl From<&[u8]> for Content {
    fn from(value: &[u8]) -> Self {
        Content::Bytes(value.to_vec())
    }
}

/// A literal operand. Width and signedness are part of the value.
///
/// Conversions from `i64` go through [`Immediate::from_signed`], the same rule
/// [`Content`] uses, so non-negative values list as unsigned. Construct
/// `Immediate::I64` directly to keep the signed form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Immediate {
    U64(u64),
    I64(i64),
    Text(String),
}

impl Immediate {
    /// Sign-based choice between the unsigned and signed 64-bit encodings.
    pub fn from_signed(value: i64) -> Self {
        if value >= 0 {
            Immediate::U64(value as u64)
        } else {
            Immediate::I64(value)
        }
    }

    /// Payload length, excluding the tag.
    pub fn encoded_len(&self) -> usize {
        match self {
            Immediate::U64(_) | Immediate::I64(_) => IMMEDIATE_WIDTH,
            Immediate::Text(s) => s.len() + 1,
        }
    }

    fn emit_value<W: Write>(&self, out: &mut CodeWriter<W>) -> io::Result<()> {
        match self {
            Immediate::U64(v) => out.write_imm_u64(*v),
            Immediate::I64(v) => out.write_imm_i64(*v),
            Immediate::Text(s) => out.write_imm_text(s),
        }
    }
}

impl From<u64> for Immediate {
    fn from(value: u64) -> Self {
        Immediate::U64(value)
    }
}

impl From<i64> for Immediate {
    fn from(value: i64) -> Self {
        Immediate::from_signed(value)
    }
}

impl From<&str> for Immediate {
    fn from(value: &str) -> Self {
        Immediate::Text(value.to_string())
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::U64(v) => write!(f, "{v}"),
            Immediate::I64(v) => write!(f, "{v}"),
            Immediate::Text(s) => write!(f, "\"{}\"", s.escape_debug()),
        }
    }
}

/// Named storage with a fixed size, declared once per program.
#[derive(Debug, PartialEq, Eq)]
pub struct Variable {
    id: u16,
    data: Vec<u8>,
}

impl Variable {
    pub(crate) fn new(id: u16, content: Content) -> Result<Self, CodegenError> {
        let data = content.into_bytes();
        if data.len() > MAX_VARIABLE_SIZE {
            return Err(CodegenError::ContentTooLarge {
                id,
                len: data.len(),
            });
        }
        Ok(Self { id, data })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    /// Declared size in bytes; fixed at creation.
    pub fn size(&self) -> u16 {
        // `new` rejects anything longer than u16::MAX.
        self.data.len() as u16
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Fails when `size` exceeds the declared size.
    pub fn bounds_check(&self, size: u32) -> Result<(), CodegenError> {
        self.check_range(0, size)
    }

    /// Fails when `offset + length` runs past the declared size.
    pub fn check_range(&self, offset: u32, length: u32) -> Result<(), CodegenError> {
        check_range(&self.to_string(), offset, length, u32::from(self.size()))
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@v{}", self.id)
    }
}

/// Free-standing form of [`Variable::bounds_check`].
pub fn bounds_check(variable: &Variable, size: u32) -> Result<(), CodegenError> {
    variable.bounds_check(size)
}

fn check_range(operand: &str, offset: u32, length: u32, size: u32) -> Result<(), CodegenError> {
    if offset.saturating_add(length) > size {
        return Err(CodegenError::Size {
            operand: operand.to_string(),
            offset,
            length,
            size,
        });
    }
    Ok(())
}

/// A machine register. Every register is [`REGISTER_WIDTH`] bytes wide.
#[derive(Debug, PartialEq, Eq)]
pub struct Register {
    id: u16,
}

impl Register {
    pub(crate) fn new(id: u16) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub const fn width(&self) -> u16 {
        REGISTER_WIDTH
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%r{}", self.id)
    }
}

/// Any value an instruction can reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Immediate(Immediate),
    Variable(Arc<Variable>),
    Register(Arc<Register>),
}

impl Operand {
    pub fn tag(&self) -> OperandTag {
        match self {
            Operand::Immediate(_) => OperandTag::Immediate,
            Operand::Variable(_) => OperandTag::Variable,
            Operand::Register(_) => OperandTag::Register,
        }
    }

    /// Bytes written by [`Operand::emit`], tag included.
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Operand::Immediate(imm) => imm.encoded_len(),
            Operand::Variable(_) | Operand::Register(_) => 2,
        }
    }

    /// Size of the storage behind the operand, if it can be written or indexed.
    pub fn addressable_size(&self) -> Option<u16> {
        match self {
            Operand::Immediate(_) => None,
            Operand::Variable(v) => Some(v.size()),
            Operand::Register(r) => Some(r.width()),
        }
    }

    /// Fails when `offset + length` does not fit the operand's storage.
    ///
    /// Immediates have no storage and always fail with `InvalidDestination`.
    pub fn check_range(
        &self,
        instruction: &'static str,
        offset: u16,
        length: u16,
    ) -> Result<(), CodegenError> {
        let size = self
            .addressable_size()
            .ok_or_else(|| CodegenError::InvalidDestination {
                instruction,
                operand: self.to_string(),
            })?;
        check_range(
            &self.to_string(),
            u32::from(offset),
            u32::from(length),
            u32::from(size),
        )
    }

    /// Writes the tag followed by the operand's reference.
    pub fn emit<W: Write>(&self, out: &mut CodeWriter<W>) -> io::Result<()> {
        out.write_tag(self.tag())?;
        match self {
            Operand::Immediate(imm) => imm.emit_value(out),
            Operand::Variable(v) => out.write_var_ref(v.id()),
            Operand::Register(r) => out.write_reg_ref(r.id()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(imm) => fmt::Display::fmt(imm, f),
            Operand::Variable(v) => fmt::Display::fmt(v, f),
            Operand::Register(r) => fmt::Display::fmt(r, f),
        }
    }
}

impl From<Immediate> for Operand {
    fn from(value: Immediate) -> Self {
        Operand::Immediate(value)
    }
}

impl From<Arc<Variable>> for Operand {
    fn from(value: Arc<Variable>) -> Self {
        Operand::Variable(value)
    }
}

impl From<&Arc<Variable>> for Operand {
    fn from(value: &Arc<Variable>) -> Self {
        Operand::Variable(Arc::clone(value))
    }
}

impl From<Arc<Register>> for Operand {
    fn from(value: Arc<Register>) -> Self {
        Operand::Register(value)
    }
}

impl From<&Arc<Register>> for Operand {
    fn from(value: &Arc<Register>) -> Self {
        Operand::Register(Arc::clone(value))
    }
}

impl From<u64> for Operand {
    fn from(value: u64) -> Self {
        Operand::Immediate(Immediate::U64(value))
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Immediate(Immediate::from(value))
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Immediate(Immediate::from(value))
    }
}
