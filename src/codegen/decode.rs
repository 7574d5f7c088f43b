//! Reference decoder for emitted programs.
//!
//! Reads a stream the way the executor does: one opcode, then the fields of
//! that instruction. An operand tagged [`OperandTag::Immediate`] is always
//! followed by 8 bytes, so streams containing text immediates cannot be
//! decoded.

use crate::codegen::errors::DecodeError;
use crate::codegen::isa::{IMMEDIATE_WIDTH, Opcode, OperandTag};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodedOperand {
    /// Raw 64-bit value; signedness is up to the consumer.
    Immediate(u64),
    Register(u16),
    Variable(u16),
}

impl fmt::Display for DecodedOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedOperand::Immediate(v) => write!(f, "{v}"),
            DecodedOperand::Register(id) => write!(f, "%r{id}"),
            DecodedOperand::Variable(id) => write!(f, "@v{id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedInstruction {
    Declare {
        id: u16,
        data: Vec<u8>,
    },
    Assign {
        dest: DecodedOperand,
        src: DecodedOperand,
    },
    Copy {
        dest: DecodedOperand,
        dest_index: u16,
        src: DecodedOperand,
        src_index: u16,
        length: u16,
    },
    Syscall {
        number: u16,
        args: Vec<DecodedOperand>,
    },
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedInstruction::Declare { id, data } => {
                write!(f, "{} @v{}, {}", Opcode::Declare, id, data.len())
            }
            DecodedInstruction::Assign { dest, src } => {
                write!(f, "{} {}, {}", Opcode::Assign, dest, src)
            }
            DecodedInstruction::Copy {
                dest,
                dest_index,
                src,
                src_index,
                length,
            } => write!(
                f,
                "{} {}[{}], {}[{}], {}",
                Opcode::Copy,
                dest,
                dest_index,
                src,
                src_index,
                length
            ),
            DecodedInstruction::Syscall { number, args } => {
                write!(f, "{} {}", Opcode::Syscall, number)?;
                for arg in args {
                    write!(f, ", {arg}")?;
                }
                Ok(())
            }
        }
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read_exact(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        let slice = start
            .checked_add(count)
            .and_then(|end| self.data.get(start..end))
            .ok_or(DecodeError::UnexpectedEnd {
                offset: start,
                requested: count,
                available: self.data.len().saturating_sub(start),
            })?;
        self.pos += count;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_exact(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_exact(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let mut buf = [0u8; IMMEDIATE_WIDTH];
        buf.copy_from_slice(self.read_exact(IMMEDIATE_WIDTH)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_operand(&mut self) -> Result<DecodedOperand, DecodeError> {
        let offset = self.pos;
        let tag = self.read_u8()?;
        let tag = OperandTag::try_from(tag)
            .map_err(|_| DecodeError::InvalidOperandTag { tag, offset })?;
        Ok(match tag {
            OperandTag::Immediate => DecodedOperand::Immediate(self.read_u64()?),
            OperandTag::Register => DecodedOperand::Register(self.read_u16()?),
            OperandTag::Variable => DecodedOperand::Variable(self.read_u16()?),
        })
    }

    fn read_instruction(&mut self) -> Result<DecodedInstruction, DecodeError> {
        let offset = self.pos;
        let opcode = self.read_u8()?;
        let opcode = Opcode::try_from(opcode)
            .map_err(|_| DecodeError::InvalidOpcode { opcode, offset })?;

        Ok(match opcode {
            Opcode::Declare => {
                let id = self.read_u16()?;
                let size = self.read_u16()?;
                let data = self.read_exact(usize::from(size))?.to_vec();
                DecodedInstruction::Declare { id, data }
            }
            Opcode::Assign => DecodedInstruction::Assign {
                dest: self.read_operand()?,
                src: self.read_operand()?,
            },
            Opcode::Copy => DecodedInstruction::Copy {
                dest: self.read_operand()?,
                dest_index: self.read_u16()?,
                src: self.read_operand()?,
                src_index: self.read_u16()?,
                length: self.read_u16()?,
            },
            Opcode::Syscall => {
                let count = self.read_u8()?;
                let number = self.read_u16()?;
                let args = (0..count)
                    .map(|_| self.read_operand())
                    .collect::<Result<Vec<_>, _>>()?;
                DecodedInstruction::Syscall { number, args }
            }
        })
    }
}

/// Decodes a whole stream, failing on the first malformed instruction.
pub fn decode_program(bytes: &[u8]) -> Result<Vec<DecodedInstruction>, DecodeError> {
    let mut reader = Reader::new(bytes);
    let mut out = Vec::new();
    while !reader.at_end() {
        out.push(reader.read_instruction()?);
    }
    Ok(out)
}

/// Renders a stream as one listing line per instruction.
pub fn disassemble(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut listing = String::new();
    for instr in decode_program(bytes)? {
        listing.push_str(&instr.to_string());
        listing.push('\n');
    }
    Ok(listing)
}
