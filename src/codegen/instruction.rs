//! The four instructions and their byte layouts.
//!
//! ```text
//! DECLARE  0x11 var:u16 size:u16 data[size]
//! ASSIGN   0xA5 dst:operand src:operand
//! COPY     0xC0 dst:operand dst_index:u16 src:operand src_index:u16 len:u16
//! SYSCALL  0x5C argc:u8 nr:u16 arg:operand * argc
//! ```
//!
//! `emit` validates before writing the opcode, so a rejected instruction
//! writes nothing.

use crate::codegen::errors::CodegenError;
use crate::codegen::isa::Opcode;
use crate::codegen::operand::{Operand, Variable};
use crate::codegen::writer::CodeWriter;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Materialises the variable's storage with its initial content.
    Declare(Arc<Variable>),
    /// `dest = src`; `dest` must be a register or variable.
    Assign { dest: Operand, src: Operand },
    /// Copies `length` bytes from `src[src_offset..]` to `dest[dest_offset..]`.
    Copy {
        dest: Operand,
        dest_offset: u16,
        src: Operand,
        src_offset: u16,
        length: u16,
    },
    /// Invokes syscall `number`; `arg_count` must equal `args.len()`.
    Syscall {
        arg_count: u8,
        number: u16,
        args: Vec<Operand>,
    },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Declare(_) => Opcode::Declare,
            Instruction::Assign { .. } => Opcode::Assign,
            Instruction::Copy { .. } => Opcode::Copy,
            Instruction::Syscall { .. } => Opcode::Syscall,
        }
    }

    /// Checks operand kinds, copy ranges and syscall arity.
    pub fn validate(&self) -> Result<(), CodegenError> {
        match self {
            Instruction::Declare(_) => Ok(()),
            Instruction::Assign { dest, .. } => {
                if dest.addressable_size().is_none() {
                    return Err(CodegenError::InvalidDestination {
                        instruction: Opcode::Assign.mnemonic(),
                        operand: dest.to_string(),
                    });
                }
                Ok(())
            }
            Instruction::Copy {
                dest,
                dest_offset,
                src,
                src_offset,
                length,
            } => {
                let name = Opcode::Copy.mnemonic();
                dest.check_range(name, *dest_offset, *length)?;
                src.check_range(name, *src_offset, *length)
            }
            Instruction::Syscall {
                arg_count, args, ..
            } => {
                if usize::from(*arg_count) != args.len() {
                    return Err(CodegenError::ArityMismatch {
                        declared: *arg_count,
                        actual: args.len(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Exact number of bytes `emit` writes.
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Instruction::Declare(var) => 2 + 2 + var.data().len(),
            Instruction::Assign { dest, src } => dest.encoded_len() + src.encoded_len(),
            Instruction::Copy { dest, src, .. } => {
                dest.encoded_len() + 2 + src.encoded_len() + 2 + 2
            }
            Instruction::Syscall { args, .. } => {
                1 + 2 + args.iter().map(Operand::encoded_len).sum::<usize>()
            }
        }
    }

    pub fn emit<W: Write>(&self, out: &mut CodeWriter<W>) -> Result<(), CodegenError> {
        self.validate()?;
        out.write_opcode(self.opcode())?;

        match self {
            Instruction::Declare(var) => {
                out.write_var_ref(var.id())?;
                out.write_var_size(var.size())?;
                out.write_var_data(var.data())?;
            }
            Instruction::Assign { dest, src } => {
                dest.emit(out)?;
                src.emit(out)?;
            }
            Instruction::Copy {
                dest,
                dest_offset,
                src,
                src_offset,
                length,
            } => {
                dest.emit(out)?;
                out.write_var_index(*dest_offset)?;
                src.emit(out)?;
                out.write_var_index(*src_offset)?;
                out.write_copy_len(*length)?;
            }
            Instruction::Syscall {
                arg_count,
                number,
                args,
            } => {
                out.write_arg_count(*arg_count)?;
                out.write_syscall_number(*number)?;
                for arg in args {
                    arg.emit(out)?;
                }
            }
        }
        Ok(())
    }

    /// Encodes into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodegenError> {
        let mut out = CodeWriter::in_memory();
        self.emit(&mut out)?;
        Ok(out.into_bytes())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode())?;
        match self {
            Instruction::Declare(var) => write!(f, " {}, {}", var, var.size()),
            Instruction::Assign { dest, src } => write!(f, " {}, {}", dest, src),
            Instruction::Copy {
                dest,
                dest_offset,
                src,
                src_offset,
                length,
            } => write!(
                f,
                " {}[{}], {}[{}], {}",
                dest, dest_offset, src, src_offset, length
            ),
            Instruction::Syscall { number, args, .. } => {
                write!(f, " {}", number)?;
                for arg in args {
                    write!(f, ", {}", arg)?;
                }
                Ok(())
            }
        }
    }
}
