//! Instruction model and binary emission.
//!
//! # Components
//!
//! - [`writer`]: little-endian primitive and field writers over an owned sink
//! - [`operand`]: immediates, variables and registers, and their encodings
//! - [`instruction`]: `DECLARE`, `ASSIGN`, `COPY` and `SYSCALL`
//! - [`program`]: [`ProgramBuilder`](program::ProgramBuilder), which owns the
//!   variable/register registries and emits in construction order
//! - [`decode`]: reference decoder and listing for emitted streams
//! - [`isa`]: opcode and operand tag assignments
//! - [`config`]: builder limits
//! - [`errors`]: error types
//!
//! # Example
//!
//! ```
//! use ssc::codegen::operand::Operand;
//! use ssc::codegen::program::ProgramBuilder;
//!
//! let mut program = ProgramBuilder::new();
//! let msg = program.create_variable(1, "Hello world\n").unwrap();
//! program.declare(&msg).unwrap();
//! program
//!     .syscall(3, 1, vec![Operand::from(1u64), Operand::from(&msg), Operand::from(13u64)])
//!     .unwrap();
//! let bytes = program.to_bytes().unwrap();
//! assert_eq!(bytes[0], 0x11);
//! ```

pub mod config;
pub mod decode;
pub mod errors;
pub mod instruction;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod operand;
pub mod program;
pub mod writer;
