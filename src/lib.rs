//! Builder and binary encoder for the ssc syscall instruction set.
//!
//! Programs are built in memory from operands (immediates, variables,
//! registers) and four instructions, then emitted as a flat little-endian
//! byte stream for an external executor.

pub mod codegen;
pub mod utils;
