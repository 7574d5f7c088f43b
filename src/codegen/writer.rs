//! Little-endian binary output for emitted programs.
//!
//! [`BinaryWriter`] appends primitive values to any [`Write`] sink.
//! [`CodeWriter`] names those primitives after the wire fields they carry
//! (opcode, tag, reference, size, index) and performs no validation of its
//! own; operands and instructions validate before they write.
//!
//! The sink is owned by the writer. [`CodeWriter::create`] opens a file and
//! [`CodeWriter::close`] flushes it; dropping the writer on an error path
//! still releases the file.

use crate::codegen::isa::{Opcode, OperandTag};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Fixed-width little-endian encoding of a primitive wire value.
pub trait WireEncode {
    fn encode_to<W: Write>(&self, out: &mut W) -> io::Result<()>;

    /// Number of bytes `encode_to` writes.
    fn wire_len(&self) -> usize;
}

macro_rules! impl_wire_int {
    ($($t:ty),*) => {
        $(
            impl WireEncode for $t {
                fn encode_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
                    out.write_all(&self.to_le_bytes())
                }

                fn wire_len(&self) -> usize {
                    std::mem::size_of::<$t>()
                }
            }
        )*
    };
}

impl_wire_int!(u8, u16, u64, i64);

impl WireEncode for [u8] {
    fn encode_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(self)
    }

    fn wire_len(&self) -> usize {
        self.len()
    }
}

/// Sequential primitive writer over an owned sink.
#[derive(Debug)]
pub struct BinaryWriter<W: Write> {
    sink: W,
    written: usize,
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, written: 0 }
    }

    fn put<T: WireEncode + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        value.encode_to(&mut self.sink)?;
        self.written += value.wire_len();
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.put(&value)
    }

    pub fn write_u16(&mut self, value: u16) -> io::Result<()> {
        self.put(&value)
    }

    pub fn write_u64(&mut self, value: u64) -> io::Result<()> {
        self.put(&value)
    }

    pub fn write_i64(&mut self, value: i64) -> io::Result<()> {
        self.put(&value)
    }

    /// Writes `bytes` verbatim, without a length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.put(bytes)
    }

    /// Total bytes appended so far.
    pub fn bytes_written(&self) -> usize {
        self.written
    }

    /// Flushes and hands back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

/// Field-level writer used by operand and instruction emission.
#[derive(Debug)]
pub struct CodeWriter<W: Write> {
    inner: BinaryWriter<W>,
}

impl CodeWriter<Vec<u8>> {
    /// In-memory writer, used for scratch encoding and tests.
    pub fn in_memory() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the bytes written so far.
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.sink
    }
}

impl CodeWriter<BufWriter<File>> {
    /// Creates (or truncates) `path` and takes ownership of it.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CodeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            inner: BinaryWriter::new(sink),
        }
    }

    pub fn write_opcode(&mut self, opcode: Opcode) -> io::Result<()> {
        self.inner.write_u8(opcode.byte())
    }

    pub fn write_tag(&mut self, tag: OperandTag) -> io::Result<()> {
        self.inner.write_u8(tag.byte())
    }

    pub fn write_var_ref(&mut self, id: u16) -> io::Result<()> {
        self.inner.write_u16(id)
    }

    pub fn write_reg_ref(&mut self, id: u16) -> io::Result<()> {
        self.inner.write_u16(id)
    }

    pub fn write_var_size(&mut self, size: u16) -> io::Result<()> {
        self.inner.write_u16(size)
    }

    pub fn write_var_index(&mut self, index: u16) -> io::Result<()> {
        self.inner.write_u16(index)
    }

    pub fn write_copy_len(&mut self, len: u16) -> io::Result<()> {
        self.inner.write_u16(len)
    }

    pub fn write_var_data(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_bytes(data)
    }

    pub fn write_arg_count(&mut self, count: u8) -> io::Result<()> {
        self.inner.write_u8(count)
    }

    pub fn write_syscall_number(&mut self, number: u16) -> io::Result<()> {
        self.inner.write_u16(number)
    }

    pub fn write_imm_u64(&mut self, value: u64) -> io::Result<()> {
        self.inner.write_u64(value)
    }

    pub fn write_imm_i64(&mut self, value: i64) -> io::Result<()> {
        self.inner.write_i64(value)
    }

    /// Writes the text bytes followed by a single NUL terminator.
    pub fn write_imm_text(&mut self, text: &str) -> io::Result<()> {
        self.inner.write_bytes(text.as_bytes())?;
        self.inner.write_u8(0)
    }

    /// Appends an already-encoded instruction.
    pub fn write_encoded(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_bytes(bytes)
    }

    pub fn bytes_written(&self) -> usize {
        self.inner.bytes_written()
    }

    /// Flushes and releases the sink.
    pub fn close(self) -> io::Result<()> {
        self.inner.finish().map(drop)
    }

    /// Flushes and returns the sink to the caller.
    pub fn into_inner(self) -> io::Result<W> {
        self.inner.finish()
    }
}
