use ssc_derive::Error;

/// Errors raised while building or emitting a program.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// A range access does not fit inside the operand's declared storage.
    #[error("{operand}: range {offset}+{length} exceeds size {size}")]
    Size {
        operand: String,
        offset: u32,
        length: u32,
        size: u32,
    },
    /// Variable content does not fit the 2-byte size field.
    #[error("variable @v{id}: content of {len} bytes exceeds the 65535 byte limit")]
    ContentTooLarge { id: u16, len: usize },
    #[error("variable id {id} out of range (max {max})")]
    VariableIdOutOfRange { id: u16, max: u16 },
    #[error("register id {id} out of range (max {max})")]
    RegisterIdOutOfRange { id: u16, max: u16 },
    /// Raised instead of an idempotent lookup when strict variables are enabled.
    #[error("variable @v{id} is already defined")]
    DuplicateVariable { id: u16 },
    /// The executor rejects a second initialisation of the same variable.
    #[error("variable @v{id} is declared twice")]
    DoubleDeclaration { id: u16 },
    #[error("syscall declares {declared} arguments but {actual} were given")]
    ArityMismatch { declared: u8, actual: usize },
    #[error("syscall takes at most {max} arguments, got {count}")]
    TooManySyscallArgs { count: usize, max: u8 },
    /// The operand cannot be written to or addressed by offset.
    #[error("{instruction}: {operand} is not addressable")]
    InvalidDestination {
        instruction: &'static str,
        operand: String,
    },
    #[error("variable @v{id} is not registered in this program")]
    UnknownVariable { id: u16 },
    #[error("register %r{id} is not registered in this program")]
    UnknownRegister { id: u16 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding an emitted instruction stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of stream at byte {offset}: need {requested}, have {available}")]
    UnexpectedEnd {
        offset: usize,
        requested: usize,
        available: usize,
    },
    #[error("invalid opcode 0x{opcode:02x} at byte {offset}")]
    InvalidOpcode { opcode: u8, offset: usize },
    #[error("invalid operand tag 0x{tag:02x} at byte {offset}")]
    InvalidOperandTag { tag: u8, offset: usize },
}
