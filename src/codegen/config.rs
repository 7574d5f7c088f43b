//! Builder limits.
//!
//! The defaults match the reference executor: 1024-entry variable and
//! register tables and at most six syscall arguments.

pub const DEFAULT_MAX_VARIABLES: u16 = 1024;
pub const DEFAULT_MAX_REGISTERS: u16 = 1024;
pub const DEFAULT_MAX_SYSCALL_ARGS: u8 = 6;

/// Limits and policies applied by [`ProgramBuilder`](crate::codegen::program::ProgramBuilder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Variable ids must be strictly below this value.
    pub max_variables: u16,
    /// Register ids must be strictly below this value.
    pub max_registers: u16,
    pub max_syscall_args: u8,
    /// Reject a second `create_variable` for the same id instead of returning the first.
    pub strict_variables: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_variables: DEFAULT_MAX_VARIABLES,
            max_registers: DEFAULT_MAX_REGISTERS,
            max_syscall_args: DEFAULT_MAX_SYSCALL_ARGS,
            strict_variables: false,
        }
    }
}

impl BuilderConfig {
    pub fn with_max_variables(mut self, max: u16) -> Self {
        self.max_variables = max;
        self
    }

    pub fn with_max_registers(mut self, max: u16) -> Self {
        self.max_registers = max;
        self
    }

    pub fn with_max_syscall_args(mut self, max: u8) -> Self {
        self.max_syscall_args = max;
        self
    }

    pub fn with_strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;
        self
    }
}
