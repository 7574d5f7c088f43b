//! Program construction and emission.
//!
//! A [`ProgramBuilder`] owns the variable and register registries and the
//! ordered instruction list. Construction order is program order: each
//! builder call appends one instruction, and [`ProgramBuilder::emit`] writes
//! them back in that order.
//!
//! Each instruction is encoded into a scratch buffer before it reaches the
//! sink, so a validation failure never leaves a partial instruction in the
//! output. A sink failure part way through still leaves a truncated stream,
//! which callers must discard.

use crate::codegen::config::BuilderConfig;
use crate::codegen::errors::CodegenError;
use crate::codegen::instruction::Instruction;
use crate::codegen::operand::{Content, Operand, Register, Variable};
use crate::codegen::writer::CodeWriter;
use crate::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    config: BuilderConfig,
    variables: HashMap<u16, Arc<Variable>>,
    registers: HashMap<u16, Arc<Register>>,
    declared: HashSet<u16>,
    instructions: Vec<Instruction>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Registers variable `id` with `content`, or returns the variable already
    /// registered under `id`.
    ///
    /// On a repeated id the new content is ignored; with
    /// [`BuilderConfig::strict_variables`] it is an error instead.
    pub fn create_variable(
        &mut self,
        id: u16,
        content: impl Into<Content>,
    ) -> Result<Arc<Variable>, CodegenError> {
        if id >= self.config.max_variables {
            return Err(CodegenError::VariableIdOutOfRange {
                id,
                max: self.config.max_variables,
            });
        }

        let content: Content = content.into();
        if let Some(existing) = self.variables.get(&id) {
            if self.config.strict_variables {
                return Err(CodegenError::DuplicateVariable { id });
            }
            if existing.data() != content.into_bytes().as_slice() {
                warn!("{existing} already defined; ignoring new content");
            }
            return Ok(Arc::clone(existing));
        }

        let variable = Arc::new(Variable::new(id, content)?);
        self.variables.insert(id, Arc::clone(&variable));
        Ok(variable)
    }

    /// Registers register `id`, or returns the one already registered.
    pub fn create_register(&mut self, id: u16) -> Result<Arc<Register>, CodegenError> {
        if id >= self.config.max_registers {
            return Err(CodegenError::RegisterIdOutOfRange {
                id,
                max: self.config.max_registers,
            });
        }
        let register = self
            .registers
            .entry(id)
            .or_insert_with(|| Arc::new(Register::new(id)));
        Ok(Arc::clone(register))
    }

    pub fn variable(&self, id: u16) -> Option<Arc<Variable>> {
        self.variables.get(&id).cloned()
    }

    pub fn register(&self, id: u16) -> Option<Arc<Register>> {
        self.registers.get(&id).cloned()
    }

    /// Appends `DECLARE var`.
    pub fn declare(&mut self, var: &Arc<Variable>) -> Result<(), CodegenError> {
        self.push(Instruction::Declare(Arc::clone(var)))
    }

    /// Appends `ASSIGN dest, src`.
    pub fn assign(
        &mut self,
        dest: impl Into<Operand>,
        src: impl Into<Operand>,
    ) -> Result<(), CodegenError> {
        self.push(Instruction::Assign {
            dest: dest.into(),
            src: src.into(),
        })
    }

    /// Appends `COPY dest[dest_offset], src[src_offset], length` after checking both ranges.
    pub fn copy(
        &mut self,
        dest: impl Into<Operand>,
        dest_offset: u16,
        src: impl Into<Operand>,
        src_offset: u16,
        length: u16,
    ) -> Result<(), CodegenError> {
        self.push(Instruction::Copy {
            dest: dest.into(),
            dest_offset,
            src: src.into(),
            src_offset,
            length,
        })
    }

    /// Appends `SYSCALL number, args...`; `arg_count` must equal `args.len()`.
    pub fn syscall(
        &mut self,
        arg_count: u8,
        number: u16,
        args: Vec<Operand>,
    ) -> Result<(), CodegenError> {
        self.push(Instruction::Syscall {
            arg_count,
            number,
            args,
        })
    }

    /// Validates `instr` against this builder and appends it.
    pub fn push(&mut self, instr: Instruction) -> Result<(), CodegenError> {
        instr.validate()?;

        match &instr {
            Instruction::Declare(var) => {
                self.check_registered(var)?;
                if self.declared.contains(&var.id()) {
                    return Err(CodegenError::DoubleDeclaration { id: var.id() });
                }
            }
            Instruction::Assign { dest, src } => {
                self.check_operand(dest)?;
                self.check_operand(src)?;
            }
            Instruction::Copy { dest, src, .. } => {
                self.check_operand(dest)?;
                self.check_operand(src)?;
            }
            Instruction::Syscall { args, .. } => {
                if args.len() > usize::from(self.config.max_syscall_args) {
                    return Err(CodegenError::TooManySyscallArgs {
                        count: args.len(),
                        max: self.config.max_syscall_args,
                    });
                }
                for arg in args {
                    self.check_operand(arg)?;
                }
            }
        }

        if let Instruction::Declare(var) = &instr {
            self.declared.insert(var.id());
        }
        self.instructions.push(instr);
        Ok(())
    }

    fn check_operand(&self, operand: &Operand) -> Result<(), CodegenError> {
        match operand {
            Operand::Variable(var) => self.check_registered(var),
            Operand::Register(reg) => self.check_register(reg),
            Operand::Immediate(_) => Ok(()),
        }
    }

    /// The variable must be the instance this builder registered under its id.
    fn check_registered(&self, var: &Arc<Variable>) -> Result<(), CodegenError> {
        match self.variables.get(&var.id()) {
            Some(known) if Arc::ptr_eq(known, var) => Ok(()),
            _ => Err(CodegenError::UnknownVariable { id: var.id() }),
        }
    }

    /// Same rule for registers, so a foreign id never bypasses `max_registers`.
    fn check_register(&self, reg: &Arc<Register>) -> Result<(), CodegenError> {
        match self.registers.get(&reg.id()) {
            Some(known) if Arc::ptr_eq(known, reg) => Ok(()),
            _ => Err(CodegenError::UnknownRegister { id: reg.id() }),
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Exact size of the emitted stream.
    pub fn encoded_len(&self) -> usize {
        self.instructions.iter().map(Instruction::encoded_len).sum()
    }

    /// Writes every instruction, in construction order, to `out`.
    pub fn emit<W: Write>(&self, out: &mut CodeWriter<W>) -> Result<(), CodegenError> {
        for instr in &self.instructions {
            let encoded = instr.to_bytes()?;
            out.write_encoded(&encoded)?;
            debug!("{instr} ({} bytes)", encoded.len());
        }
        Ok(())
    }

    /// Emits the program into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodegenError> {
        let mut out = CodeWriter::in_memory();
        self.emit(&mut out)?;
        Ok(out.into_bytes())
    }

    /// Creates `path`, emits the program into it and closes it.
    ///
    /// The file is released on every path. After an error its content is
    /// truncated and must not be executed. Returns the number of bytes written.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<usize, CodegenError> {
        let path = path.as_ref();
        let mut out = CodeWriter::create(path)?;

        if let Err(err) = self.emit(&mut out) {
            error!("emitting {} failed: {err}", path.display());
            return Err(err);
        }

        let written = out.bytes_written();
        out.close()?;
        info!(
            "wrote {} instructions ({} bytes) to {}",
            self.instructions.len(),
            written,
            path.display()
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests;
