use super::*;
use crate::codegen::decode::{DecodedInstruction, DecodedOperand, decode_program, disassemble};
use std::io;

const HELLO: &str = "Hello world\n";

fn imm(value: u64) -> Operand {
    Operand::from(value)
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("ssc-{}-{}.ssc", name, std::process::id()))
}

/// Accepts `limit` bytes, then fails every write.
struct FailingSink {
    accepted: Vec<u8>,
    limit: usize,
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.accepted.len() + buf.len() > self.limit {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "sink full"));
        }
        self.accepted.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn hello_world_declare_and_syscall() {
    let mut b = ProgramBuilder::new();
    let v1 = b.create_variable(1, HELLO).unwrap();
    b.declare(&v1).unwrap();
    b.syscall(3, 1, vec![imm(2), Operand::from(&v1), imm(13)])
        .unwrap();

    let mut expected = vec![0x11, 0x01, 0x00, 0x0D, 0x00];
    expected.extend_from_slice(b"Hello world\n\0");
    expected.extend_from_slice(&[0x5C, 0x03, 0x01, 0x00, 0x01]);
    expected.extend_from_slice(&2u64.to_le_bytes());
    expected.extend_from_slice(&[0x0F, 0x01, 0x00, 0x01]);
    expected.extend_from_slice(&13u64.to_le_bytes());

    assert_eq!(b.to_bytes().unwrap(), expected);
    assert_eq!(b.encoded_len(), expected.len());
}

#[test]
fn register_assignments_have_no_size_field() {
    let mut b = ProgramBuilder::new();
    let r0 = b.create_register(0).unwrap();
    let r1 = b.create_register(1).unwrap();
    let r2 = b.create_register(2).unwrap();
    b.assign(&r1, imm(2)).unwrap();
    b.assign(&r2, &r0).unwrap();

    let mut expected = vec![0xA5, 0x0E, 0x01, 0x00, 0x01];
    expected.extend_from_slice(&2u64.to_le_bytes());
    expected.extend_from_slice(&[0xA5, 0x0E, 0x02, 0x00, 0x0E, 0x00, 0x00]);
    assert_eq!(b.to_bytes().unwrap(), expected);
}

#[test]
fn create_variable_is_idempotent() {
    let mut b = ProgramBuilder::new();
    let first = b.create_variable(4, "first").unwrap();
    let second = b.create_variable(4, "a much longer second value").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.size(), 6);
    assert_eq!(second.data(), b"first\0");
}

#[test]
fn strict_variables_reject_redefinition() {
    let mut b = ProgramBuilder::with_config(BuilderConfig::default().with_strict_variables(true));
    b.create_variable(4, 1u64).unwrap();
    assert!(matches!(
        b.create_variable(4, 1u64),
        Err(CodegenError::DuplicateVariable { id: 4 })
    ));
}

#[test]
fn builder_exposes_config_and_variable_lookup() {
    let config = BuilderConfig::default().with_max_syscall_args(2);
    let mut b = ProgramBuilder::with_config(config.clone());
    assert_eq!(b.config(), &config);
    assert_eq!(ProgramBuilder::new().config(), &BuilderConfig::default());

    assert!(b.variable(5).is_none());
    let v = b.create_variable(5, HELLO).unwrap();
    assert!(Arc::ptr_eq(&v, &b.variable(5).unwrap()));
}

#[test]
fn create_register_is_idempotent() {
    let mut b = ProgramBuilder::new();
    let a = b.create_register(3).unwrap();
    let c = b.create_register(3).unwrap();
    assert!(Arc::ptr_eq(&a, &c));
    assert!(Arc::ptr_eq(&a, &b.register(3).unwrap()));
    assert!(b.register(4).is_none());
}

#[test]
fn identifiers_respect_configured_limits() {
    let mut b = ProgramBuilder::with_config(
        BuilderConfig::default()
            .with_max_variables(2)
            .with_max_registers(1),
    );
    assert!(b.create_variable(1, 0u64).is_ok());
    assert!(matches!(
        b.create_variable(2, 0u64),
        Err(CodegenError::VariableIdOutOfRange { id: 2, max: 2 })
    ));
    assert!(b.create_register(0).is_ok());
    assert!(matches!(
        b.create_register(1),
        Err(CodegenError::RegisterIdOutOfRange { id: 1, max: 1 })
    ));
}

#[test]
fn default_limits_match_executor_table() {
    let mut b = ProgramBuilder::new();
    assert!(b.create_variable(1023, 0u64).is_ok());
    assert!(b.create_variable(1024, 0u64).is_err());
}

#[test]
fn copy_within_bounds_is_accepted() {
    let mut b = ProgramBuilder::new();
    let dst = b.create_variable(1, vec![0u8; 20]).unwrap();
    let src = b.create_variable(2, HELLO).unwrap();
    b.copy(&dst, 10, &src, 2, 10).unwrap();
    b.copy(&dst, 0, &src, 0, 13).unwrap();
    assert_eq!(b.len(), 2);
}

#[test]
fn copy_past_destination_is_size_error() {
    let mut b = ProgramBuilder::new();
    let dst = b.create_variable(1, vec![0u8; 20]).unwrap();
    let src = b.create_variable(2, HELLO).unwrap();
    let err = b.copy(&dst, 15, &src, 0, 6).unwrap_err();
    assert!(matches!(
        err,
        CodegenError::Size {
            offset: 15,
            length: 6,
            size: 20,
            ..
        }
    ));
    assert!(b.is_empty());
}

#[test]
fn copy_past_source_is_size_error() {
    let mut b = ProgramBuilder::new();
    let dst = b.create_variable(1, vec![0u8; 20]).unwrap();
    let src = b.create_variable(2, HELLO).unwrap();
    assert!(matches!(
        b.copy(&dst, 0, &src, 4, 10),
        Err(CodegenError::Size { size: 13, .. })
    ));
}

#[test]
fn copy_into_immediate_is_rejected() {
    let mut b = ProgramBuilder::new();
    let src = b.create_variable(2, HELLO).unwrap();
    assert!(matches!(
        b.copy(imm(0), 0, &src, 0, 1),
        Err(CodegenError::InvalidDestination { .. })
    ));
}

#[test]
fn syscall_arity_and_limit() {
    let mut b = ProgramBuilder::new();
    assert!(matches!(
        b.syscall(2, 1, vec![imm(1)]),
        Err(CodegenError::ArityMismatch {
            declared: 2,
            actual: 1
        })
    ));
    let seven: Vec<Operand> = (0..7).map(imm).collect();
    assert!(matches!(
        b.syscall(7, 1, seven),
        Err(CodegenError::TooManySyscallArgs { count: 7, max: 6 })
    ));
    b.syscall(0, 39, Vec::new()).unwrap();
    assert_eq!(b.to_bytes().unwrap(), vec![0x5C, 0x00, 0x27, 0x00]);
}

#[test]
fn variables_from_another_builder_are_rejected() {
    let mut other = ProgramBuilder::new();
    let foreign = other.create_variable(1, HELLO).unwrap();

    let mut b = ProgramBuilder::new();
    assert!(matches!(
        b.declare(&foreign),
        Err(CodegenError::UnknownVariable { id: 1 })
    ));
    let r = b.create_register(1).unwrap();
    assert!(matches!(
        b.assign(&r, &foreign),
        Err(CodegenError::UnknownVariable { id: 1 })
    ));
    assert!(b.is_empty());
}

#[test]
fn registers_from_another_builder_are_rejected() {
    let mut other = ProgramBuilder::new();
    let foreign = other.create_register(900).unwrap();

    let mut b = ProgramBuilder::with_config(BuilderConfig::default().with_max_registers(4));
    assert!(matches!(
        b.assign(&foreign, imm(1)),
        Err(CodegenError::UnknownRegister { id: 900 })
    ));

    // Same id, different instance.
    let mut twin = ProgramBuilder::new();
    let shadow = twin.create_register(1).unwrap();
    let own = b.create_register(1).unwrap();
    assert!(matches!(
        b.assign(&own, &shadow),
        Err(CodegenError::UnknownRegister { id: 1 })
    ));
    let v = b.create_variable(1, HELLO).unwrap();
    assert!(matches!(
        b.copy(&v, 0, &shadow, 0, 8),
        Err(CodegenError::UnknownRegister { id: 1 })
    ));
    assert!(matches!(
        b.syscall(1, 1, vec![Operand::from(&foreign)]),
        Err(CodegenError::UnknownRegister { id: 900 })
    ));
    assert!(b.is_empty());

    b.assign(&own, imm(1)).unwrap();
    assert_eq!(b.len(), 1);
}

#[test]
fn double_declaration_is_rejected() {
    let mut b = ProgramBuilder::new();
    let v = b.create_variable(1, HELLO).unwrap();
    b.declare(&v).unwrap();
    assert!(matches!(
        b.declare(&v),
        Err(CodegenError::DoubleDeclaration { id: 1 })
    ));
    assert_eq!(b.len(), 1);
}

#[test]
fn emission_preserves_construction_order() {
    let mut b = ProgramBuilder::new();
    let v = b.create_variable(1, HELLO).unwrap();
    let r1 = b.create_register(1).unwrap();
    b.declare(&v).unwrap();
    b.assign(&r1, imm(1)).unwrap();
    b.syscall(3, 1, vec![Operand::from(&r1), Operand::from(&v), imm(13)])
        .unwrap();

    let concatenated: Vec<u8> = b
        .instructions()
        .iter()
        .flat_map(|instr| instr.to_bytes().unwrap())
        .collect();
    assert_eq!(b.to_bytes().unwrap(), concatenated);
}

#[test]
fn declare_round_trips_through_decoder() {
    let mut b = ProgramBuilder::new();
    let v = b.create_variable(9, HELLO).unwrap();
    b.declare(&v).unwrap();

    let decoded = decode_program(&b.to_bytes().unwrap()).unwrap();
    assert_eq!(
        decoded,
        vec![DecodedInstruction::Declare {
            id: 9,
            data: b"Hello world\n\0".to_vec()
        }]
    );
}

#[test]
fn full_program_decodes_in_order() {
    let mut b = ProgramBuilder::new();
    let v1 = b.create_variable(1, HELLO).unwrap();
    let r0 = b.create_register(0).unwrap();
    let r1 = b.create_register(1).unwrap();
    let r2 = b.create_register(2).unwrap();
    b.declare(&v1).unwrap();
    b.syscall(3, 1, vec![imm(2), Operand::from(&v1), imm(13)])
        .unwrap();
    b.assign(&r1, imm(2)).unwrap();
    b.assign(&r2, &r0).unwrap();
    b.syscall(3, 1, vec![Operand::from(&r1), Operand::from(&v1), Operand::from(&r2)])
        .unwrap();
    b.copy(&r1, 0, &v1, 4, 8).unwrap();

    let bytes = b.to_bytes().unwrap();
    let decoded = decode_program(&bytes).unwrap();
    assert_eq!(decoded.len(), 6);
    assert_eq!(
        decoded[4],
        DecodedInstruction::Syscall {
            number: 1,
            args: vec![
                DecodedOperand::Register(1),
                DecodedOperand::Variable(1),
                DecodedOperand::Register(2)
            ]
        }
    );
    assert_eq!(
        disassemble(&bytes).unwrap(),
        "DECLARE @v1, 13\n\
         SYSCALL 1, 2, @v1, 13\n\
         ASSIGN %r1, 2\n\
         ASSIGN %r2, %r0\n\
         SYSCALL 1, %r1, @v1, %r2\n\
         COPY %r1[0], @v1[4], 8\n"
    );

    let listing: Vec<String> = b.instructions().iter().map(|i| i.to_string()).collect();
    let decoded_listing: Vec<String> = decoded.iter().map(|i| i.to_string()).collect();
    assert_eq!(listing, decoded_listing);
}

#[test]
fn sink_failure_surfaces_as_io_error() {
    let mut b = ProgramBuilder::new();
    let v = b.create_variable(1, HELLO).unwrap();
    b.declare(&v).unwrap();
    b.syscall(1, 60, vec![imm(0)]).unwrap();

    let declare_len = b.instructions()[0].encoded_len();
    let mut out = CodeWriter::new(FailingSink {
        accepted: Vec::new(),
        limit: declare_len,
    });
    assert!(matches!(b.emit(&mut out), Err(CodegenError::Io(_))));
    assert_eq!(out.bytes_written(), declare_len);
}

#[test]
fn write_to_file_emits_whole_program() {
    let path = temp_path("write-to-file");
    let mut b = ProgramBuilder::new();
    let v = b.create_variable(1, HELLO).unwrap();
    b.declare(&v).unwrap();
    b.syscall(3, 1, vec![imm(2), Operand::from(&v), imm(13)])
        .unwrap();

    let written = b.write_to_file(&path).unwrap();
    let on_disk = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(written, on_disk.len());
    assert_eq!(on_disk, b.to_bytes().unwrap());
}

#[test]
fn write_to_missing_directory_fails() {
    let path = temp_path("missing-dir").join("nested").join("out.ssc");
    let b = ProgramBuilder::new();
    assert!(matches!(b.write_to_file(&path), Err(CodegenError::Io(_))));
}

#[test]
fn empty_program_emits_nothing() {
    let b = ProgramBuilder::new();
    assert!(b.to_bytes().unwrap().is_empty());
    assert_eq!(b.encoded_len(), 0);
}
