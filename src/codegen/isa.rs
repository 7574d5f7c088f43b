//! Instruction set definitions.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) and
//! [`for_each_operand_tag!`](crate::for_each_operand_tag) macros hold the
//! canonical byte assignments and pass them to a callback macro, so the enums
//! here and the wire-contract check in `isa_static_check` are generated from
//! the same list.
//!
//! # Wire format
//!
//! All multi-byte fields are little-endian.
//!
//! | Field | Width |
//! |---|---|
//! | opcode | 1 |
//! | operand tag | 1 |
//! | variable / register reference | 2 |
//! | variable size / index / copy length | 2 |
//! | immediate integer | 8 |
//! | immediate text | len + 1 (NUL terminated) |
//! | syscall argument count | 1 |
//! | syscall number | 2 |

use crate::codegen::errors::DecodeError;

/// Width in bytes of every register.
pub const REGISTER_WIDTH: u16 = 8;

/// Width in bytes of an integer immediate on the wire.
pub const IMMEDIATE_WIDTH: usize = 8;

/// Largest content a variable can declare; the size field is 2 bytes.
pub const MAX_VARIABLE_SIZE: usize = u16::MAX as usize;

/// Invokes `$callback` with any leading arguments followed by the opcode list.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident $(, $arg:tt)*) => {
        $callback! {
            $($arg)* ;
            /// DECLARE var ; materialise a variable's storage and initial content
            Declare = 0x11, "DECLARE",
            /// ASSIGN dst, src ; dst = src
            Assign = 0xA5, "ASSIGN",
            /// COPY dst[i], src[j], len ; copy len bytes between addressable operands
            Copy = 0xC0, "COPY",
            /// SYSCALL nr, args... ; result lands in r0
            Syscall = 0x5C, "SYSCALL",
        }
    };
}

/// Invokes `$callback` with any leading arguments followed by the operand tag list.
#[macro_export]
macro_rules! for_each_operand_tag {
    ($callback:ident $(, $arg:tt)*) => {
        $callback! {
            $($arg)* ;
            /// Literal value follows the tag.
            Immediate = 0x01, "IMM",
            /// 2-byte register id follows the tag.
            Register = 0x0E, "REG",
            /// 2-byte variable id follows the tag.
            Variable = 0x0F, "VAR",
        }
    };
}

macro_rules! define_wire_enum {
    (
        $ty:ident $err:ident $field:ident ;
        $(
            $(#[$doc:meta])*
            $name:ident = $byte:literal, $mnemonic:literal
        ),* $(,)?
    ) => {
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum $ty {
            $(
                $(#[$doc])*
                $name = $byte,
            )*
        }

        impl TryFrom<u8> for $ty {
            type Error = DecodeError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $byte => Ok($ty::$name), )*
                    _ => Err(DecodeError::$err {
                        $field: value,
                        offset: 0,
                    }),
                }
            }
        }

        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$ty] = &[$( $ty::$name ),*];

            /// Returns the byte written on the wire.
            pub const fn byte(self) -> u8 {
                self as u8
            }

            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( $ty::$name => $mnemonic, )*
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.mnemonic())
            }
        }
    };
}

for_each_opcode!(define_wire_enum, Opcode, InvalidOpcode, opcode);
for_each_operand_tag!(define_wire_enum, OperandTag, InvalidOperandTag, tag);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_bytes_match_executor() {
        assert_eq!(Opcode::Declare.byte(), 0x11);
        assert_eq!(Opcode::Assign.byte(), 0xA5);
        assert_eq!(Opcode::Copy.byte(), 0xC0);
        assert_eq!(Opcode::Syscall.byte(), 0x5C);
    }

    #[test]
    fn operand_tag_bytes_match_executor() {
        assert_eq!(OperandTag::Immediate.byte(), 0x01);
        assert_eq!(OperandTag::Register.byte(), 0x0E);
        assert_eq!(OperandTag::Variable.byte(), 0x0F);
    }

    #[test]
    fn opcode_try_from_round_trip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op.byte()).unwrap(), *op);
        }
    }

    #[test]
    fn opcode_try_from_invalid() {
        assert!(matches!(
            Opcode::try_from(0xFF),
            Err(DecodeError::InvalidOpcode { opcode: 0xFF, .. })
        ));
    }

    #[test]
    fn operand_tag_try_from_invalid() {
        for tag in 0..=255u8 {
            if OperandTag::ALL.iter().any(|t| t.byte() == tag) {
                continue;
            }
            let err = OperandTag::try_from(tag).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidOperandTag { tag: t, .. } if t == tag));
        }
    }

    #[test]
    fn opcodes_and_tags_are_unique() {
        let mut bytes: Vec<u8> = Opcode::ALL.iter().map(|op| op.byte()).collect();
        bytes.sort_unstable();
        bytes.dedup();
        assert_eq!(bytes.len(), Opcode::ALL.len());
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Opcode::Syscall.to_string(), "SYSCALL");
        assert_eq!(OperandTag::Register.mnemonic(), "REG");
    }
}
