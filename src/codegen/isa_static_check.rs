//! Pins the opcode and operand tag assignments shared with the executor.
//!
//! Changing a byte, renaming a variant or reordering the lists changes the
//! hash. Update `EXPECTED_ISA_HASH` only together with the executor.

#[cfg(test)]
mod tests {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    const EXPECTED_ISA_HASH: u64 = 0xb40a2aeeb4188637;

    fn fnv1a64(mut h: u64, bytes: &[u8]) -> u64 {
        for b in bytes {
            h ^= *b as u64;
            h = h.wrapping_mul(FNV_PRIME);
        }
        h
    }

    macro_rules! hash_entries {
        (
            $h:ident ;
            $( $(#[$doc:meta])* $name:ident = $byte:literal, $mnemonic:literal ),* $(,)?
        ) => {{
            $(
                $h = fnv1a64($h, stringify!($name).as_bytes());
                $h = fnv1a64($h, &[$byte]);
                $h = fnv1a64($h, $mnemonic.as_bytes());
            )*
        }};
    }

    fn current_isa_hash() -> u64 {
        let mut h = FNV_OFFSET;
        crate::for_each_opcode!(hash_entries, h);
        h = fnv1a64(h, b"|");
        crate::for_each_operand_tag!(hash_entries, h);
        h
    }

    #[test]
    #[ignore]
    fn print_isa_hash() {
        println!("ISA_HASH=0x{:016x}", current_isa_hash());
    }

    #[test]
    fn isa_hash_unchanged() {
        assert_eq!(current_isa_hash(), EXPECTED_ISA_HASH);
    }
}
