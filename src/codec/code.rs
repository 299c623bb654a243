//! MessagePack format code constants.

// Nil
pub const NIL: u8 = 0xC0;

// 0xC1 is never used by the format.

// Boolean
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

// Bin (raw byte strings)
pub const BIN_8: u8 = 0xC4;
pub const BIN_16: u8 = 0xC5;
pub const BIN_32: u8 = 0xC6;

// Ext (length-prefixed)
pub const EXT_8: u8 = 0xC7;
pub const EXT_16: u8 = 0xC8;
pub const EXT_32: u8 = 0xC9;

// Float (IEEE 754 bit patterns)
pub const FLOAT_32: u8 = 0xCA;
pub const FLOAT_64: u8 = 0xCB;

// Unsigned integer
pub const UINT_8: u8 = 0xCC;
pub const UINT_16: u8 = 0xCD;
pub const UINT_32: u8 = 0xCE;
pub const UINT_64: u8 = 0xCF;

// Signed integer (two's complement)
pub const INT_8: u8 = 0xD0;
pub const INT_16: u8 = 0xD1;
pub const INT_32: u8 = 0xD2;
pub const INT_64: u8 = 0xD3;

// Ext (payload length fixed by the code)
pub const FIX_EXT_1: u8 = 0xD4;
pub const FIX_EXT_2: u8 = 0xD5;
pub const FIX_EXT_4: u8 = 0xD6;
pub const FIX_EXT_8: u8 = 0xD7;
pub const FIX_EXT_16: u8 = 0xD8;

// String (longer)
pub const STR_8: u8 = 0xD9;
pub const STR_16: u8 = 0xDA;
pub const STR_32: u8 = 0xDB;

// Array (longer)
pub const ARRAY_16: u8 = 0xDC;
pub const ARRAY_32: u8 = 0xDD;

// Map (longer)
pub const MAP_16: u8 = 0xDE;
pub const MAP_32: u8 = 0xDF;

// FIX_MAP: 0x80..=0x8F (low nibble = entry count 0..15)
pub const FIX_MAP: u8 = 0x80;

// FIX_ARRAY: 0x90..=0x9F (low nibble = element count 0..15)
pub const FIX_ARRAY: u8 = 0x90;

// FIX_STR: 0xA0..=0xBF (low 5 bits = byte length 0..31)
pub const FIX_STR: u8 = 0xA0;

// Positive fixint: 0x00..=0x7F (value is the code itself)
// Negative fixint: 0xE0..=0xFF (value = code as i8, -32..-1)

pub fn is_fix_str(c: u8) -> bool {
    (FIX_STR..=0xBF).contains(&c)
}

pub fn is_fix_array(c: u8) -> bool {
    (FIX_ARRAY..=0x9F).contains(&c)
}

pub fn is_fix_map(c: u8) -> bool {
    (FIX_MAP..=0x8F).contains(&c)
}

pub fn is_positive_fixint(c: u8) -> bool {
    c <= 0x7F
}

pub fn is_negative_fixint(c: u8) -> bool {
    c >= 0xE0
}

pub fn is_str_family(c: u8) -> bool {
    is_fix_str(c) || matches!(c, STR_8 | STR_16 | STR_32)
}

pub fn is_bin_family(c: u8) -> bool {
    matches!(c, BIN_8 | BIN_16 | BIN_32)
}

pub fn is_array_family(c: u8) -> bool {
    is_fix_array(c) || matches!(c, ARRAY_16 | ARRAY_32)
}

pub fn is_map_family(c: u8) -> bool {
    is_fix_map(c) || matches!(c, MAP_16 | MAP_32)
}

pub fn is_ext_family(c: u8) -> bool {
    matches!(
        c,
        EXT_8 | EXT_16 | EXT_32 | FIX_EXT_1 | FIX_EXT_2 | FIX_EXT_4 | FIX_EXT_8 | FIX_EXT_16
    )
}

/// Byte length embedded in a FixStr code.
pub fn fix_str_len(c: u8) -> usize {
    debug_assert!(is_fix_str(c));
    (c - FIX_STR) as usize
}

/// Element count embedded in a FixArray code.
pub fn fix_array_len(c: u8) -> usize {
    debug_assert!(is_fix_array(c));
    (c - FIX_ARRAY) as usize
}

/// Entry count embedded in a FixMap code.
pub fn fix_map_len(c: u8) -> usize {
    debug_assert!(is_fix_map(c));
    (c - FIX_MAP) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_family_ranges() {
        assert!(is_fix_str(0xA0));
        assert!(is_fix_str(0xBF));
        assert!(!is_fix_str(0x9F));
        assert!(!is_fix_str(0xC0));

        assert!(is_fix_array(0x90));
        assert!(is_fix_array(0x9F));
        assert!(!is_fix_array(0xA0));

        assert!(is_fix_map(0x80));
        assert!(is_fix_map(0x8F));
        assert!(!is_fix_map(0x90));
    }

    #[test]
    fn fixint_ranges() {
        assert!(is_positive_fixint(0x00));
        assert!(is_positive_fixint(0x7F));
        assert!(!is_positive_fixint(0x80));

        assert!(is_negative_fixint(0xE0));
        assert!(is_negative_fixint(0xFF));
        assert!(!is_negative_fixint(0xDF));
    }

    #[test]
    fn families_cover_long_forms() {
        assert!(is_str_family(STR_8));
        assert!(is_str_family(STR_32));
        assert!(is_bin_family(BIN_16));
        assert!(is_array_family(ARRAY_16));
        assert!(is_map_family(MAP_32));
        assert!(is_ext_family(EXT_8));
        assert!(is_ext_family(FIX_EXT_16));
        assert!(!is_ext_family(NIL));
    }

    #[test]
    fn embedded_lengths() {
        assert_eq!(fix_str_len(0xA0), 0);
        assert_eq!(fix_str_len(0xBF), 31);
        assert_eq!(fix_array_len(0x93), 3);
        assert_eq!(fix_map_len(0x82), 2);
    }
}
