//! Digit lookup tables for the conversion fast paths.
//!
//! The `to_chars` tables hold fixed-width digit groups ("00", "01", … for
//! base 10) so the hot loop emits several digits per division. The
//! `from_chars` table maps a byte to its digit value, `0xFF` for bytes
//! that are not a digit in any base.

const LOWER: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const fn build_lut<const N: usize>(base: usize, width: usize, uppercase: bool) -> [u8; N] {
    let alphabet = if uppercase { UPPER } else { LOWER };
    let mut out = [0u8; N];
    let groups = N / width;
    let mut g = 0;
    while g < groups {
        let mut v = g;
        let mut d = width;
        while d > 0 {
            d -= 1;
            out[g * width + d] = alphabet[v % base];
            v /= base;
        }
        g += 1;
    }
    out
}

/// 16 groups of 4 binary digits: "0000" … "1111".
pub static LUT_BASE2: [u8; 64] = build_lut::<64>(2, 4, false);

/// 64 groups of 2 octal digits: "00" … "77".
pub static LUT_BASE8: [u8; 128] = build_lut::<128>(8, 2, false);

/// 100 groups of 2 decimal digits: "00" … "99".
pub static LUT_BASE10: [u8; 200] = build_lut::<200>(10, 2, false);

/// 256 groups of 2 hex digits: "00" … "ff".
pub static LUT_BASE16: [u8; 512] = build_lut::<512>(16, 2, false);

/// 256 groups of 2 hex digits: "00" … "FF".
pub static LUT_BASE16_UPPER: [u8; 512] = build_lut::<512>(16, 2, true);

const fn build_digit_values() -> [u8; 256] {
    let mut out = [0xFFu8; 256];
    let mut i = 0u8;
    while i < 10 {
        out[(b'0' + i) as usize] = i;
        i += 1;
    }
    let mut i = 0u8;
    while i < 26 {
        out[(b'a' + i) as usize] = 10 + i;
        out[(b'A' + i) as usize] = 10 + i;
        i += 1;
    }
    out
}

/// Byte → digit value, `0xFF` for non-digits. Upper- and lowercase letters
/// are equivalent.
pub static DIGIT_VALUES: [u8; 256] = build_digit_values();
