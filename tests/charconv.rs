// Integer ↔ ASCII conversion: formatting flags, parsing grammar,
// overflow detection, and the round-trip law.

use plinth::charconv::{
    from_chars, to_chars, FromCharsResult, FROM_CHARS_AUTODETECT_BASE, FROM_CHARS_DECIMAL,
    FROM_CHARS_HEXADECIMAL, TO_CHARS_BINARY, TO_CHARS_DEFAULT, TO_CHARS_HEXADECIMAL,
    TO_CHARS_LEADING_ZEROS, TO_CHARS_PLUS_SIGN, TO_CHARS_UPPERCASE,
};
use proptest::prelude::*;

fn fmt<T: plinth::charconv::IntChars>(val: T, flags: u32) -> String {
    let mut buf = [0u8; 80];
    let n = to_chars(&mut buf, val, flags);
    assert!(n <= buf.len(), "80 bytes must suffice");
    String::from_utf8(buf[..n].to_vec()).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// to_chars
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn decimal_basics() {
    assert_eq!(fmt(0u32, TO_CHARS_DEFAULT), "0");
    assert_eq!(fmt(12345u32, TO_CHARS_DEFAULT), "12345");
    assert_eq!(fmt(u32::MAX, TO_CHARS_DEFAULT), "4294967295");
    assert_eq!(fmt(-1i32, TO_CHARS_DEFAULT), "-1");
    assert_eq!(fmt(i32::MIN, TO_CHARS_DEFAULT), "-2147483648");
    assert_eq!(fmt(i64::MIN, TO_CHARS_DEFAULT), "-9223372036854775808");
}

/// Signed −1 in binary with leading zeros: sign plus all 16 bits.
#[test]
fn binary_leading_zeros_signed() {
    let s = fmt(-1i16, TO_CHARS_BINARY | TO_CHARS_LEADING_ZEROS);
    assert_eq!(s, "-0000000000000001");
    assert_eq!(s.len(), 17);
}

/// Unsigned 16-bit max in hex with leading zeros is exactly "ffff".
#[test]
fn hex_leading_zeros_unsigned() {
    assert_eq!(
        fmt(u16::MAX, TO_CHARS_HEXADECIMAL | TO_CHARS_LEADING_ZEROS),
        "ffff"
    );
    assert_eq!(
        fmt(0xabu16, TO_CHARS_HEXADECIMAL | TO_CHARS_LEADING_ZEROS),
        "00ab"
    );
}

#[test]
fn hex_uppercase() {
    assert_eq!(fmt(0xdeadbeefu32, TO_CHARS_HEXADECIMAL), "deadbeef");
    assert_eq!(
        fmt(0xdeadbeefu32, TO_CHARS_HEXADECIMAL | TO_CHARS_UPPERCASE),
        "DEADBEEF"
    );
}

#[test]
fn plus_sign_only_for_signed_nonnegative() {
    assert_eq!(fmt(5i32, TO_CHARS_PLUS_SIGN), "+5");
    assert_eq!(fmt(0i32, TO_CHARS_PLUS_SIGN), "+0");
    assert_eq!(fmt(-5i32, TO_CHARS_PLUS_SIGN), "-5");
    // unsigned types never get a sign
    assert_eq!(fmt(5u32, TO_CHARS_PLUS_SIGN), "5");
}

/// Zero-padding a signed type pads to the magnitude width; the sign
/// counts toward the total.
#[test]
fn leading_zeros_decimal_widths() {
    assert_eq!(fmt(0u8, TO_CHARS_LEADING_ZEROS), "000");
    assert_eq!(fmt(7u8, TO_CHARS_LEADING_ZEROS), "007");
    assert_eq!(fmt(0i8, TO_CHARS_LEADING_ZEROS), "000");
    assert_eq!(fmt(-8i8, TO_CHARS_LEADING_ZEROS), "-008");
    assert_eq!(
        fmt(1i8, TO_CHARS_LEADING_ZEROS | TO_CHARS_PLUS_SIGN),
        "+001"
    );
}

#[test]
fn octal_and_odd_bases() {
    assert_eq!(fmt(0o777u32, 8), "777");
    assert_eq!(fmt(35u32, 36), "z");
    assert_eq!(fmt(36u32, 36), "10");
    assert_eq!(fmt(35u32, 36 | TO_CHARS_UPPERCASE), "Z");
    assert_eq!(fmt(255u32, 3), "100110");
}

/// An undersized buffer reports the required size and stays untouched.
#[test]
fn short_buffer_reports_required_size() {
    let mut buf = [0xAAu8; 4];
    let needed = to_chars(&mut buf, 123456u32, TO_CHARS_DEFAULT);
    assert_eq!(needed, 6);
    assert_eq!(buf, [0xAA; 4]);

    // exactly-sized buffers work
    let mut buf = [0u8; 6];
    assert_eq!(to_chars(&mut buf, 123456u32, TO_CHARS_DEFAULT), 6);
    assert_eq!(&buf, b"123456");
}

/// Base 1 is rejected by a fortification check.
#[test]
#[should_panic]
fn base_one_is_rejected() {
    let mut buf = [0u8; 8];
    to_chars(&mut buf, 1u32, 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// from_chars
// ─────────────────────────────────────────────────────────────────────────────

fn parse<T: plinth::charconv::IntChars + Default>(s: &str, flags: u32) -> (FromCharsResult, T) {
    let mut out = T::default();
    let res = from_chars(s.as_bytes(), &mut out, flags);
    (res, out)
}

#[test]
fn decimal_parsing() {
    let (res, v) = parse::<u32>("12345", FROM_CHARS_DECIMAL);
    assert!(res.ok && !res.overflow);
    assert_eq!(res.nchars, 5);
    assert_eq!(v, 12345);

    let (res, v) = parse::<i32>("-12345", FROM_CHARS_DECIMAL);
    assert!(res.ok);
    assert_eq!(v, -12345);

    let (res, v) = parse::<i32>("+7", FROM_CHARS_DECIMAL);
    assert!(res.ok);
    assert_eq!(v, 7);
}

/// Autodetected hex prefix: all four characters consumed.
#[test]
fn autodetect_hex_prefix() {
    let (res, v) = parse::<u32>("0xFF", FROM_CHARS_AUTODETECT_BASE);
    assert!(res.ok);
    assert_eq!(res.nchars, 4);
    assert_eq!(v, 0xFF);
}

#[test]
fn autodetect_binary_and_octal_prefixes() {
    let (res, v) = parse::<u32>("0b1011", FROM_CHARS_AUTODETECT_BASE);
    assert!(res.ok);
    assert_eq!(v, 0b1011);

    let (res, v) = parse::<u32>("0o777", FROM_CHARS_AUTODETECT_BASE);
    assert!(res.ok);
    assert_eq!(v, 0o777);

    // no prefix means decimal, leading zero included
    let (res, v) = parse::<u32>("0777", FROM_CHARS_AUTODETECT_BASE);
    assert!(res.ok);
    assert_eq!(v, 777);

    // a lone "0" is decimal zero
    let (res, v) = parse::<u32>("0", FROM_CHARS_AUTODETECT_BASE);
    assert!(res.ok);
    assert_eq!(v, 0);
}

#[test]
fn uppercase_and_lowercase_digits_equivalent() {
    let (ra, a) = parse::<u32>("aBcDeF", FROM_CHARS_HEXADECIMAL);
    let (rb, b) = parse::<u32>("ABCDEF", FROM_CHARS_HEXADECIMAL);
    assert!(ra.ok && rb.ok);
    assert_eq!(a, b);
    assert_eq!(a, 0xabcdef);
}

/// Overflow consumes the digits but leaves the output untouched.
#[test]
fn overflow_detection() {
    let mut out = 42u8;
    let res = from_chars(b"256", &mut out, FROM_CHARS_DECIMAL);
    assert!(!res.ok);
    assert!(res.overflow);
    assert_eq!(res.nchars, 3);
    assert_eq!(out, 42, "output must not be updated on overflow");

    // boundary values parse exactly
    let (res, v) = parse::<u8>("255", FROM_CHARS_DECIMAL);
    assert!(res.ok);
    assert_eq!(v, 255);

    let (res, v) = parse::<i8>("-128", FROM_CHARS_DECIMAL);
    assert!(res.ok);
    assert_eq!(v, -128);

    let (res, _) = parse::<i8>("-129", FROM_CHARS_DECIMAL);
    assert!(!res.ok);
    assert!(res.overflow);

    let (res, _) = parse::<i8>("128", FROM_CHARS_DECIMAL);
    assert!(!res.ok);
    assert!(res.overflow);

    let (res, v) = parse::<u64>("18446744073709551615", FROM_CHARS_DECIMAL);
    assert!(res.ok);
    assert_eq!(v, u64::MAX);

    let (res, _) = parse::<u64>("18446744073709551616", FROM_CHARS_DECIMAL);
    assert!(res.overflow);
}

/// Empty inputs, lone signs and leading garbage fail; `nchars` points at
/// the first invalid byte.
#[test]
fn parse_failures() {
    let (res, _) = parse::<u32>("", FROM_CHARS_DECIMAL);
    assert!(!res.ok && !res.overflow);
    assert_eq!(res.nchars, 0);

    let (res, _) = parse::<i32>("-", FROM_CHARS_DECIMAL);
    assert!(!res.ok);
    assert_eq!(res.nchars, 1);

    let (res, _) = parse::<u32>("xyz", FROM_CHARS_DECIMAL);
    assert!(!res.ok);
    assert_eq!(res.nchars, 0);

    // trailing garbage: the prefix is consumed but the parse fails
    let mut out = 0u32;
    let res = from_chars(b"123abc", &mut out, FROM_CHARS_DECIMAL);
    assert!(!res.ok && !res.overflow);
    assert_eq!(res.nchars, 3);
    assert_eq!(out, 0);

    // a NUL terminator ends the number cleanly
    let (res, v) = {
        let mut out = 0u32;
        let res = from_chars(b"123\0junk", &mut out, FROM_CHARS_DECIMAL);
        (res, out)
    };
    assert!(res.ok);
    assert_eq!(res.nchars, 3);
    assert_eq!(v, 123);
}

/// Signs are accepted only for signed target types.
#[test]
fn unsigned_rejects_sign() {
    let (res, _) = parse::<u32>("-5", FROM_CHARS_DECIMAL);
    assert!(!res.ok);
    assert_eq!(res.nchars, 0);

    let (res, _) = parse::<u32>("+5", FROM_CHARS_DECIMAL);
    assert!(!res.ok);
    assert_eq!(res.nchars, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip law: from_chars(to_chars(v)) == v for every base and flag
// combination
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! roundtrip_body {
    ($v:expr, $ty:ty) => {{
        for base in 2u32..=36 {
            for &extra in &[
                0,
                TO_CHARS_LEADING_ZEROS,
                TO_CHARS_PLUS_SIGN,
                TO_CHARS_UPPERCASE,
                TO_CHARS_LEADING_ZEROS | TO_CHARS_PLUS_SIGN | TO_CHARS_UPPERCASE,
            ] {
                let mut buf = [0u8; 80];
                let n = to_chars(&mut buf, $v, base | extra);
                let mut back: $ty = 0;
                let res = from_chars(&buf[..n], &mut back, base);
                prop_assert!(res.ok, "reparse failed for {:?} base {}", $v, base);
                prop_assert_eq!(back, $v);
            }
        }
    }};
}

proptest! {
    #[test]
    fn roundtrip_u32(v: u32) {
        roundtrip_body!(v, u32);
    }

    #[test]
    fn roundtrip_i32(v: i32) {
        roundtrip_body!(v, i32);
    }

    #[test]
    fn roundtrip_u64(v: u64) {
        roundtrip_body!(v, u64);
    }

    #[test]
    fn roundtrip_i64(v: i64) {
        roundtrip_body!(v, i64);
    }

    #[test]
    fn roundtrip_i16(v: i16) {
        roundtrip_body!(v, i16);
    }

    #[test]
    fn roundtrip_u8(v: u8) {
        roundtrip_body!(v, u8);
    }
}

/// Every representable value of the 8-bit types round-trips in every base
/// (exhaustive, not sampled).
#[test]
fn roundtrip_exhaustive_8bit() {
    for v in 0..=u8::MAX {
        for base in 2u32..=36 {
            let mut buf = [0u8; 16];
            let n = to_chars(&mut buf, v, base | TO_CHARS_LEADING_ZEROS);
            let mut back = 0u8;
            assert!(from_chars(&buf[..n], &mut back, base).ok);
            assert_eq!(back, v);
        }
    }
    for v in i8::MIN..=i8::MAX {
        for base in 2u32..=36 {
            let mut buf = [0u8; 16];
            let n = to_chars(&mut buf, v, base | TO_CHARS_PLUS_SIGN);
            let mut back = 0i8;
            assert!(from_chars(&buf[..n], &mut back, base).ok);
            assert_eq!(back, v);
        }
    }
}
