// DStr: representation transitions, the NUL invariant, search semantics,
// splits, strips, find-replace, and the alphabet round-trip scenario.

use plinth::dstring::{view, DStr, NPOS};
use proptest::prelude::*;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

#[test]
fn empty_string_is_shared_and_free() {
    let s = DStr::new();
    assert_eq!(s.len(), 0);
    assert_eq!(s.capacity(), 0);
    assert!(s.is_empty());
    let t = DStr::new();
    drop(s);
    assert_eq!(t.len(), 0); // the sentinel is never freed
}

#[test]
fn from_bytes_and_equality() {
    let s = DStr::from_bytes(b"hello");
    assert_eq!(s.len(), 5);
    assert_eq!(s, b"hello".as_slice());
    assert_eq!(s, "hello");
    assert_eq!(s, DStr::from("hello"));
    assert_ne!(s, DStr::from("hellx"));
}

/// The byte past `length` is always 0, in every representation.
#[test]
fn trailing_nul_invariant() {
    for len in [0usize, 1, 10, 254, 255, 300, 65_534, 65_535, 70_000] {
        let s = DStr::from_bytes(&vec![b'x'; len]);
        assert_eq!(s.len(), len);
        let bytes = s.to_bytes_with_nul_copy();
        assert_eq!(bytes.len(), len + 1);
        assert_eq!(bytes[len], 0);
    }
}

/// Growth across the small→medium→big thresholds preserves content.
#[test]
fn representation_transitions_preserve_bytes() {
    let mut s = DStr::new();
    let mut expected = Vec::new();
    while expected.len() < 70_000 {
        s.append(b"0123456789");
        expected.extend_from_slice(b"0123456789");
    }
    assert_eq!(&s[..], &expected[..]);
    assert_eq!(s.len(), 70_000);

    // and back down: shrink through medium into small
    s.substring(0, 100);
    s.shrink_to_fit();
    assert_eq!(&s[..], &expected[..100]);
    assert!(s.capacity() <= 254, "should be back to a small shape");
    s.substring(0, 0);
    assert!(s.is_empty());
}

#[test]
fn shrink_to_fit_is_idempotent() {
    let mut s = DStr::from_bytes(b"shrink me");
    s.reserve(500);
    s.shrink_to_fit();
    let cap = s.capacity();
    s.shrink_to_fit();
    assert_eq!(s.capacity(), cap);
    assert_eq!(s, "shrink me");
}

#[test]
fn push_append_insert_replace_erase() {
    let mut s = DStr::new();
    s.push(b'a');
    s.append(b"bcde");
    assert_eq!(s, "abcde");

    s.insert(2, b"XY");
    assert_eq!(s, "abXYcde");

    s.replace(2, 2, b"Z");
    assert_eq!(s, "abZcde");

    s.replace(2, 1, b"12345");
    assert_eq!(s, "ab12345cde");

    s.erase(2, 5);
    assert_eq!(s, "abcde");

    s.erase(3, NPOS);
    assert_eq!(s, "abc");

    s.clear();
    assert!(s.is_empty());
}

/// Embedded zeros are ordinary bytes.
#[test]
fn embedded_zeros_are_preserved() {
    let mut s = DStr::from_bytes(b"a\0b\0c");
    assert_eq!(s.len(), 5);
    assert_eq!(s.find(b"\0", 0), Some(1));
    s.append(b"\0tail");
    assert_eq!(s.len(), 10);
    assert_eq!(&s[..], b"a\0b\0c\0tail");
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario: alphabet round-trip
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn alphabet_scenario() {
    let mut s = DStr::new();
    for _ in 0..100 {
        s.append(ALPHABET);
    }
    assert_eq!(s.len(), 2600);
    for k in 0..100 {
        assert_eq!(s.substring_view(26 * k, 26), ALPHABET);
    }
    assert_eq!(s.find(b"xyz", 0), Some(23));
    assert_eq!(s.rfind(b"xyz", NPOS), Some(2597));
}

// ─────────────────────────────────────────────────────────────────────────────
// Search semantics
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn find_semantics() {
    let s = DStr::from_bytes(b"abcabcabc");
    assert_eq!(s.find(b"abc", 0), Some(0));
    assert_eq!(s.find(b"abc", 1), Some(3));
    assert_eq!(s.find(b"abc", 7), None);
    assert_eq!(s.find(b"zzz", 0), None);

    // the empty needle matches at the requested position
    assert_eq!(s.find(b"", 4), Some(4));
    assert_eq!(s.find(b"", 9), Some(9));
    // a position past the end never matches
    assert_eq!(s.find(b"", 10), None);
    assert_eq!(s.find(b"a", 10), None);
}

#[test]
fn rfind_semantics() {
    let s = DStr::from_bytes(b"abcabcabc");
    assert_eq!(s.rfind(b"abc", NPOS), Some(6));
    // pos caps the last possible start
    assert_eq!(s.rfind(b"abc", 5), Some(3));
    assert_eq!(s.rfind(b"abc", 2), Some(0));
    assert_eq!(s.rfind(b"zzz", NPOS), None);
    assert_eq!(s.rfind(b"", NPOS), Some(9));
    assert_eq!(s.rfind(b"", 4), Some(4));
}

#[test]
fn character_set_searches() {
    let s = DStr::from_bytes(b"  \tword1 word2\t ");
    assert_eq!(s.find_first_not_of(b" \t", 0), Some(3));
    assert_eq!(s.find_last_not_of(b" \t", NPOS), Some(13));
    assert_eq!(s.find_first_of(b"12", 0), Some(7));
    assert_eq!(s.find_last_of(b"12", NPOS), Some(13));
    assert_eq!(s.find_first_of(b"", 0), None);
    assert_eq!(s.find_first_of(b"w", 8), Some(9));
    assert_eq!(s.find_last_of(b"w", 8), Some(3));
}

#[test]
fn startswith_endswith() {
    let s = DStr::from_bytes(b"prefix-body-suffix");
    assert!(s.startswith(b"prefix"));
    assert!(s.startswith(b""));
    assert!(!s.startswith(b"prefix-body-suffix-and-more"));
    assert!(s.endswith(b"suffix"));
    assert!(s.endswith(b""));
    assert!(!s.endswith(b"prefix"));
}

#[test]
fn compare_uses_next_byte_tie_break() {
    use core::cmp::Ordering;
    let s = DStr::from_bytes(b"abc");
    assert_eq!(s.compare(b"abc"), Ordering::Equal);
    assert_eq!(s.compare(b"abd"), Ordering::Less);
    assert_eq!(s.compare(b"abb"), Ordering::Greater);
    assert_eq!(s.compare(b"abcd"), Ordering::Less);
    assert_eq!(s.compare(b"ab"), Ordering::Greater);
}

// ─────────────────────────────────────────────────────────────────────────────
// Strip
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn strip_family() {
    let mut s = DStr::from_bytes(b"..::core::..");
    s.lstrip(b".:");
    assert_eq!(s, "core::..");
    let mut s = DStr::from_bytes(b"..::core::..");
    s.rstrip(b".:");
    assert_eq!(s, "..::core");
    let mut s = DStr::from_bytes(b"..::core::..");
    s.strip(b".:");
    assert_eq!(s, "core");

    // stripping twice with the same set is a no-op
    s.strip(b".:");
    assert_eq!(s, "core");

    // stripping everything leaves the empty string
    let mut s = DStr::from_bytes(b"::::");
    s.strip(b":");
    assert!(s.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// find-replace
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn find_replace_counts_and_rewrites() {
    let mut s = DStr::from_bytes(b"one fish two fish red fish");
    let n = s.find_replace(b"fish", b"crab", NPOS);
    assert_eq!(n, 3);
    assert_eq!(s, "one crab two crab red crab");

    let mut s = DStr::from_bytes(b"aaaa");
    assert_eq!(s.find_replace(b"aa", b"b", NPOS), 2);
    assert_eq!(s, "bb");

    // max bounds the replacement count, left to right
    let mut s = DStr::from_bytes(b"x.x.x.x");
    assert_eq!(s.find_replace(b".", b"-", 2), 2);
    assert_eq!(s, "x-x-x.x");

    // growing replacement does not re-match its own output
    let mut s = DStr::from_bytes(b"ab");
    assert_eq!(s.find_replace(b"b", b"bb", NPOS), 1);
    assert_eq!(s, "abb");
}

#[test]
fn rfind_replace_goes_right_to_left() {
    let mut s = DStr::from_bytes(b"x.x.x.x");
    assert_eq!(s.rfind_replace(b".", b"-", 2), 2);
    assert_eq!(s, "x.x-x-x");

    let mut s = DStr::from_bytes(b"aaa");
    assert_eq!(s.rfind_replace(b"aa", b"b", NPOS), 1);
    assert_eq!(s, "ab");
}

// ─────────────────────────────────────────────────────────────────────────────
// Split
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn split_owned_and_views() {
    let s = DStr::from_bytes(b"a,b,,c");
    let parts = s.split_views(b',', NPOS);
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[0], b"a");
    assert_eq!(parts[1], b"b");
    assert_eq!(parts[2], b"");
    assert_eq!(parts[3], b"c");

    let owned = s.split(b',', NPOS);
    assert_eq!(owned.len(), 4);
    assert_eq!(owned[0], "a");
    assert_eq!(owned[3], "c");

    // max caps the number of returned pieces
    let limited = s.split_views(b',', 2);
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0], b"a");
    assert_eq!(limited[1], b"b");
}

#[test]
fn rsplit_yields_rightmost_first() {
    let s = DStr::from_bytes(b"a,b,c");
    let parts = s.rsplit_views(b',', NPOS);
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], b"c");
    assert_eq!(parts[1], b"b");
    assert_eq!(parts[2], b"a");

    let limited = s.rsplit(b',', 2);
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0], "c");
    assert_eq!(limited[1], "b");
}

#[test]
fn split_without_delimiter_is_whole_string() {
    let s = DStr::from_bytes(b"plain");
    let parts = s.split_views(b',', NPOS);
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0], b"plain");
}

// ─────────────────────────────────────────────────────────────────────────────
// Substrings, formatting, C-interop exits
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn substring_in_place_and_copy() {
    let mut s = DStr::from_bytes(b"0123456789");
    assert_eq!(s.substring_view(3, 4), b"3456");
    assert_eq!(s.substring_view(8, 100), b"89");
    let copy = s.substring_copy(2, 3);
    assert_eq!(copy, "234");
    s.substring(5, NPOS);
    assert_eq!(s, "56789");
}

#[test]
fn formatting_appends() {
    use std::fmt::Write;
    let mut s = DStr::from_fmt(format_args!("{}-{:04x}", "id", 0xabu32));
    assert_eq!(s, "id-00ab");
    write!(s, "/{}", 7).unwrap();
    assert_eq!(s, "id-00ab/7");
    s.insert_fmt(2, format_args!("[{}]", 1));
    assert_eq!(s, "id[1]-00ab/7");
    s.replace_fmt(0, 2, format_args!("{}", "ID"));
    assert_eq!(s, "ID[1]-00ab/7");
}

/// from_bytes → into_bytes_with_nul round-trips the payload and appends
/// exactly one NUL.
#[test]
fn into_bytes_with_nul_roundtrip() {
    let bytes = DStr::from_bytes(b"roundtrip").into_bytes_with_nul();
    assert_eq!(bytes, b"roundtrip\0");

    let empty = DStr::new().into_bytes_with_nul();
    assert_eq!(empty, b"\0");

    let big = vec![7u8; 70_000];
    let back = DStr::from_bytes(&big).into_bytes_with_nul();
    assert_eq!(&back[..70_000], &big[..]);
    assert_eq!(back[70_000], 0);
}

#[test]
fn view_functions_standalone() {
    assert_eq!(view::find(b"haystack", b"stack", 0), Some(3));
    assert_eq!(view::rfind(b"xx", b"x", NPOS), Some(1));
    assert_eq!(view::strip(b"  x  ", b" "), b"x");
    assert_eq!(view::lstrip(b"  x", b" "), b"x");
    assert_eq!(view::rstrip(b"x  ", b" "), b"x");
    assert_eq!(view::substring(b"abcdef", 2, 3), b"cde");
    assert!(view::startswith(b"abc", b"ab"));
    assert!(view::endswith(b"abc", b"bc"));
}

proptest! {
    /// Byte-level round trip through construction and the C-string exit.
    #[test]
    fn bytes_roundtrip(data: Vec<u8>) {
        let s = DStr::from_bytes(&data);
        prop_assert_eq!(&s[..], &data[..]);
        let with_nul = s.into_bytes_with_nul();
        prop_assert_eq!(&with_nul[..data.len()], &data[..]);
        prop_assert_eq!(with_nul[data.len()], 0);
    }

    /// Splitting and rejoining on a delimiter reproduces the input.
    #[test]
    fn split_join_roundtrip(pieces: Vec<Vec<u8>>) {
        // build "p0,p1,...,pn" with comma-free pieces
        let pieces: Vec<Vec<u8>> = pieces
            .into_iter()
            .map(|p| p.into_iter().filter(|&b| b != b',').collect())
            .collect();
        if pieces.is_empty() {
            return Ok(());
        }
        let joined: Vec<u8> = pieces.join(&[b','][..]);
        let s = DStr::from_bytes(&joined);
        let split = s.split_views(b',', NPOS);
        prop_assert_eq!(split.len(), pieces.len());
        for (got, want) in split.iter().zip(&pieces) {
            prop_assert_eq!(*got, &want[..]);
        }
    }
}
