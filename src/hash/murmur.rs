//! MurmurHash3 — seeded, non-cryptographic.
//!
//! The x86 variants are the ones to use on 32-bit machines (or for short
//! inputs); the x64 variants process 16-byte blocks with 64-bit lanes. The
//! 64-bit outputs are the truncated 128-bit results, as in the reference
//! implementation.

use byteorder::{ByteOrder, LittleEndian};

use super::{Hash128, Hash32, Hash64};

#[inline(always)]
pub(crate) fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

#[inline(always)]
pub(crate) fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51afd7ed558ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ceb9fe1a85ec53);
    k ^= k >> 33;
    k
}

/// Little-endian read of `bytes[lo..hi]` into the low bits of a `u32`.
#[inline(always)]
fn gather32(bytes: &[u8], lo: usize, hi: usize) -> u32 {
    let mut v = 0u32;
    for i in (lo..hi).rev() {
        v = (v << 8) | bytes[i] as u32;
    }
    v
}

/// Little-endian read of `bytes[lo..hi]` into the low bits of a `u64`.
#[inline(always)]
fn gather64(bytes: &[u8], lo: usize, hi: usize) -> u64 {
    let mut v = 0u64;
    for i in (lo..hi).rev() {
        v = (v << 8) | bytes[i] as u64;
    }
    v
}

/// 32-bit MurmurHash3 (x86 variant).
pub fn murmurhash3_x86_32(input: &[u8], seed: u32) -> Hash32 {
    const C1: u32 = 0xcc9e2d51;
    const C2: u32 = 0x1b873593;

    let mut h1 = seed;
    let mut chunks = input.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k1 = LittleEndian::read_u32(chunk);
        k1 = k1.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1.rotate_left(13).wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k1 = gather32(tail, 0, tail.len());
        k1 = k1.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h1 ^= k1;
    }

    h1 ^= input.len() as u32;
    Hash32 {
        bytes: fmix32(h1).to_le_bytes(),
    }
}

/// 128-bit MurmurHash3 (x86 variant, four 32-bit lanes).
pub fn murmurhash3_x86_128(input: &[u8], seed: u32) -> Hash128 {
    const C1: u32 = 0x239b961b;
    const C2: u32 = 0xab0e9789;
    const C3: u32 = 0x38b34ae5;
    const C4: u32 = 0xa1e38b93;

    let mut h1 = seed;
    let mut h2 = seed;
    let mut h3 = seed;
    let mut h4 = seed;

    let mut chunks = input.chunks_exact(16);
    for chunk in &mut chunks {
        let mut k1 = LittleEndian::read_u32(&chunk[0..4]);
        let mut k2 = LittleEndian::read_u32(&chunk[4..8]);
        let mut k3 = LittleEndian::read_u32(&chunk[8..12]);
        let mut k4 = LittleEndian::read_u32(&chunk[12..16]);

        k1 = k1.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1
            .rotate_left(19)
            .wrapping_add(h2)
            .wrapping_mul(5)
            .wrapping_add(0x561ccd1b);

        k2 = k2.wrapping_mul(C2).rotate_left(16).wrapping_mul(C3);
        h2 ^= k2;
        h2 = h2
            .rotate_left(17)
            .wrapping_add(h3)
            .wrapping_mul(5)
            .wrapping_add(0x0bcaa747);

        k3 = k3.wrapping_mul(C3).rotate_left(17).wrapping_mul(C4);
        h3 ^= k3;
        h3 = h3
            .rotate_left(15)
            .wrapping_add(h4)
            .wrapping_mul(5)
            .wrapping_add(0x96cd1c35);

        k4 = k4.wrapping_mul(C4).rotate_left(18).wrapping_mul(C1);
        h4 ^= k4;
        h4 = h4
            .rotate_left(13)
            .wrapping_add(h1)
            .wrapping_mul(5)
            .wrapping_add(0x32ac3b17);
    }

    let tail = chunks.remainder();
    let rem = tail.len();
    if rem > 12 {
        let k4 = gather32(tail, 12, rem)
            .wrapping_mul(C4)
            .rotate_left(18)
            .wrapping_mul(C1);
        h4 ^= k4;
    }
    if rem > 8 {
        let k3 = gather32(tail, 8, rem.min(12))
            .wrapping_mul(C3)
            .rotate_left(17)
            .wrapping_mul(C4);
        h3 ^= k3;
    }
    if rem > 4 {
        let k2 = gather32(tail, 4, rem.min(8))
            .wrapping_mul(C2)
            .rotate_left(16)
            .wrapping_mul(C3);
        h2 ^= k2;
    }
    if rem > 0 {
        let k1 = gather32(tail, 0, rem.min(4))
            .wrapping_mul(C1)
            .rotate_left(15)
            .wrapping_mul(C2);
        h1 ^= k1;
    }

    let len = input.len() as u32;
    h1 ^= len;
    h2 ^= len;
    h3 ^= len;
    h4 ^= len;

    h1 = h1.wrapping_add(h2).wrapping_add(h3).wrapping_add(h4);
    h2 = h2.wrapping_add(h1);
    h3 = h3.wrapping_add(h1);
    h4 = h4.wrapping_add(h1);

    h1 = fmix32(h1);
    h2 = fmix32(h2);
    h3 = fmix32(h3);
    h4 = fmix32(h4);

    h1 = h1.wrapping_add(h2).wrapping_add(h3).wrapping_add(h4);
    h2 = h2.wrapping_add(h1);
    h3 = h3.wrapping_add(h1);
    h4 = h4.wrapping_add(h1);

    let mut out = [0u8; 16];
    LittleEndian::write_u32(&mut out[0..4], h1);
    LittleEndian::write_u32(&mut out[4..8], h2);
    LittleEndian::write_u32(&mut out[8..12], h3);
    LittleEndian::write_u32(&mut out[12..16], h4);
    Hash128::from_bytes(out)
}

/// 64-bit MurmurHash3 (x86 variant): the low half of the 128-bit result.
pub fn murmurhash3_x86_64(input: &[u8], seed: u32) -> Hash64 {
    let h = murmurhash3_x86_128(input, seed);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&h.as_bytes()[..8]);
    Hash64 { bytes }
}

/// 128-bit MurmurHash3 (x64 variant, two 64-bit lanes).
pub fn murmurhash3_x64_128(input: &[u8], seed: u32) -> Hash128 {
    const C1: u64 = 0x87c37b91114253d5;
    const C2: u64 = 0x4cf5ad432745937f;

    let mut h1 = seed as u64;
    let mut h2 = seed as u64;

    let mut chunks = input.chunks_exact(16);
    for chunk in &mut chunks {
        let mut k1 = LittleEndian::read_u64(&chunk[0..8]);
        let mut k2 = LittleEndian::read_u64(&chunk[8..16]);

        k1 = k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1
            .rotate_left(27)
            .wrapping_add(h2)
            .wrapping_mul(5)
            .wrapping_add(0x52dce729);

        k2 = k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
        h2 ^= k2;
        h2 = h2
            .rotate_left(31)
            .wrapping_add(h1)
            .wrapping_mul(5)
            .wrapping_add(0x38495ab5);
    }

    let tail = chunks.remainder();
    let rem = tail.len();
    if rem > 8 {
        let k2 = gather64(tail, 8, rem)
            .wrapping_mul(C2)
            .rotate_left(33)
            .wrapping_mul(C1);
        h2 ^= k2;
    }
    if rem > 0 {
        let k1 = gather64(tail, 0, rem.min(8))
            .wrapping_mul(C1)
            .rotate_left(31)
            .wrapping_mul(C2);
        h1 ^= k1;
    }

    let len = input.len() as u64;
    h1 ^= len;
    h2 ^= len;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix64(h1);
    h2 = fmix64(h2);

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    let mut out = [0u8; 16];
    LittleEndian::write_u64(&mut out[0..8], h1);
    LittleEndian::write_u64(&mut out[8..16], h2);
    Hash128::from_bytes(out)
}

/// 64-bit MurmurHash3 (x64 variant): the low half of the 128-bit result.
pub fn murmurhash3_x64_64(input: &[u8], seed: u32) -> Hash64 {
    let h = murmurhash3_x64_128(input, seed);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&h.as_bytes()[..8]);
    Hash64 { bytes }
}
