//! Seeded identifier hashing and hash splitting.
//!
//! Identifiers are fed through their `Hash` impl into an xxh64 hasher with an explicit seed, so
//! the same identifier hashes to the same value in every process (for a given target; `usize`
//! is hashed with native width and endianness).

use std::hash::{Hash, Hasher};
use xxhash_rust::xxh64::Xxh64;

/// Mask selecting the low `bits` bits of a `u64`.
#[inline]
pub fn low_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Hash `item` with xxh64 under `seed`, truncated to the low `hash_bits` bits.
pub fn hash_item<T: Hash + ?Sized>(item: &T, seed: u64, hash_bits: u32) -> u64 {
    let mut hasher = Xxh64::new(seed);
    item.hash(&mut hasher);
    hasher.finish() & low_mask(hash_bits)
}

/// Split a `hash_bits`-wide hash into the high `index_bits` (register index) and the low
/// `hash_bits - index_bits` remainder.
///
/// Requires `0 < index_bits < hash_bits <= 64`.
#[inline]
pub fn split(hash: u64, hash_bits: u32, index_bits: u32) -> (usize, u64) {
    let remainder_bits = hash_bits - index_bits;
    let index = (hash >> remainder_bits) & low_mask(index_bits);
    let remainder = hash & low_mask(remainder_bits);
    (index as usize, remainder)
}

/// `1 +` the number of leading zeros of `remainder` measured over a `width`-bit field.
///
/// An all-zero remainder yields `width + 1`, the largest rank a register can hold.
#[inline]
pub fn rank(remainder: u64, width: u32) -> u8 {
    let bit_length = u64::BITS - remainder.leading_zeros();
    debug_assert!(bit_length <= width, "remainder wider than its field");
    (width - bit_length + 1) as u8
}
