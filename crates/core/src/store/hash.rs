//! Host hash used as the cache-group lookup key.
//!
//! This is the 24-bit variant of Paul Hsieh's SuperFastHash used by WebKit's
//! `StringHasher` for 8-bit strings. The stored value is compared by the
//! consuming runtime, so it must match bit for bit.

/// Golden-ratio seed shared with the runtime.
const SEED: u32 = 0x9E37_79B9;

/// Hash values are truncated to this many bits.
const HASH_BITS: u32 = 24;

/// Substituted when the masked hash would be zero.
const ZERO_HASH: u32 = 0x80_0000;

/// Hash a string into the range `1..=0x00FF_FFFF`.
pub fn hash_string(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let mut hash = SEED;

    let mut pairs = bytes.chunks_exact(2);
    for pair in &mut pairs {
        hash = hash.wrapping_add(u32::from(pair[0]));
        hash = (hash << 16) ^ ((u32::from(pair[1]) << 11) ^ hash);
        hash = hash.wrapping_add(hash >> 11);
    }

    if let [last] = pairs.remainder() {
        hash = hash.wrapping_add(u32::from(*last));
        hash ^= hash << 11;
        hash = hash.wrapping_add(hash >> 17);
    }

    // Force "avalanching" of the final bits.
    hash ^= hash << 3;
    hash = hash.wrapping_add(hash >> 5);
    hash ^= hash << 2;
    hash = hash.wrapping_add(hash >> 15);
    hash ^= hash << 10;

    hash &= (1 << HASH_BITS) - 1;

    if hash == 0 { ZERO_HASH } else { hash }
}

/// Hash the host of a cache-group URL.
pub fn host_hash(url: &str) -> u32 {
    hash_string(crate::url::host_for_url(url))
}
