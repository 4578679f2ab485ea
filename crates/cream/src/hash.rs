//! Key hashing. The table takes any `fn(&[u8]) -> u32`; the default is
//! Jenkins one-at-a-time, which mixes well for short keys and costs one
//! pass over the bytes.

/// Signature of a pluggable table hash function.
pub type HashFn = fn(&[u8]) -> u32;

/// Jenkins one-at-a-time over the key bytes.
pub fn jenkins_one_at_a_time(key: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &byte in key {
        hash = hash.wrapping_add(u32::from(byte));
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);
    hash
}
