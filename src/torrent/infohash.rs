// infohash.rs
use crate::bencode::{encode_bvalue, BValue};

use sha1::{Sha1, Digest};

/// SHA-1 over the canonical encoding of an `info` dictionary.
///
/// The tree is re-encoded rather than hashing the bytes it was parsed from, so
/// a source file with out-of-order keys hashes the same as its sorted form.
pub fn info_hash(info: &BValue) -> [u8; 20] {
    let encoded = encode_bvalue(info);

    let mut hasher = Sha1::new();
    hasher.update(&encoded);
    let result = hasher.finalize();

    let mut hash_bytes = [0u8; 20];
    hash_bytes.copy_from_slice(&result);
    hash_bytes
}
