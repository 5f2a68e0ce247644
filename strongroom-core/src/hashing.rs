//! Hex SHA-256 over bytes and UTF-8 strings. Every on-disk hash in the store
//! (chunk ids, Merkle nodes, WAL/root-chain/audit entries) uses this
//! representation exclusively.

/// 64 lowercase hex '0' characters: the root of an empty Merkle tree and the
/// `prev` of the first audit entry.
pub const ZERO_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(openssl::sha::sha256(data))
}

pub fn hash_string(s: &str) -> String {
    hash_bytes(s.as_bytes())
}
