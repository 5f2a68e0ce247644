//! Pairwise SHA-256 Merkle tree over an ordered leaf list. Leaves are hashed
//! as hex strings concatenated without a separator, then UTF-8 encoded — this
//! must be preserved bit-for-bit for roots to stay comparable across runs.

use crate::hashing::{hash_string, ZERO_HASH};

/// Root of the tree built over `leaves`, in order. An odd node at any level
/// is paired with itself. An empty leaf list produces the all-zero root.
pub fn compute_root(leaves: &[String]) -> String {
    if leaves.is_empty() {
        return ZERO_HASH.to_string();
    }

    let mut level: Vec<String> = leaves.to_vec();

    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);

        for pair in level.chunks(2) {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            next.push(hash_string(&format!("{left}{right}")));
        }

        level = next;
    }

    level.into_iter().next().expect("non-empty level")
}
