use serde_json::Value;

use super::hash::{digest, zero_hash};
use super::transaction::Transaction;

/// Computes the Merkle root of an ordered transaction list.
///
/// Leaves are the digests of each transaction. Each level pairs neighbours and
/// hashes the concatenation of their hex digests, duplicating the last digest
/// when a level has an odd length. An empty list commits to the zero hash.
pub fn compute_root(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return zero_hash();
    }

    let mut level: Vec<String> = transactions.iter().map(Transaction::hash).collect();

    while level.len() > 1 {
        if level.len() % 2 != 0 {
            if let Some(last) = level.last().cloned() {
                level.push(last);
            }
        }

        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }

    level.swap_remove(0)
}

/// Digest of two hex digests joined as text
pub fn hash_pair(left: &str, right: &str) -> String {
    digest(Value::String(format!("{}{}", left, right)))
}
