//! Local record identifiers.
//!
//! An id is the hex SHA-256 of a seed (typically the asset's uri or url)
//! concatenated with fresh random entropy. Generation retries until the value
//! is absent from the caller's set of existing ids.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

/// Generate an id not present in `existing`.
pub fn generate_id(seed: &str, existing: &HashSet<String>) -> String {
    generate_id_with(seed, existing, rand::random::<u64>)
}

/// Same as [`generate_id`], with an explicit entropy source.
pub fn generate_id_with<F>(seed: &str, existing: &HashSet<String>, mut entropy: F) -> String
where
    F: FnMut() -> u64,
{
    loop {
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        hasher.update(entropy().to_string().as_bytes());
        let id = hex::encode(hasher.finalize());
        if !existing.contains(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_hex_sha256() {
        let id = generate_id("file:///a.jpg", &HashSet::new());
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ids_unique_across_growing_set() {
        let mut existing = HashSet::new();
        for _ in 0..500 {
            let id = generate_id("same-seed", &existing);
            assert!(!existing.contains(&id));
            existing.insert(id);
        }
        assert_eq!(existing.len(), 500);
    }

    #[test]
    fn test_forced_collision_retries() {
        let mut existing = HashSet::new();
        existing.insert(generate_id_with("seed", &HashSet::new(), || 7));

        let mut draws = vec![7u64, 7, 7, 8].into_iter();
        let id = generate_id_with("seed", &existing, || draws.next().unwrap_or(9));

        assert!(!existing.contains(&id));
        assert_eq!(id, generate_id_with("seed", &HashSet::new(), || 8));
    }
}
