use sha2::{Digest, Sha256};

/// Canonical entity identifier: the first 8 bytes of the SHA-256 digest of
/// the canonical string, hex-encoded. Content-addressed, so recomputing from
/// the same canonical name always yields the same ID with no coordination
/// between the dimension build and the enrichment pass.
pub fn stable_id(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_id_is_deterministic() {
        let a = stable_id("CITY OF TORONTO");
        let b = stable_id("CITY OF TORONTO");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_stable_id_distinguishes_names() {
        assert_ne!(stable_id("CITY OF TORONTO"), stable_id("CITY OF OTTAWA"));
    }

    #[test]
    fn test_stable_id_is_lowercase_hex() {
        let id = stable_id("HYDRO ONE");
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, id.to_lowercase());
    }
}
