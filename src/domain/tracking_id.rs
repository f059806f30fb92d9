use rand::Rng;

pub const TRACKING_ID_LEN: usize = 10;

/// How many fresh identifiers order creation tries before giving up.
pub const TRACKING_ID_ATTEMPTS: usize = 5;

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Ten uppercase alphanumerics (~51 bits) drawn from the thread-local CSPRNG.
pub fn generate_tracking_id() -> String {
    let mut rng = rand::rng();
    (0..TRACKING_ID_LEN)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

/// Canonical form of a user-typed identifier, or `None` when it cannot be one.
pub fn normalize(input: &str) -> Option<String> {
    let candidate = input.trim().to_ascii_uppercase();
    let well_formed = candidate.len() == TRACKING_ID_LEN
        && candidate.bytes().all(|b| ALPHABET.contains(&b));
    well_formed.then_some(candidate)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_ids_are_short_uppercase_alphanumeric() {
        for _ in 0..200 {
            let id = generate_tracking_id();
            assert_eq!(id.len(), TRACKING_ID_LEN);
            assert!(id.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn generated_ids_do_not_repeat_in_practice() {
        let ids: HashSet<String> = (0..5_000).map(|_| generate_tracking_id()).collect();
        assert_eq!(ids.len(), 5_000);
    }

    #[test]
    fn normalize_accepts_typed_lowercase() {
        assert_eq!(normalize(" q1z7k8m2p0 ").as_deref(), Some("Q1Z7K8M2P0"));
        assert_eq!(normalize("Q1Z7K8M2P"), None);
        assert_eq!(normalize("Q1Z7K8M2P-"), None);
    }
}
