//! Id and party code generation
//!
//! Message and member ids are short random strings over a reduced
//! lowercase alphabet. Party codes are uppercase so they can be read
//! out loud and typed on a phone.

use rand::Rng;

/// Alphabet for generic ids
pub const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Default length of generated ids
pub const ID_LENGTH: usize = 12;

/// Alphabet for party codes
pub const PARTY_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of every party code
pub const PARTY_CODE_LENGTH: usize = 6;

/// Generate a random string of `length` characters drawn from `alphabet`
pub fn random_string(alphabet: &[u8], length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Generate a new 12-character id
pub fn generate() -> String {
    random_string(ID_ALPHABET, ID_LENGTH)
}

/// Generate a new party code
pub fn generate_party_code() -> String {
    random_string(PARTY_CODE_ALPHABET, PARTY_CODE_LENGTH)
}

/// Normalize a user-supplied party code (uppercase, trimmed) and validate it
///
/// Returns `None` if the code has the wrong length or contains characters
/// outside `[0-9A-Z]`.
pub fn normalize_party_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = code.len() == PARTY_CODE_LENGTH
        && code.bytes().all(|b| PARTY_CODE_ALPHABET.contains(&b));
    valid.then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_shape() {
        let id = generate();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generated_party_code_is_valid() {
        for _ in 0..50 {
            let code = generate_party_code();
            assert_eq!(normalize_party_code(&code), Some(code));
        }
    }

    #[test]
    fn test_normalize_party_code() {
        assert_eq!(normalize_party_code(" ab12cd "), Some("AB12CD".to_string()));
        assert_eq!(normalize_party_code("AB12C"), None);
        assert_eq!(normalize_party_code("AB12CDE"), None);
        assert_eq!(normalize_party_code("AB-2CD"), None);
    }
}
