//! Token code generation.

use rand::Rng;

/// Characters used in token codes. Uppercase alphanumerics minus 0/O/1/I,
/// which are too easy to misread on a printed slip.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Default token code length.
pub const DEFAULT_CODE_LENGTH: usize = 8;

/// Generate a random token code of the given length.
///
/// Uniqueness is enforced by the storage layer's unique constraint, not here;
/// the caller regenerates on collision.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}
