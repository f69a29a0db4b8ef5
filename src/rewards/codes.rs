use crate::rewards::random::RandomSource;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_SUFFIX_LEN: usize = 8;

/// Builds `prefix` followed by eight characters from `[A-Z0-9]`.
///
/// Uniqueness is not guaranteed here; the ledger reserves each code and
/// asks for another one on collision.
pub fn generate_code(prefix: &str, random: &dyn RandomSource) -> String {
    let mut code = String::with_capacity(prefix.len() + CODE_SUFFIX_LEN);
    code.push_str(prefix);
    for _ in 0..CODE_SUFFIX_LEN {
        code.push(CODE_ALPHABET[random.index(CODE_ALPHABET.len())] as char);
    }
    code
}
