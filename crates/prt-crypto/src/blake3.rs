//! Domain-separated BLAKE3 hashing.
//!
//! BLAKE3 serves two purposes here: deriving the per-token keystream from an
//! ElGamal shared element, and deriving the tag key from the HMAC secret.
//! Cross-domain collisions are prevented by BLAKE3's derive-key mode with a
//! registered context string per purpose.

/// Registered BLAKE3 context strings.
pub mod contexts {
    pub const TOKEN_KEYSTREAM: &str = "PRToken v1 token-keystream";
    pub const TOKEN_TAG_KEY: &str = "PRToken v1 token-tag-key";

    /// All registered context strings.
    pub const ALL_CONTEXTS: &[&str] = &[TOKEN_KEYSTREAM, TOKEN_TAG_KEY];
}

/// Derive a 32-byte key using BLAKE3's key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string (must start with "PRToken v1 ")
/// * `key_material` - The input key material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    debug_assert!(is_registered_context(context), "unregistered context {context:?}");
    ::blake3::derive_key(context, key_material)
}

/// Derive an arbitrary-length output in key derivation mode.
///
/// The first 32 bytes equal [`derive_key`] for the same inputs.
pub fn derive_key_xof(context: &str, key_material: &[u8], output: &mut [u8]) {
    debug_assert!(is_registered_context(context), "unregistered context {context:?}");
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    hasher.finalize_xof().fill(output);
}

/// Compute a keyed BLAKE3 hash (MAC/PRF).
pub fn keyed_hash(key: &[u8; 32], message: &[u8]) -> [u8; 32] {
    *::blake3::keyed_hash(key, message).as_bytes()
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// Encode multiple dynamic fields using length-prefixed encoding.
///
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}
