//! FNV-1a hash functions for type lookup
//!
//! Reflected types and Data classes are keyed in the registry by the FNV-1a
//! hash of their name. The derive macro computes the same hash at compile time.

/// FNV-1a 32-bit hash (compile-time capable)
pub const fn fnv1a_32(data: &[u8]) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
    const FNV_PRIME: u32 = 0x01000193;

    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < data.len() {
        hash ^= data[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Hash a type name at runtime
#[inline]
pub fn hash_str(s: &str) -> u32 {
    fnv1a_32(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_32_empty() {
        // Empty string should return offset basis
        assert_eq!(fnv1a_32(b""), 0x811c9dc5);
    }

    #[test]
    fn test_fnv1a_32_basic() {
        // Known test vectors
        assert_eq!(fnv1a_32(b"a"), 0xe40c292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9cf968);
    }

    #[test]
    fn test_type_names_distinct() {
        assert_ne!(hash_str("UInt32StringMap"), hash_str("StringUInt32Map"));
        assert_ne!(hash_str("Int32"), hash_str("UInt32"));
    }

    #[test]
    fn test_const_evaluation() {
        const HASH: u32 = fnv1a_32(b"Mesh");
        assert_eq!(HASH, hash_str("Mesh"));
    }
}
